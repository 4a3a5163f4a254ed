//! # polyplug-vst3
//!
//! VST3-style format adapter for the Polyplug framework.
//!
//! This crate maps a [`polyplug_core::PluginInstance`] onto the VST3 object
//! model: result codes, bus info and flags, speaker arrangements, parameter
//! info for the flat parameter index space, state streams and editor
//! messages. It handles:
//!
//! - Component/processor/controller entry points ([`Vst3Adapter`])
//! - VST3-specific configuration ([`Vst3Config`])
//! - Editor message exchange ([`EditorMessage`], [`ChangedValues`])
//! - Instances the host released but still references ([`PluginModule`])
//!
//! ## Architecture
//!
//! Uses the **combined component** pattern where processor and controller are
//! implemented by the same object.
//!
//! ```text
//! User Plugin (implements polyplug_core::Plugin)
//!        ↓
//! Vst3Adapter<P> (generic VST3 adapter)
//!        ↓
//! host (through COM vtables, not part of this crate)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use polyplug_core::{ConstructionParams, PluginConfig};
//! use polyplug_vst3::{PluginModule, Vst3Config};
//!
//! static CONFIG: PluginConfig = PluginConfig::new("My Plugin", 0x4d79506c)
//!     .with_vendor("My Company");
//! static VST3_CONFIG: Vst3Config = Vst3Config::new([0x12; 16]);
//!
//! let mut module = PluginModule::<MyPlugin>::new(CONFIG.clone(), VST3_CONFIG);
//! let id = module.create_instance(&ConstructionParams::new(48000.0, 512))?;
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

pub mod editor;
pub mod module;
pub mod processor;
pub mod result;
pub mod util;
pub mod wrapper;

// Re-exports
pub use editor::{AttributeValue, ChangedValues, EditorMessage};
pub use module::{InstanceId, PluginModule, ReleaseArena};
pub use processor::{ParameterChange, Vst3Adapter, MAX_PORTS};
pub use result::{error_code, to_tresult};
pub use wrapper::Vst3Config;

// Re-export shared PluginConfig from polyplug-core
pub use polyplug_core::PluginConfig;

// Re-export vst3 crate for result codes and info structs
pub use vst3;
