//! Plugin state serialization.
//!
//! The whole persisted state of an instance (current program, string states
//! and input parameter values) is written as one stream of NUL-terminated
//! key/value strings:
//!
//! ```text
//! __dpf_program__ \0 <index> \0                      (if the plugin has programs)
//! __dpf_state_begin__ \0 \0                          (if the plugin has states)
//!     <key> \0 <value> \0 ...
//! __dpf_state_end__ \0 \0
//! __dpf_parameters_begin__ \0 \0                     (if the plugin has parameters)
//!     <symbol> \0 <value> \0 ...
//! __dpf_parameters_end__ \0 \0
//! 0xFE                                               (terminator)
//! ```
//!
//! Output and trigger parameters are never written. The terminator byte can
//! not occur in UTF-8, so readers can stop at it even if the host's storage
//! hands back more data.
//!
//! Decoding is resumable: [`StateDecoder::feed`] accepts the stream in chunks
//! of any size. The decoded [`DecodedState`] is applied separately, so a
//! corrupt stream never mutates the plugin.

use log::debug;

use crate::descriptor::PluginDescriptor;
use crate::error::{PluginError, PluginResult};

pub const PROGRAM_KEY: &str = "__dpf_program__";
pub const STATE_BEGIN_KEY: &str = "__dpf_state_begin__";
pub const STATE_END_KEY: &str = "__dpf_state_end__";
pub const PARAMETERS_BEGIN_KEY: &str = "__dpf_parameters_begin__";
pub const PARAMETERS_END_KEY: &str = "__dpf_parameters_end__";

/// Byte ending the stream.
pub const TERMINATOR: u8 = 0xFE;

/// Separator used while building; swapped for NUL on [`StateEncoder::finish`].
const PLACEHOLDER: u8 = 0xFF;

// =============================================================================
// Encoding
// =============================================================================

/// Incremental state stream builder.
#[derive(Debug, Default)]
pub struct StateEncoder {
    buffer: Vec<u8>,
}

impl StateEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one key/value pair.
    ///
    /// Keys and values must not contain NUL, which would split the pair.
    pub fn push(&mut self, key: &str, value: &str) -> PluginResult<()> {
        if key.as_bytes().contains(&0) || value.as_bytes().contains(&0) {
            return Err(PluginError::invalid_argument(format!(
                "state pair '{}' contains a NUL byte",
                key.escape_debug()
            )));
        }
        self.buffer.extend_from_slice(key.as_bytes());
        self.buffer.push(PLACEHOLDER);
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(PLACEHOLDER);
        Ok(())
    }

    /// Append a section marker (empty value).
    fn marker(&mut self, key: &str) -> PluginResult<()> {
        self.push(key, "")
    }

    /// Translate separators and append the terminator.
    pub fn finish(mut self) -> Vec<u8> {
        for byte in self.buffer.iter_mut() {
            if *byte == PLACEHOLDER {
                *byte = 0;
            }
        }
        self.buffer.push(TERMINATOR);
        self.buffer
    }
}

/// Encode an instance's state.
///
/// `state_values` is parallel to `descriptor.states`; `parameter_value`
/// returns the current plain value of a parameter.
pub fn encode_state(
    descriptor: &PluginDescriptor,
    current_program: u32,
    state_values: &[String],
    parameter_value: impl Fn(u32) -> f32,
) -> PluginResult<Vec<u8>> {
    let mut encoder = StateEncoder::new();

    if !descriptor.programs.is_empty() {
        encoder.push(PROGRAM_KEY, &current_program.to_string())?;
    }

    if !descriptor.states.is_empty() {
        encoder.marker(STATE_BEGIN_KEY)?;
        for (entry, value) in descriptor.states.iter().zip(state_values.iter()) {
            encoder.push(&entry.key, value)?;
        }
        encoder.marker(STATE_END_KEY)?;
    }

    if !descriptor.parameters.is_empty() {
        encoder.marker(PARAMETERS_BEGIN_KEY)?;
        for (index, parameter) in descriptor.parameters.iter().enumerate() {
            if !parameter.is_host_writable() {
                continue;
            }
            let value = parameter.value_to_state_string(parameter_value(index as u32));
            encoder.push(&parameter.symbol, &value)?;
        }
        encoder.marker(PARAMETERS_END_KEY)?;
    }

    let bytes = encoder.finish();
    debug!("Encoded state: {} bytes", bytes.len());
    Ok(bytes)
}

// =============================================================================
// Decoding
// =============================================================================

/// Section the decoder is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    States,
    Parameters,
}

/// Everything read from a state stream, not yet applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedState {
    pub program: Option<u32>,
    /// String states in stream order.
    pub states: Vec<(String, String)>,
    /// Parameter symbol and plain value, in stream order.
    pub parameters: Vec<(String, f32)>,
}

/// Resumable state stream parser.
#[derive(Debug)]
pub struct StateDecoder {
    section: Section,
    token: Vec<u8>,
    pending_key: Option<String>,
    finished: bool,
    decoded: DecodedState,
}

impl Default for StateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateDecoder {
    pub fn new() -> Self {
        Self {
            section: Section::None,
            token: Vec::new(),
            pending_key: None,
            finished: false,
            decoded: DecodedState::default(),
        }
    }

    /// Returns true once the terminator has been read.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume the next chunk of the stream.
    ///
    /// Returns `Ok(true)` once the terminator was seen; anything after it is
    /// ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> PluginResult<bool> {
        for &byte in chunk {
            if self.finished {
                break;
            }
            match byte {
                TERMINATOR => {
                    self.check_complete("terminator")?;
                    self.finished = true;
                }
                0 => {
                    let token = std::mem::take(&mut self.token);
                    let text = String::from_utf8(token)
                        .map_err(|_| PluginError::corrupt("state token is not valid UTF-8"))?;
                    match self.pending_key.take() {
                        None => self.pending_key = Some(text),
                        Some(key) => self.handle_pair(key, text)?,
                    }
                }
                _ => self.token.push(byte),
            }
        }
        Ok(self.finished)
    }

    /// Finish decoding.
    ///
    /// A stream that ends cleanly between pairs is accepted even without a
    /// terminator; a stream cut inside a pair or an open section is not.
    pub fn finish(self) -> PluginResult<DecodedState> {
        if !self.finished {
            self.check_complete("end of stream")?;
        }
        Ok(self.decoded)
    }

    fn check_complete(&self, at: &str) -> PluginResult<()> {
        if !self.token.is_empty() || self.pending_key.is_some() {
            return Err(PluginError::corrupt(format!("{} inside a key/value pair", at)));
        }
        if self.section != Section::None {
            return Err(PluginError::corrupt(format!(
                "{} inside unterminated {:?} section",
                at, self.section
            )));
        }
        Ok(())
    }

    fn handle_pair(&mut self, key: String, value: String) -> PluginResult<()> {
        match (self.section, key.as_str()) {
            (Section::None, PROGRAM_KEY) => {
                let program = value.trim().parse::<u32>().map_err(|_| {
                    PluginError::corrupt(format!("invalid program index '{}'", value))
                })?;
                self.decoded.program = Some(program);
            }
            (Section::None, STATE_BEGIN_KEY) => self.section = Section::States,
            (Section::None, PARAMETERS_BEGIN_KEY) => self.section = Section::Parameters,
            (Section::States, STATE_END_KEY) | (Section::Parameters, PARAMETERS_END_KEY) => {
                self.section = Section::None;
            }
            (Section::None, STATE_END_KEY | PARAMETERS_END_KEY) => {
                return Err(PluginError::corrupt(format!(
                    "'{}' without matching begin marker",
                    key
                )));
            }
            (
                Section::States | Section::Parameters,
                PROGRAM_KEY | STATE_BEGIN_KEY | STATE_END_KEY | PARAMETERS_BEGIN_KEY
                | PARAMETERS_END_KEY,
            ) => {
                return Err(PluginError::corrupt(format!(
                    "'{}' nested inside {:?} section",
                    key, self.section
                )));
            }
            (Section::States, _) => self.decoded.states.push((key, value)),
            (Section::Parameters, _) => {
                let parsed = value
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        PluginError::corrupt(format!(
                            "invalid value '{}' for parameter '{}'",
                            value, key
                        ))
                    })?;
                self.decoded.parameters.push((key, parsed));
            }
            (Section::None, _) => debug!("Skipping unknown top-level state key '{}'", key),
        }
        Ok(())
    }
}

/// Decode a complete state stream held in memory.
pub fn decode_state(bytes: &[u8]) -> PluginResult<DecodedState> {
    let mut decoder = StateDecoder::new();
    decoder.feed(bytes)?;
    decoder.finish()
}

/// Changes made by applying a [`DecodedState`], for batched notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedState {
    pub program: Option<u32>,
    /// State keys and the values that were set.
    pub states: Vec<(String, String)>,
    /// Parameter indices and the plain values that were set.
    pub parameters: Vec<(u32, f32)>,
}

impl AppliedState {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.program.is_none() && self.states.is_empty() && self.parameters.is_empty()
    }
}
