//! Parameter metadata types.
//!
//! This module provides types for describing plugin parameters:
//! - [`Parameter`] - Complete parameter description (names, range, hints, etc.)
//! - [`ParameterHints`] - Behavioral flags (automatable, boolean, output, etc.)
//! - [`ParameterRanges`] - Min/max/default triple with normalization helpers
//! - [`ParameterEnumeration`] - Optional list of labelled values

use crate::types::PORT_GROUP_NONE;

/// Flags controlling parameter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterHints {
    /// Parameter can be automated by the host.
    pub automatable: bool,
    /// Parameter only takes `min` or `max`.
    pub boolean: bool,
    /// Parameter only takes whole numbers.
    pub integer: bool,
    /// Parameter is best displayed on a logarithmic scale.
    pub logarithmic: bool,
    /// Parameter is written by the plugin and read by the host.
    pub output: bool,
    /// Parameter resets to its default after being observed away from it.
    pub trigger: bool,
    /// Parameter is hidden from the host's parameter list.
    pub hidden: bool,
}

impl ParameterHints {
    /// An automatable input parameter.
    pub const AUTOMATABLE: Self = Self {
        automatable: true,
        boolean: false,
        integer: false,
        logarithmic: false,
        output: false,
        trigger: false,
        hidden: false,
    };

    /// A read-only output parameter (meter, gain reduction, ...).
    pub const OUTPUT: Self = Self {
        automatable: false,
        boolean: false,
        integer: false,
        logarithmic: false,
        output: true,
        trigger: false,
        hidden: false,
    };

    /// A boolean trigger (momentary button).
    pub const TRIGGER: Self = Self {
        automatable: true,
        boolean: true,
        integer: false,
        logarithmic: false,
        output: false,
        trigger: true,
        hidden: false,
    };

    /// Mark as boolean.
    pub const fn with_boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    /// Mark as integer.
    pub const fn with_integer(mut self) -> Self {
        self.integer = true;
        self
    }

    /// Mark as logarithmic.
    pub const fn with_logarithmic(mut self) -> Self {
        self.logarithmic = true;
        self
    }

    /// Hide from the host.
    pub const fn with_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Returns true if the host is allowed to write this parameter.
    #[inline]
    pub const fn is_host_writable(&self) -> bool {
        !self.output && !self.trigger
    }
}

/// Range of a parameter: `min < max` and `min <= default <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRanges {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            default: 0.0,
        }
    }
}

impl ParameterRanges {
    /// Create a new range.
    pub const fn new(default: f32, min: f32, max: f32) -> Self {
        Self { min, max, default }
    }

    /// Returns true if `min < max` and `min <= default <= max`.
    pub fn is_valid(&self) -> bool {
        self.min < self.max && self.min <= self.default && self.default <= self.max
    }

    /// Clamp `value` into the range in place.
    #[inline]
    pub fn fix_value(&self, value: &mut f32) {
        *value = self.fixed_value(*value);
    }

    /// Return `value` clamped into the range. NaN becomes the default.
    #[inline]
    pub fn fixed_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else if value <= self.min {
            self.min
        } else if value >= self.max {
            self.max
        } else {
            value
        }
    }

    /// Map `value` linearly onto `[0, 1]`, clamping the result.
    #[inline]
    pub fn normalized_value(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.default } else { value };
        let normalized = (value - self.min) / (self.max - self.min);
        normalized.clamp(0.0, 1.0)
    }

    /// Clamp `value` into the range, then normalize it.
    #[inline]
    pub fn fixed_and_normalized_value(&self, value: f32) -> f32 {
        self.normalized_value(self.fixed_value(value))
    }

    /// Same as [`normalized_value`](Self::normalized_value) in double precision.
    #[inline]
    pub fn normalized_value_f64(&self, value: f64) -> f64 {
        let (min, max) = (self.min as f64, self.max as f64);
        let value = if value.is_nan() { self.default as f64 } else { value };
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }

    /// Map a normalized value back into the range.
    ///
    /// Inputs outside `[0, 1]` stick to the range boundaries; NaN gives the
    /// default.
    #[inline]
    pub fn unnormalized_value(&self, normalized: f32) -> f32 {
        if normalized.is_nan() {
            self.default
        } else if normalized <= 0.0 {
            self.min
        } else if normalized >= 1.0 {
            self.max
        } else {
            normalized * (self.max - self.min) + self.min
        }
    }

    /// Same as [`unnormalized_value`](Self::unnormalized_value) in double precision.
    #[inline]
    pub fn unnormalized_value_f64(&self, normalized: f64) -> f64 {
        let (min, max) = (self.min as f64, self.max as f64);
        if normalized.is_nan() {
            self.default as f64
        } else if normalized <= 0.0 {
            min
        } else if normalized >= 1.0 {
            max
        } else {
            normalized * (max - min) + min
        }
    }
}

/// One labelled value of an enumeration parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEnumerationValue {
    pub value: f32,
    pub label: String,
}

impl ParameterEnumerationValue {
    pub fn new(value: f32, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// Labelled values a parameter can take.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterEnumeration {
    pub values: Vec<ParameterEnumerationValue>,
    /// Only the listed values are allowed.
    pub restricted_mode: bool,
}

impl ParameterEnumeration {
    /// Label for `value`, if it matches one of the listed values.
    pub fn label_for(&self, value: f32) -> Option<&str> {
        self.values
            .iter()
            .find(|v| (v.value - value).abs() < f32::EPSILON)
            .map(|v| v.label.as_str())
    }
}

/// Special meaning of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDesignation {
    #[default]
    None,
    /// Inverted enable switch (1.0 = bypassed).
    Bypass,
}

/// Metadata describing a single plugin parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub hints: ParameterHints,
    /// Full name (e.g., "Master Volume").
    pub name: String,
    /// Short name for constrained displays (e.g., "Vol").
    pub short_name: String,
    /// Machine name, unique among parameters. Used as the state key.
    pub symbol: String,
    /// Unit label (e.g., "dB", "%", "Hz").
    pub unit: String,
    pub description: String,
    pub ranges: ParameterRanges,
    pub enumeration: Option<ParameterEnumeration>,
    pub designation: ParameterDesignation,
    /// MIDI CC the plugin suggests for this parameter.
    pub midi_cc: Option<u8>,
    /// Parameter group, `PORT_GROUP_NONE` when ungrouped.
    pub group_id: u32,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            hints: ParameterHints::default(),
            name: String::new(),
            short_name: String::new(),
            symbol: String::new(),
            unit: String::new(),
            description: String::new(),
            ranges: ParameterRanges::default(),
            enumeration: None,
            designation: ParameterDesignation::None,
            midi_cc: None,
            group_id: PORT_GROUP_NONE,
        }
    }
}

impl Parameter {
    /// Create an automatable parameter with the given names and range.
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        ranges: ParameterRanges,
    ) -> Self {
        Self {
            hints: ParameterHints::AUTOMATABLE,
            name: name.into(),
            symbol: symbol.into(),
            ranges,
            ..Self::default()
        }
    }

    /// Configure this parameter as the plugin's bypass switch.
    ///
    /// Boolean, automatable, 0.0 = active, 1.0 = bypassed.
    pub fn init_bypass(&mut self) {
        self.hints = ParameterHints::AUTOMATABLE.with_boolean();
        self.name = "Bypass".into();
        self.short_name = "Bypass".into();
        self.symbol = "dpf_bypass".into();
        self.unit.clear();
        self.ranges = ParameterRanges::new(0.0, 0.0, 1.0);
        self.designation = ParameterDesignation::Bypass;
    }

    /// Set the hints.
    pub fn with_hints(mut self, hints: ParameterHints) -> Self {
        self.hints = hints;
        self
    }

    /// Set the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the short name.
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = short_name.into();
        self
    }

    /// Set the enumeration values.
    pub fn with_enumeration(mut self, enumeration: ParameterEnumeration) -> Self {
        self.enumeration = Some(enumeration);
        self
    }

    /// Returns true if the host is allowed to write this parameter.
    #[inline]
    pub fn is_host_writable(&self) -> bool {
        self.hints.is_host_writable()
    }

    /// Number of discrete steps the host should offer, 0 for continuous.
    pub fn step_count(&self) -> u32 {
        if self.hints.boolean {
            1
        } else if self.hints.integer {
            (self.ranges.max - self.ranges.min).round().max(1.0) as u32
        } else if let Some(enumeration) = self.enumeration.as_ref().filter(|e| e.restricted_mode) {
            enumeration.values.len().saturating_sub(1) as u32
        } else {
            0
        }
    }

    /// Render `value` as text for the state stream.
    ///
    /// Integer parameters are written as whole numbers, everything else as
    /// the shortest decimal that reads back to the same `f32`.
    pub fn value_to_state_string(&self, value: f32) -> String {
        if self.hints.integer {
            format!("{}", value.round() as i64)
        } else {
            format!("{}", value)
        }
    }
}
