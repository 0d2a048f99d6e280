use std::{fmt::Debug, ops::RangeInclusive};

use four_cc::FourCC;

use super::{Parameter, ParameterType, ParameterValueUpdate};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// A discrete (integer) parameter descriptor.
#[derive(Debug, Clone)]
pub struct IntegerParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<i32>,
    default: i32,
    unit: &'static str,
}

impl IntegerParameter {
    /// Create a new integer parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<i32>,
        default: i32,
    ) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// The parameter's identifier.
    pub const fn id(&self) -> FourCC {
        self.id
    }

    /// The parameter's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter's value range.
    pub const fn range(&self) -> &RangeInclusive<i32> {
        &self.range
    }

    /// The parameter's default value.
    pub const fn default_value(&self) -> i32 {
        self.default
    }

    /// Clamp the given plain value to the parameter's range.
    pub fn clamp_value(&self, value: i32) -> i32 {
        value.clamp(*self.range.start(), *self.range.end())
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: i32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        (self.clamp_value(value) - start) as f32 / (end - start) as f32
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> i32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        let value = start as f32 + normalized.clamp(0.0, 1.0) * (end - start) as f32;
        self.clamp_value(value.round() as i32)
    }

    /// Resolve a [`ParameterValueUpdate`] to a clamped plain value.
    pub fn update_value(&self, update: &ParameterValueUpdate) -> Result<i32, Error> {
        match update {
            ParameterValueUpdate::Normalized(normalized) => {
                Ok(self.denormalize_value(*normalized))
            }
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<i32>() {
                    Ok(self.clamp_value(*value))
                } else if let Some(value) = raw.downcast_ref::<i64>() {
                    Ok(self.clamp_value((*value).clamp(i32::MIN as i64, i32::MAX as i64) as i32))
                } else if let Some(value) = raw.downcast_ref::<usize>() {
                    Ok(self.clamp_value((*value).min(i32::MAX as usize) as i32))
                } else {
                    Err(Error::ParameterError(format!(
                        "Unsupported payload type for integer parameter '{}'",
                        self.name
                    )))
                }
            }
        }
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: i32, include_unit: bool) -> String {
        if include_unit && !self.unit.is_empty() {
            format!("{} {}", value, self.unit)
        } else {
            format!("{}", value)
        }
    }

    /// Convert the given string to a clamped plain value.
    pub fn string_to_value(&self, string: &str) -> Option<i32> {
        let string = string.trim();
        let string = if self.unit.is_empty() {
            string
        } else {
            string.trim_end_matches(self.unit).trim_end()
        };
        let value = string.parse::<i32>().ok()?;
        Some(self.clamp_value(value))
    }
}

impl Parameter for IntegerParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Integer
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_value(self.default)
    }

    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String {
        let value = self.denormalize_value(normalized);
        self.value_to_string(value, include_unit)
    }

    fn string_to_normalized_value(&self, string: String) -> Option<f32> {
        let value = self.string_to_value(&string)?;
        Some(self.normalize_value(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: IntegerParameter =
        IntegerParameter::new(FourCC(*b"TVOC"), "Voices", 64..=2048, 512);

    #[test]
    fn clamping_and_updates() -> Result<(), Error> {
        assert_eq!(VOICES.clamp_value(1), 64);
        assert_eq!(VOICES.clamp_value(4096), 2048);
        assert_eq!(VOICES.denormalize_value(0.0), 64);
        assert_eq!(VOICES.denormalize_value(1.0), 2048);
        assert_eq!(
            VOICES.update_value(&ParameterValueUpdate::Raw(Box::new(100usize)))?,
            100
        );
        assert_eq!(
            VOICES.update_value(&ParameterValueUpdate::Raw(Box::new(-5i64)))?,
            64
        );
        assert!(VOICES
            .update_value(&ParameterValueUpdate::Raw(Box::new(1.0f32)))
            .is_err());
        assert_eq!(VOICES.string_to_value(" 128 "), Some(128));
        Ok(())
    }
}
