use std::fmt::Debug;

use four_cc::FourCC;

use super::{Parameter, ParameterType, ParameterValueUpdate};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// A boolean parameter descriptor.
#[derive(Debug, Clone)]
pub struct BooleanParameter {
    id: FourCC,
    name: &'static str,
    default: bool,
}

impl BooleanParameter {
    /// Create a new boolean parameter descriptor.
    pub const fn new(id: FourCC, name: &'static str, default: bool) -> Self {
        Self { id, name, default }
    }

    /// The parameter's identifier.
    pub const fn id(&self) -> FourCC {
        self.id
    }

    /// The parameter's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter's default value.
    pub const fn default_value(&self) -> bool {
        self.default
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub const fn normalize_value(&self, value: bool) -> f32 {
        if value {
            1.0
        } else {
            0.0
        }
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> bool {
        normalized >= 0.5
    }

    /// Resolve a [`ParameterValueUpdate`] to a plain value.
    pub fn update_value(&self, update: &ParameterValueUpdate) -> Result<bool, Error> {
        match update {
            ParameterValueUpdate::Normalized(normalized) => {
                Ok(self.denormalize_value(*normalized))
            }
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<bool>() {
                    Ok(*value)
                } else if let Some(value) = raw.downcast_ref::<f32>() {
                    // hosts often deliver toggles as raw float values
                    Ok(*value > 0.5)
                } else {
                    Err(Error::ParameterError(format!(
                        "Unsupported payload type for boolean parameter '{}'",
                        self.name
                    )))
                }
            }
        }
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: bool) -> String {
        if value {
            "ON".to_string()
        } else {
            "OFF".to_string()
        }
    }

    /// Convert the given string to a plain value.
    pub fn string_to_value(&self, string: &str) -> Option<bool> {
        let string = string.trim();
        if string.eq_ignore_ascii_case("ON") {
            Some(true)
        } else if string.eq_ignore_ascii_case("OFF") {
            Some(false)
        } else {
            string.parse::<bool>().ok()
        }
    }
}

impl Parameter for BooleanParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Boolean
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_value(self.default)
    }

    fn normalized_value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.value_to_string(self.denormalize_value(normalized))
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

    #[test]
    fn conversions() -> Result<(), Error> {
        let toggle = BooleanParameter::new(FourCC(*b"TTGL"), "Toggle", false);
        assert_eq!(toggle.string_to_value("on"), Some(true));
        assert_eq!(toggle.string_to_value("false"), Some(false));
        assert_eq!(toggle.string_to_value("maybe"), None);
        assert!(toggle.update_value(&ParameterValueUpdate::Normalized(0.7))?);
        assert!(toggle.update_value(&ParameterValueUpdate::Raw(Box::new(1.0f32)))?);
        assert!(!toggle.update_value(&ParameterValueUpdate::Raw(Box::new(false)))?);
        Ok(())
    }
}
