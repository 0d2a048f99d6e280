use std::{fmt::Debug, str::FromStr};

use four_cc::FourCC;

use super::{Parameter, ParameterType, ParameterValueUpdate};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor.
///
/// Values usually are the `VARIANTS` of an enum deriving `strum::VariantNames`, so the
/// descriptor can be created in const contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: &'static [&'static str],
    default_index: usize,
}

impl EnumParameter {
    /// Create a new enum parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        values: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        assert!(!values.is_empty(), "Need at least one enum value");
        assert!(default_index < values.len(), "Invalid default index");
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    /// The parameter's identifier.
    pub const fn id(&self) -> FourCC {
        self.id
    }

    /// The parameter's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// All possible values as strings.
    pub const fn values(&self) -> &'static [&'static str] {
        self.values
    }

    /// The parameter's default value as string.
    pub const fn default_value(&self) -> &'static str {
        self.values[self.default_index]
    }

    /// Normalize the given value string to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: &str) -> f32 {
        if self.values.len() <= 1 {
            return 0.0;
        }
        if let Some(index) = self.values.iter().position(|v| *v == value) {
            return index as f32 / (self.values.len() - 1) as f32;
        }
        0.0
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding value string.
    pub fn denormalize_value(&self, normalized: f32) -> &'static str {
        let index = (normalized.clamp(0.0, 1.0) * (self.values.len() - 1) as f32).round();
        self.values[(index as usize).min(self.values.len() - 1)]
    }

    /// Resolve a [`ParameterValueUpdate`] to a typed enum value.
    pub fn update_value<T>(&self, update: &ParameterValueUpdate) -> Result<T, Error>
    where
        T: FromStr + Clone + 'static,
    {
        let parse = |string: &str| {
            T::from_str(string).map_err(|_| {
                Error::ParameterError(format!(
                    "Invalid value '{string}' for enum parameter '{}'",
                    self.name
                ))
            })
        };
        match update {
            ParameterValueUpdate::Normalized(normalized) => {
                parse(self.denormalize_value(*normalized))
            }
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<T>() {
                    Ok(value.clone())
                } else if let Some(value) = raw.downcast_ref::<String>() {
                    parse(value.as_str())
                } else if let Some(value) = raw.downcast_ref::<&'static str>() {
                    parse(*value)
                } else {
                    Err(Error::ParameterError(format!(
                        "Unsupported payload type for enum parameter '{}'",
                        self.name
                    )))
                }
            }
        }
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_value(self.default_value())
    }

    fn normalized_value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.denormalize_value(normalized).to_string()
    }

    fn string_to_normalized_value(&self, string: String) -> Option<f32> {
        let string = string.trim();
        self.values
            .iter()
            .find(|v| v.eq_ignore_ascii_case(string))
            .map(|v| self.normalize_value(v))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, strum::EnumString, strum::VariantNames)]
    enum Shape {
        Round,
        Square,
        Pointed,
    }

    const SHAPE: EnumParameter = EnumParameter::new(
        FourCC(*b"TSHP"),
        "Shape",
        <Shape as strum::VariantNames>::VARIANTS,
        1,
    );

    #[test]
    fn normalization() {
        assert_eq!(SHAPE.default_value(), "Square");
        assert_eq!(SHAPE.normalize_value("Round"), 0.0);
        assert_eq!(SHAPE.normalize_value("Pointed"), 1.0);
        assert_eq!(SHAPE.denormalize_value(0.5), "Square");
        assert_eq!(SHAPE.default_normalized_value(), 0.5);
        assert_eq!(SHAPE.string_to_normalized_value("pointed".into()), Some(1.0));
    }

    #[test]
    fn updates() -> Result<(), Error> {
        assert_eq!(
            SHAPE.update_value::<Shape>(&ParameterValueUpdate::Normalized(1.0))?,
            Shape::Pointed
        );
        assert_eq!(
            SHAPE.update_value::<Shape>(&ParameterValueUpdate::Raw(Box::new(Shape::Round)))?,
            Shape::Round
        );
        assert_eq!(
            SHAPE.update_value::<Shape>(&ParameterValueUpdate::Raw(Box::new(
                "Square".to_string()
            )))?,
            Shape::Square
        );
        assert!(SHAPE
            .update_value::<Shape>(&ParameterValueUpdate::Raw(Box::new(42u8)))
            .is_err());
        Ok(())
    }
}
