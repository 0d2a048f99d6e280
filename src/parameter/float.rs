use std::{fmt::Debug, ops::RangeInclusive, sync::Arc};

use four_cc::FourCC;

use super::{Parameter, ParameterScaling, ParameterType, ParameterValueUpdate};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
#[derive(Clone)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
    scaling: ParameterScaling,
    #[allow(clippy::type_complexity)]
    value_to_string: Option<Arc<dyn Fn(f32) -> String + Send + Sync>>,
    #[allow(clippy::type_complexity)]
    string_to_value: Option<Arc<dyn Fn(&str) -> Option<f32> + Send + Sync>>,
}

impl Debug for FloatParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatParameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("default", &self.default)
            .field("unit", &self.unit)
            .field("scaling", &self.scaling)
            .field("value_to_string", &self.value_to_string.is_some())
            .field("string_to_value", &self.string_to_value.is_some())
            .finish()
    }
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
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
            scaling: ParameterScaling::Linear,
            value_to_string: None,
            string_to_value: None,
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Optional scaling, applied when converting normalized values.
    pub const fn with_scaling(mut self, scaling: ParameterScaling) -> Self {
        scaling.validate();
        self.scaling = scaling;
        self
    }

    /// Optional custom conversion functions to convert a plain value to a string and string
    /// to a plain value.
    ///
    /// Returned strings should not contain a unit, if a unit already was set for this parameter.
    /// Parsed values get clamped automatically.
    pub fn with_display<
        ValueToString: Fn(f32) -> String + Send + Sync + 'static,
        StringToValue: Fn(&str) -> Option<f32> + Send + Sync + 'static,
    >(
        mut self,
        value_to_string: ValueToString,
        string_to_value: StringToValue,
    ) -> Self {
        self.value_to_string = Some(Arc::new(value_to_string));
        self.string_to_value = Some(Arc::new(string_to_value));
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
    pub const fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's default value.
    pub const fn default_value(&self) -> f32 {
        self.default
    }

    /// The parameter's unit.
    pub const fn unit(&self) -> &'static str {
        self.unit
    }

    /// Clamp the given plain value to the parameter's range. NaN values resolve to the default.
    pub fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(*self.range.start(), *self.range.end())
        }
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: f32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        let linear = ((self.clamp_value(value) - start) / (end - start)).clamp(0.0, 1.0);
        self.scaling.unscale(linear)
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        let scaled = self.scaling.scale(normalized.clamp(0.0, 1.0));
        self.clamp_value(start + scaled * (end - start))
    }

    /// Resolve a [`ParameterValueUpdate`] to a clamped plain value.
    pub fn update_value(&self, update: &ParameterValueUpdate) -> Result<f32, Error> {
        match update {
            ParameterValueUpdate::Normalized(normalized) => {
                Ok(self.denormalize_value(*normalized))
            }
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<f32>() {
                    Ok(self.clamp_value(*value))
                } else if let Some(value) = raw.downcast_ref::<f64>() {
                    Ok(self.clamp_value(*value as f32))
                } else {
                    Err(Error::ParameterError(format!(
                        "Unsupported payload type for float parameter '{}'",
                        self.name
                    )))
                }
            }
        }
    }

    /// Convert the given plain value to a string, using a custom conversion function if provided.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        match (&self.value_to_string, include_unit && !self.unit.is_empty()) {
            (Some(f), true) => format!("{} {}", f(value), self.unit),
            (Some(f), false) => f(value),
            (None, true) => format!("{:.2} {}", value, self.unit),
            (None, false) => format!("{:.2}", value),
        }
    }

    /// Convert the given string to a plain value, using a custom conversion function if provided.
    pub fn string_to_value(&self, string: &str) -> Option<f32> {
        let value = match &self.string_to_value {
            Some(f) => f(string.trim()),
            None => {
                let string = string.trim();
                if self.unit.is_empty() {
                    string.parse().ok()
                } else {
                    string.trim_end_matches(self.unit).trim_end().parse().ok()
                }
            }
        }?;
        Some(self.clamp_value(value))
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Float
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

    const SIZE: FloatParameter =
        FloatParameter::new(FourCC(*b"TSIZ"), "Size", 10.0..=1000.0, 100.0)
            .with_scaling(ParameterScaling::Exponential(2.0))
            .with_unit("ms");

    #[test]
    fn clamping() {
        assert_eq!(SIZE.clamp_value(5.0), 10.0);
        assert_eq!(SIZE.clamp_value(5000.0), 1000.0);
        assert_eq!(SIZE.clamp_value(123.0), 123.0);
        assert_eq!(SIZE.clamp_value(f32::NAN), 100.0);
    }

    #[test]
    fn normalization() {
        assert_eq!(SIZE.denormalize_value(0.0), 10.0);
        assert_eq!(SIZE.denormalize_value(1.0), 1000.0);
        assert!((SIZE.denormalize_value(0.5) - (10.0 + 0.25 * 990.0)).abs() < 1e-3);
        let normalized = SIZE.normalize_value(500.0);
        assert!((SIZE.denormalize_value(normalized) - 500.0).abs() < 1e-2);
    }

    #[test]
    fn updates() -> Result<(), Error> {
        assert_eq!(
            SIZE.update_value(&ParameterValueUpdate::Raw(Box::new(2000.0f32)))?,
            1000.0
        );
        assert_eq!(
            SIZE.update_value(&ParameterValueUpdate::Raw(Box::new(50.0f64)))?,
            50.0
        );
        assert_eq!(
            SIZE.update_value(&ParameterValueUpdate::Normalized(1.0))?,
            1000.0
        );
        assert!(SIZE
            .update_value(&ParameterValueUpdate::Raw(Box::new("nope")))
            .is_err());
        Ok(())
    }

    #[test]
    fn strings() {
        assert_eq!(SIZE.value_to_string(100.0, true), "100.00 ms");
        assert_eq!(SIZE.value_to_string(100.0, false), "100.00");
        assert_eq!(SIZE.string_to_value("250 ms"), Some(250.0));
        assert_eq!(SIZE.string_to_value("1"), Some(10.0));
        assert_eq!(SIZE.string_to_value("abc"), None);
    }
}
