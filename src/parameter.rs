//! Parameter descriptors and value updates for the engine's control surface.

use std::{any::Any, fmt::Debug};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// Describes the type of a [`Parameter`] to e.g. select a proper visual representation in a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// A continuous floating-point value.
    Float,
    /// A discrete integer value.
    Integer,
    /// A choice from a list of strings (an enum).
    Enum { values: Vec<String> },
    /// A boolean toggle.
    Boolean,
}

// -------------------------------------------------------------------------------------------------

/// Describes a single engine parameter for use in UIs or for automation.
pub trait Parameter: Debug + Send + Sync {
    /// The unique id of the parameter.
    fn id(&self) -> FourCC;

    /// The name of the parameter.
    fn name(&self) -> &'static str;

    /// The parameter type.
    fn parameter_type(&self) -> ParameterType;

    /// Default value of parameter, expressed as normalized floating point value in range \[0,1\].
    fn default_normalized_value(&self) -> f32;

    /// Convert the given normalized floating point value to a string value.
    fn normalized_value_to_string(&self, normalized: f32, include_unit: bool) -> String;

    /// Convert the given string value to a normalized floating point value.
    /// Returns `None` when conversion failed, else a valid normalized value.
    fn string_to_normalized_value(&self, string: String) -> Option<f32>;
}

/// Allows creating `dyn Parameter` boxes from concrete descriptors.
pub trait IntoBoxedParameter: Parameter {
    /// Wrap the parameter into a box.
    fn into_box(self) -> Box<dyn Parameter>;
}

impl<P> IntoBoxedParameter for P
where
    P: Parameter + 'static,
{
    fn into_box(self) -> Box<dyn Parameter> {
        Box::new(self)
    }
}

// -------------------------------------------------------------------------------------------------

/// An update for a [`Parameter`]'s value, as sent by a host or automation system.
#[derive(Debug)]
pub enum ParameterValueUpdate {
    /// Raw, type-erased internal value (f32, i32, some Enum or boolean).
    Raw(Box<dyn Any + Send + Sync>),
    /// A float value in range `0.0..=1.0`.
    Normalized(f32),
}

impl ParameterValueUpdate {
    /// Wrap a plain value (f32, i32, bool or some enum) into a raw update.
    pub fn raw<T: Any + Send + Sync>(value: T) -> Self {
        Self::Raw(Box::new(value))
    }

    /// Create a normalized update. Values get clamped to `0.0..=1.0`, NaN maps to 0.
    pub fn normalized(value: f32) -> Self {
        if value.is_nan() {
            Self::Normalized(0.0)
        } else {
            Self::Normalized(value.clamp(0.0, 1.0))
        }
    }
}

// -------------------------------------------------------------------------------------------------

mod float;
pub use float::FloatParameter;

mod integer;
pub use integer::IntegerParameter;

mod r#enum;
pub use r#enum::EnumParameter;

mod boolean;
pub use boolean::BooleanParameter;

mod scaling;
pub use scaling::ParameterScaling;
