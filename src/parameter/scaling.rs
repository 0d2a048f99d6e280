// -------------------------------------------------------------------------------------------------

/// Parameter scaling for float parameters, applied to convert normalized UI or automation
/// values to the internal values.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum ParameterScaling {
    #[default]
    /// Linear scaling: `y = x` (no transformation applied)
    Linear,

    /// Exponential scaling: `y = x^factor`
    /// Factor must be > 0.0.
    ///
    /// Values > 1.0 spend more of the normalized range on small values, which suits
    /// time and rate parameters (e.g. grain sizes from a few ms up to 30 seconds).
    Exponential(f32),
}

impl ParameterScaling {
    /// Apply scaling to a normalized f32 value.
    pub fn scale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(*factor),
        }
    }

    /// Apply inverse scaling to a normalized f32 value.
    pub fn unscale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => {
                let factor = factor.abs().max(0.001);
                value.powf(1.0 / factor)
            }
        }
    }

    pub(crate) const fn validate(&self) {
        match self {
            ParameterScaling::Linear => {}
            ParameterScaling::Exponential(factor) => {
                assert!(
                    *factor > 0.0,
                    "Invalid exponential parameter scaling factor (must be > 0)"
                );
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear() {
        let scaling = ParameterScaling::Linear;
        assert_eq!(scaling.scale(0.25), 0.25);
        assert_eq!(scaling.unscale(0.75), 0.75);
    }

    #[test]
    fn exponential() {
        let scaling = ParameterScaling::Exponential(2.0);
        assert_eq!(scaling.scale(0.0), 0.0);
        assert_eq!(scaling.scale(1.0), 1.0);
        assert!((scaling.scale(0.5) - 0.25).abs() < 1e-6);
        for step in 0..=10 {
            let value = step as f32 / 10.0;
            assert!((scaling.unscale(scaling.scale(value)) - value).abs() < 1e-5);
        }
    }
}
