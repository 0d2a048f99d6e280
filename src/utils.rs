//! Common audio and math helpers.

pub mod buffer;

// -------------------------------------------------------------------------------------------------

const MINUS_INF_IN_DB: f32 = -200.0f32;

const LIN_TO_DB_FACTOR: f32 = 20.0f32 / std::f32::consts::LN_10;
const DB_TO_LIN_FACTOR: f32 = std::f32::consts::LN_10 / 20.0f32;

// -------------------------------------------------------------------------------------------------

/// Convert a linear gain value to decibels.
pub fn linear_to_db(value: f32) -> f32 {
    if value == 1.0 {
        return 0.0; // avoid rounding errors at exactly 0 dB
    } else if value > 1e-12f32 {
        return value.ln() * LIN_TO_DB_FACTOR;
    }
    MINUS_INF_IN_DB
}

/// Convert a decibel value to a linear gain.
pub fn db_to_linear(value: f32) -> f32 {
    if value == 0.0f32 {
        return 1.0f32; // avoid rounding errors at exactly 0 dB
    } else if value > MINUS_INF_IN_DB {
        return (value * DB_TO_LIN_FACTOR).exp();
    }
    0.0f32
}

// -------------------------------------------------------------------------------------------------

/// Convert a transposition in (fractional) semitones to a playback speed ratio.
#[inline]
pub fn pitch_ratio_from_semitones(semitones: f32) -> f32 {
    2.0f32.powf(semitones / 12.0)
}

/// Equal power stereo gains for a panning position in range \[0, 1\]
/// (0 = left, 0.5 = center, 1 = right).
///
/// The pan angle is narrowed to \[π/8, 3π/8\], so the outermost positions still keep
/// some signal on the opposite channel. `left² + right²` is 1 for all positions.
#[inline]
pub fn equal_power_pan_gains(pan: f32) -> (f32, f32) {
    use std::f32::consts::{FRAC_PI_4, FRAC_PI_8};
    let angle = pan.clamp(0.0, 1.0) * FRAC_PI_4 + FRAC_PI_8;
    (angle.cos(), angle.sin())
}

/// Raised cosine shaping of a linear ramp value in range \[0, 1\].
#[inline]
pub fn raised_cosine(value: f32) -> f32 {
    0.5 * (1.0 - (value * std::f32::consts::PI).cos())
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_db_conversion() {
        assert_eq!(linear_to_db(1.0), 0.0);
        assert_eq!(linear_to_db(0.0), MINUS_INF_IN_DB);
        assert_eq!(db_to_linear(MINUS_INF_IN_DB), 0.0);
        assert_eq!(db_to_linear(0.0), 1.0);
        assert!((linear_to_db(db_to_linear(20.0)) - 20.0).abs() < 0.0001);
        assert!((linear_to_db(db_to_linear(-20.0)) + 20.0).abs() < 0.0001);
    }

    #[test]
    fn pitch_ratios() {
        assert_eq!(pitch_ratio_from_semitones(0.0), 1.0);
        assert!((pitch_ratio_from_semitones(12.0) - 2.0).abs() < 1e-6);
        assert!((pitch_ratio_from_semitones(-12.0) - 0.5).abs() < 1e-6);
        assert!((pitch_ratio_from_semitones(7.0) - 1.498_307).abs() < 1e-5);
    }

    #[test]
    fn equal_power_panning() {
        let (left, right) = equal_power_pan_gains(0.5);
        assert!((left - right).abs() < 1e-6);

        assert!((left - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        // outermost positions are not hard panned
        let (left, right) = equal_power_pan_gains(0.0);
        assert!((left - 0.923_879_5).abs() < 1e-5 && (right - 0.382_683_4).abs() < 1e-5);
        let (left, right) = equal_power_pan_gains(1.0);
        assert!((left - 0.382_683_4).abs() < 1e-5 && (right - 0.923_879_5).abs() < 1e-5);
        assert_eq!(equal_power_pan_gains(-1.0), equal_power_pan_gains(0.0));
        assert_eq!(equal_power_pan_gains(2.0), equal_power_pan_gains(1.0));

        for step in 0..=100 {
            let (left, right) = equal_power_pan_gains(step as f32 / 100.0);
            let power = left * left + right * right;
            assert!((power - 1.0).abs() < 1e-5, "power at step {step} is {power}");
        }
    }

    #[test]
    fn raised_cosine_shape() {
        assert_eq!(raised_cosine(0.0), 0.0);
        assert!((raised_cosine(0.5) - 0.5).abs() < 1e-6);
        assert!((raised_cosine(1.0) - 1.0).abs() < 1e-6);
        let mut previous = 0.0;
        for step in 1..=100 {
            let value = raised_cosine(step as f32 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }
}
