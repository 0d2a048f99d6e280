use four_cc::FourCC;
use strum::VariantNames;

use crate::{
    parameter::{EnumParameter, IntegerParameter},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// How the grain density gets distributed across multiple held notes.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
)]
#[repr(u8)]
pub enum GrainDensityMode {
    /// Each held note spawns grains at the configured density: the total spawn rate is
    /// `density * held_note_count`.
    #[default]
    PerNote,
    /// All held notes share the configured density: the total spawn rate is `density`.
    Shared,
}

impl GrainDensityMode {
    /// Effective total spawn rate in grains per second for the given density and note count.
    #[inline]
    pub fn effective_density(&self, density: f32, note_count: usize) -> f32 {
        match self {
            Self::PerNote => density * note_count as f32,
            Self::Shared => density,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Options to create a new [`GrainEngine`](super::GrainEngine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainEngineOptions {
    /// By default 512. Number of grain pool slots which may be used for playback, in range
    /// \[64, 2048\]. When all slots are busy, the grain which is closest to its end gets stolen.
    pub max_active_grains: usize,

    /// By default [`GrainDensityMode::PerNote`]. How grain density gets applied when multiple
    /// notes are held.
    pub density_mode: GrainDensityMode,

    /// By default None, which seeds the engine's random generator from the OS. Set a fixed
    /// seed to get reproducible grain clouds.
    pub seed: Option<u64>,

    /// By default 256. Capacity of the lock-free note event queue in a
    /// [`SharedGrainEngine`](super::SharedGrainEngine). Must be > 0.
    pub note_event_capacity: usize,
}

impl Default for GrainEngineOptions {
    fn default() -> Self {
        Self {
            max_active_grains: Self::DEFAULT_MAX_ACTIVE_GRAINS,
            density_mode: GrainDensityMode::default(),
            seed: None,
            note_event_capacity: 256,
        }
    }
}

impl GrainEngineOptions {
    pub const MIN_ACTIVE_GRAINS: usize = 64;
    pub const MAX_ACTIVE_GRAINS: usize = 2048;
    pub const DEFAULT_MAX_ACTIVE_GRAINS: usize = 512;

    pub const MAX_ACTIVE_GRAINS_PARAMETER: IntegerParameter = IntegerParameter::new(
        FourCC(*b"GMAX"),
        "Max Grains",
        Self::MIN_ACTIVE_GRAINS as i32..=Self::MAX_ACTIVE_GRAINS as i32,
        Self::DEFAULT_MAX_ACTIVE_GRAINS as i32,
    );

    pub const DENSITY_MODE_PARAMETER: EnumParameter = EnumParameter::new(
        FourCC(*b"GDMD"),
        "Density Mode",
        GrainDensityMode::VARIANTS,
        GrainDensityMode::PerNote as usize,
    );

    pub fn max_active_grains(mut self, max_active_grains: usize) -> Self {
        self.max_active_grains = max_active_grains;
        self
    }

    pub fn density_mode(mut self, density_mode: GrainDensityMode) -> Self {
        self.density_mode = density_mode;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn note_event_capacity(mut self, capacity: usize) -> Self {
        self.note_event_capacity = capacity;
        self
    }

    /// Validate all options. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if !(Self::MIN_ACTIVE_GRAINS..=Self::MAX_ACTIVE_GRAINS).contains(&self.max_active_grains)
        {
            return Err(Error::ParameterError(format!(
                "engine options 'max_active_grains' value is '{}', but must be in range [{}, {}]",
                self.max_active_grains,
                Self::MIN_ACTIVE_GRAINS,
                Self::MAX_ACTIVE_GRAINS
            )));
        }
        if self.note_event_capacity == 0 {
            return Err(Error::ParameterError(
                "engine options 'note_event_capacity' must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterValueUpdate;

    #[test]
    fn validation() {
        assert!(GrainEngineOptions::default().validate().is_ok());
        assert!(GrainEngineOptions::default()
            .max_active_grains(32)
            .validate()
            .is_err());
        assert!(GrainEngineOptions::default()
            .max_active_grains(4096)
            .validate()
            .is_err());
        assert!(GrainEngineOptions::default()
            .note_event_capacity(0)
            .validate()
            .is_err());
        let options = GrainEngineOptions::default()
            .max_active_grains(2048)
            .density_mode(GrainDensityMode::Shared)
            .seed(1234);
        assert!(options.validate().is_ok());
        assert_eq!(options.seed, Some(1234));
    }

    #[test]
    fn density_modes() -> Result<(), Error> {
        assert_eq!(GrainDensityMode::PerNote.effective_density(10.0, 3), 30.0);
        assert_eq!(GrainDensityMode::Shared.effective_density(10.0, 3), 10.0);
        let mode = GrainEngineOptions::DENSITY_MODE_PARAMETER
            .update_value::<GrainDensityMode>(&ParameterValueUpdate::Normalized(1.0))?;
        assert_eq!(mode, GrainDensityMode::Shared);
        assert_eq!("PerNote".parse::<GrainDensityMode>(), Ok(GrainDensityMode::PerNote));
        Ok(())
    }
}
