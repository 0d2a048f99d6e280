use four_cc::FourCC;

use crate::{
    parameter::{
        BooleanParameter, FloatParameter, IntoBoxedParameter, Parameter, ParameterScaling,
        ParameterValueUpdate,
    },
    utils::{db_to_linear, linear_to_db},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Clamped parameter set of a [`GrainEngine`](super::GrainEngine).
///
/// All setters silently clamp their input into the parameter's valid range. NaN values reset
/// the parameter to its default.
#[derive(Debug, Clone, PartialEq)]
pub struct GrainParameters {
    size: f32,
    density: f32,
    position: f32,
    pitch: f32,
    pan_spread: f32,
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    reverse: bool,
    spray: f32,
    pitch_random: f32,
    volume: f32,
}

impl Default for GrainParameters {
    fn default() -> Self {
        Self {
            size: Self::SIZE.default_value(),
            density: Self::DENSITY.default_value(),
            position: Self::POSITION.default_value(),
            pitch: Self::PITCH.default_value(),
            pan_spread: Self::PAN_SPREAD.default_value(),
            attack: Self::ATTACK.default_value(),
            decay: Self::DECAY.default_value(),
            sustain: Self::SUSTAIN.default_value(),
            release: Self::RELEASE.default_value(),
            reverse: Self::REVERSE.default_value(),
            spray: Self::SPRAY.default_value(),
            pitch_random: Self::PITCH_RANDOM.default_value(),
            volume: Self::VOLUME.default_value(),
        }
    }
}

impl GrainParameters {
    pub const SIZE: FloatParameter =
        FloatParameter::new(FourCC(*b"GSIZ"), "Grain Size", 10.0..=30000.0, 100.0)
            .with_scaling(ParameterScaling::Exponential(3.0))
            .with_unit("ms");

    pub const DENSITY: FloatParameter =
        FloatParameter::new(FourCC(*b"GDEN"), "Density", 1.0..=100.0, 10.0)
            .with_scaling(ParameterScaling::Exponential(2.0))
            .with_unit("Hz");

    pub const POSITION: FloatParameter =
        FloatParameter::new(FourCC(*b"GPOS"), "Position", 0.0..=1.0, 0.0);

    pub const PITCH: FloatParameter =
        FloatParameter::new(FourCC(*b"GPIT"), "Pitch", -24.0..=24.0, 0.0).with_unit("st");

    pub const PAN_SPREAD: FloatParameter =
        FloatParameter::new(FourCC(*b"GPAN"), "Pan Spread", 0.0..=1.0, 0.5);

    pub const ATTACK: FloatParameter =
        FloatParameter::new(FourCC(*b"GATK"), "Attack", 0.0..=100.0, 10.0).with_unit("ms");

    pub const DECAY: FloatParameter =
        FloatParameter::new(FourCC(*b"GDCY"), "Decay", 0.0..=500.0, 50.0).with_unit("ms");

    pub const SUSTAIN: FloatParameter =
        FloatParameter::new(FourCC(*b"GSUS"), "Sustain", 0.0..=1.0, 0.8);

    pub const RELEASE: FloatParameter =
        FloatParameter::new(FourCC(*b"GREL"), "Release", 0.0..=5000.0, 50.0)
            .with_scaling(ParameterScaling::Exponential(2.0))
            .with_unit("ms");

    pub const REVERSE: BooleanParameter =
        BooleanParameter::new(FourCC(*b"GREV"), "Reverse", false);

    pub const SPRAY: FloatParameter =
        FloatParameter::new(FourCC(*b"GSPY"), "Spray", 0.0..=1.0, 0.0);

    pub const PITCH_RANDOM: FloatParameter =
        FloatParameter::new(FourCC(*b"GPRN"), "Pitch Random", 0.0..=24.0, 0.0).with_unit("st");

    pub const VOLUME: FloatParameter =
        FloatParameter::new(FourCC(*b"GVOL"), "Volume", 0.0..=1.0, 1.0);

    /// Create a new parameter set with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter descriptors of all grain parameters.
    pub fn descriptors() -> Vec<Box<dyn Parameter>> {
        let percent_to_string = |v: f32| format!("{:.1} %", v * 100.0);
        let string_to_percent = |s: &str| {
            let s = s
                .trim_start()
                .trim_end_matches(|c: char| c == '%' || c.is_whitespace());
            s.parse::<f32>().ok().map(|v| v / 100.0)
        };

        let gain_to_string = |v: f32| {
            let db = linear_to_db(v);
            if db <= -60.0 {
                "-INF".to_string()
            } else {
                format!("{:.2}", db)
            }
        };
        let string_to_gain = |s: &str| {
            if s.trim().eq_ignore_ascii_case("-inf") {
                Some(0.0)
            } else {
                let s = s.trim_start().trim_end_matches(|c: char| {
                    c.eq_ignore_ascii_case(&'d')
                        || c.eq_ignore_ascii_case(&'b')
                        || c.is_whitespace()
                });
                s.parse::<f32>().ok().map(db_to_linear)
            }
        };

        vec![
            Self::SIZE.into_box(),
            Self::DENSITY.into_box(),
            Self::POSITION
                .with_display(percent_to_string, string_to_percent)
                .into_box(),
            Self::PITCH.into_box(),
            Self::PAN_SPREAD
                .with_display(percent_to_string, string_to_percent)
                .into_box(),
            Self::ATTACK.into_box(),
            Self::DECAY.into_box(),
            Self::SUSTAIN
                .with_display(percent_to_string, string_to_percent)
                .into_box(),
            Self::RELEASE.into_box(),
            Self::REVERSE.into_box(),
            Self::SPRAY
                .with_display(percent_to_string, string_to_percent)
                .into_box(),
            Self::PITCH_RANDOM.into_box(),
            Self::VOLUME
                .with_unit("dB")
                .with_display(gain_to_string, string_to_gain)
                .into_box(),
        ]
    }

    /// Apply the given [`ParameterValueUpdate`] to the parameter with the given id.
    pub fn apply_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        match id {
            _ if id == Self::SIZE.id() => self.size = Self::SIZE.update_value(value)?,
            _ if id == Self::DENSITY.id() => self.density = Self::DENSITY.update_value(value)?,
            _ if id == Self::POSITION.id() => self.position = Self::POSITION.update_value(value)?,
            _ if id == Self::PITCH.id() => self.pitch = Self::PITCH.update_value(value)?,
            _ if id == Self::PAN_SPREAD.id() => {
                self.pan_spread = Self::PAN_SPREAD.update_value(value)?
            }
            _ if id == Self::ATTACK.id() => self.attack = Self::ATTACK.update_value(value)?,
            _ if id == Self::DECAY.id() => self.decay = Self::DECAY.update_value(value)?,
            _ if id == Self::SUSTAIN.id() => self.sustain = Self::SUSTAIN.update_value(value)?,
            _ if id == Self::RELEASE.id() => self.release = Self::RELEASE.update_value(value)?,
            _ if id == Self::REVERSE.id() => self.reverse = Self::REVERSE.update_value(value)?,
            _ if id == Self::SPRAY.id() => self.spray = Self::SPRAY.update_value(value)?,
            _ if id == Self::PITCH_RANDOM.id() => {
                self.pitch_random = Self::PITCH_RANDOM.update_value(value)?
            }
            _ if id == Self::VOLUME.id() => self.volume = Self::VOLUME.update_value(value)?,
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown grain parameter: '{id}'"
                )))
            }
        }
        Ok(())
    }

    /// Grain size in milliseconds.
    pub fn size(&self) -> f32 {
        self.size
    }
    pub fn set_size(&mut self, size_ms: f32) {
        self.size = Self::SIZE.clamp_value(size_ms);
    }

    /// Grain spawn rate in grains per second.
    pub fn density(&self) -> f32 {
        self.density
    }
    pub fn set_density(&mut self, density: f32) {
        self.density = Self::DENSITY.clamp_value(density);
    }

    /// Normalized grain start position in the source.
    pub fn position(&self) -> f32 {
        self.position
    }
    pub fn set_position(&mut self, position: f32) {
        self.position = Self::POSITION.clamp_value(position);
    }

    /// Transposition in semitones.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }
    pub fn set_pitch(&mut self, semitones: f32) {
        self.pitch = Self::PITCH.clamp_value(semitones);
    }

    /// Random stereo spread of grains.
    pub fn pan_spread(&self) -> f32 {
        self.pan_spread
    }
    pub fn set_pan_spread(&mut self, spread: f32) {
        self.pan_spread = Self::PAN_SPREAD.clamp_value(spread);
    }

    /// Grain attack time in milliseconds.
    pub fn attack(&self) -> f32 {
        self.attack
    }
    pub fn set_attack(&mut self, attack_ms: f32) {
        self.attack = Self::ATTACK.clamp_value(attack_ms);
    }

    /// Grain decay time in milliseconds.
    pub fn decay(&self) -> f32 {
        self.decay
    }
    pub fn set_decay(&mut self, decay_ms: f32) {
        self.decay = Self::DECAY.clamp_value(decay_ms);
    }

    /// Grain sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }
    pub fn set_sustain(&mut self, sustain: f32) {
        self.sustain = Self::SUSTAIN.clamp_value(sustain);
    }

    /// Grain release time in milliseconds.
    pub fn release(&self) -> f32 {
        self.release
    }
    pub fn set_release(&mut self, release_ms: f32) {
        self.release = Self::RELEASE.clamp_value(release_ms);
    }

    /// True when grains play backwards.
    pub fn reverse(&self) -> bool {
        self.reverse
    }
    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Random jitter of the grain start position.
    pub fn spray(&self) -> f32 {
        self.spray
    }
    pub fn set_spray(&mut self, spray: f32) {
        self.spray = Self::SPRAY.clamp_value(spray);
    }

    /// Random pitch deviation in semitones.
    pub fn pitch_random(&self) -> f32 {
        self.pitch_random
    }
    pub fn set_pitch_random(&mut self, semitones: f32) {
        self.pitch_random = Self::PITCH_RANDOM.clamp_value(semitones);
    }

    /// Master volume as linear gain.
    pub fn volume(&self) -> f32 {
        self.volume
    }
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = Self::VOLUME.clamp_value(volume);
    }
}

// -------------------------------------------------------------------------------------------------
