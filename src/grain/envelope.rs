use crate::utils::raised_cosine;

// -------------------------------------------------------------------------------------------------

/// Stages of a [`GrainEnvelope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
pub enum GrainEnvelopeStage {
    Attack,
    Decay,
    Sustain,
    /// Release in the last release samples of the grain.
    NaturalRelease,
    /// Release which got started via [`GrainEnvelope::trigger_release`].
    TriggeredRelease,
}

// -------------------------------------------------------------------------------------------------

/// Scale attack, decay and release sample times down proportionally, so that their sum fits
/// into the given grain length.
pub fn fit_envelope_times(
    attack: usize,
    decay: usize,
    release: usize,
    length: usize,
) -> (usize, usize, usize) {
    let total = attack + decay + release;
    if total <= length {
        return (attack, decay, release);
    }
    let scale = length as f64 / total as f64;
    let scaled = |samples: usize| (samples as f64 * scale).floor() as usize;
    (scaled(attack), scaled(decay), scaled(release))
}

// -------------------------------------------------------------------------------------------------

/// ADSR amplitude envelope of a single grain.
///
/// The envelope is evaluated per processed grain sample. Raw linear levels are smoothed via a
/// raised cosine curve before they are applied. A triggered release ramps the raw level at the
/// moment of the trigger down to zero, overriding the natural envelope.
#[derive(Debug, Clone)]
pub struct GrainEnvelope {
    length: usize,
    attack: usize,
    decay: usize,
    sustain: f32,
    release: usize,
    stage: GrainEnvelopeStage,
    raw_level: f32,
    level: f32,
    // sample index and raw level at the time the release got triggered
    triggered_release: Option<(usize, f32)>,
}

impl Default for GrainEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainEnvelope {
    /// Levels below this value terminate triggered releases.
    pub const SILENCE_THRESHOLD: f32 = 0.001; // ~ -60dB

    /// Create a new, silent envelope.
    pub const fn new() -> Self {
        Self {
            length: 0,
            attack: 0,
            decay: 0,
            sustain: 1.0,
            release: 0,
            stage: GrainEnvelopeStage::Attack,
            raw_level: 0.0,
            level: 0.0,
            triggered_release: None,
        }
    }

    /// Reset the envelope for a new grain with the given length and stage times in samples.
    /// Stage times get rescaled to fit into the grain length when necessary.
    pub fn reset(
        &mut self,
        length: usize,
        attack: usize,
        decay: usize,
        sustain: f32,
        release: usize,
    ) {
        let (attack, decay, release) = fit_envelope_times(attack, decay, release, length);
        self.length = length;
        self.attack = attack;
        self.decay = decay;
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release = release;
        self.stage = GrainEnvelopeStage::Attack;
        self.raw_level = 0.0;
        self.level = 0.0;
        self.triggered_release = None;
    }

    /// Current envelope stage.
    #[inline]
    pub fn stage(&self) -> GrainEnvelopeStage {
        self.stage
    }

    /// Last evaluated, shaped envelope level in range \[0, 1\].
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Last evaluated, unshaped envelope level in range \[0, 1\].
    #[inline]
    pub fn raw_level(&self) -> f32 {
        self.raw_level
    }

    /// Attack, decay and release times in samples, after fitting them into the grain length.
    pub fn stage_times(&self) -> (usize, usize, usize) {
        (self.attack, self.decay, self.release)
    }

    /// True when a release got triggered.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.triggered_release.is_some()
    }

    /// True when a triggered release faded out.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.is_released() && self.level < Self::SILENCE_THRESHOLD
    }

    /// Start releasing from the current level at the given grain sample index.
    /// Does nothing when the envelope already got released.
    pub fn trigger_release(&mut self, sample_index: usize) {
        if self.triggered_release.is_none() {
            self.triggered_release = Some((sample_index, self.raw_level));
            self.stage = GrainEnvelopeStage::TriggeredRelease;
        }
    }

    /// Evaluate the envelope at the given grain sample index and return the shaped level.
    pub fn process(&mut self, sample_index: usize) -> f32 {
        if self.length == 0 {
            self.raw_level = 0.0;
            self.level = 0.0;
            return 0.0;
        }
        let raw_level = if let Some((release_index, release_level)) = self.triggered_release {
            if self.release == 0 {
                0.0
            } else {
                let elapsed = sample_index.saturating_sub(release_index) as f32;
                release_level * (1.0 - elapsed / self.release as f32).max(0.0)
            }
        } else if self.release > 0 && sample_index >= self.length - self.release {
            let release_level = self.sustained_level(self.length - self.release);
            self.stage = GrainEnvelopeStage::NaturalRelease;
            let remaining = self.length.saturating_sub(sample_index) as f32;
            release_level * remaining / self.release as f32
        } else {
            self.sustained_level(sample_index)
        };
        self.raw_level = raw_level.clamp(0.0, 1.0);
        self.level = raised_cosine(self.raw_level);
        self.level
    }

    /// Attack, decay and sustain level at the given sample index, updating the stage.
    fn sustained_level(&mut self, sample_index: usize) -> f32 {
        if sample_index < self.attack {
            self.stage = GrainEnvelopeStage::Attack;
            sample_index as f32 / self.attack as f32
        } else if sample_index < self.attack + self.decay {
            self.stage = GrainEnvelopeStage::Decay;
            let phase = (sample_index - self.attack) as f32 / self.decay as f32;
            1.0 + (self.sustain - 1.0) * phase
        } else {
            self.stage = GrainEnvelopeStage::Sustain;
            self.sustain
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_times() {
        assert_eq!(fit_envelope_times(10, 20, 30, 100), (10, 20, 30));
        assert_eq!(fit_envelope_times(100, 100, 200, 200), (50, 50, 100));
        let (a, d, r) = fit_envelope_times(441, 2205, 220_500, 4410);
        assert!(a + d + r <= 4410);
        assert_eq!(fit_envelope_times(5, 5, 5, 0), (0, 0, 0));
    }

    #[test]
    fn stages() {
        let mut envelope = GrainEnvelope::new();
        envelope.reset(100, 10, 10, 0.5, 20);
        assert_eq!(envelope.process(0), 0.0);
        assert_eq!(envelope.stage(), GrainEnvelopeStage::Attack);
        assert!((envelope.process(10) - 1.0).abs() < 1e-6);
        assert_eq!(envelope.stage(), GrainEnvelopeStage::Decay);
        envelope.process(50);
        assert_eq!(envelope.stage(), GrainEnvelopeStage::Sustain);
        assert!((envelope.raw_level() - 0.5).abs() < 1e-6);
        assert!((envelope.level() - 0.5).abs() < 1e-6);
        envelope.process(80);
        assert_eq!(envelope.stage(), GrainEnvelopeStage::NaturalRelease);
        assert!((envelope.raw_level() - 0.5).abs() < 1e-6);
        envelope.process(99);
        assert!(envelope.raw_level() < 0.05);
    }

    #[test]
    fn two_stage_shape() {
        // decay = 0 and sustain = 1 is a plain attack/release window
        let mut envelope = GrainEnvelope::new();
        envelope.reset(100, 20, 0, 1.0, 20);
        for index in 20..80 {
            assert!((envelope.process(index) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn levels_in_range() {
        let mut envelope = GrainEnvelope::new();
        envelope.reset(1000, 300, 500, 0.3, 900);
        let (attack, decay, release) = envelope.stage_times();
        assert!(attack + decay + release <= 1000);
        for index in 0..1000 {
            let level = envelope.process(index);
            assert!((0.0..=1.0).contains(&level), "level {level} at {index}");
            if index == 400 {
                envelope.trigger_release(index);
            }
        }
    }

    #[test]
    fn triggered_release() {
        let mut envelope = GrainEnvelope::new();
        envelope.reset(1000, 0, 0, 1.0, 100);
        assert!((envelope.process(10) - 1.0).abs() < 1e-6);
        envelope.trigger_release(11);
        assert!(envelope.is_released());
        assert_eq!(envelope.stage(), GrainEnvelopeStage::TriggeredRelease);
        assert!((envelope.process(11) - 1.0).abs() < 1e-6);
        assert!((envelope.process(61) - 0.5).abs() < 1e-6);
        envelope.trigger_release(61);
        assert!((envelope.process(61) - 0.5).abs() < 1e-6);
        envelope.process(111);
        assert!(envelope.is_silent());
    }

    #[test]
    fn empty_grain() {
        let mut envelope = GrainEnvelope::new();
        envelope.reset(0, 10, 10, 1.0, 10);
        assert_eq!(envelope.process(0), 0.0);
        assert_eq!(envelope.process(5), 0.0);
    }
}
