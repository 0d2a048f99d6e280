//! A single, reusable granular playback voice.

use assume::assume;

use crate::{
    sample::SampleBuffer,
    utils::{buffer::InterleavedBufferMut, equal_power_pan_gains},
};

// -------------------------------------------------------------------------------------------------

mod envelope;
pub use envelope::{fit_envelope_times, GrainEnvelope, GrainEnvelopeStage};

// -------------------------------------------------------------------------------------------------

/// A single grain: a short, enveloped, resampled and panned segment of a source buffer.
///
/// Grains live in a preallocated pool and get re-initialized via [`Grain::start`]. They don't
/// own or reference the source buffer: the buffer is passed to [`Grain::process`] instead, so
/// the owner of the grain controls the source's lifetime.
#[derive(Debug, Clone)]
pub struct Grain {
    /// Is this grain currently playing?
    active: bool,
    /// Did this grain play or fade out since its last start?
    done: bool,
    /// Frame count of the source at the time the grain got started.
    source_length: usize,
    /// Sample rate of the source at the time the grain got started.
    source_sample_rate: u32,
    /// Offset of the grain window in the source, in source frames.
    start_offset: usize,
    /// Length of the grain in samples.
    length: usize,
    /// Playback speed (> 0).
    pitch_ratio: f64,
    /// Equal power stereo gains.
    left_gain: f32,
    right_gain: f32,
    reverse: bool,
    velocity: f32,
    /// MIDI note which spawned this grain.
    note: u8,
    /// Fractional read position, relative to the start offset.
    position: f64,
    samples_processed: usize,
    envelope: GrainEnvelope,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    /// Create a new inactive grain.
    pub const fn new() -> Self {
        Self {
            active: false,
            done: false,
            source_length: 0,
            source_sample_rate: 0,
            start_offset: 0,
            length: 0,
            pitch_ratio: 1.0,
            left_gain: std::f32::consts::FRAC_1_SQRT_2,
            right_gain: std::f32::consts::FRAC_1_SQRT_2,
            reverse: false,
            velocity: 1.0,
            note: 0,
            position: 0.0,
            samples_processed: 0,
            envelope: GrainEnvelope::new(),
        }
    }

    /// Check if this grain is currently playing.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Check if this grain finished playback since it got started.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Check if a release got triggered for this grain.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.envelope.is_released()
    }

    /// The MIDI note which spawned this grain.
    #[inline]
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Note velocity in range \[0, 1\].
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Grain window offset in the source, in frames.
    #[inline]
    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    /// Grain length in samples.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Source frame count at the time the grain got started.
    #[inline]
    pub fn source_length(&self) -> usize {
        self.source_length
    }

    /// Source sample rate at the time the grain got started.
    #[inline]
    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    /// Playback speed ratio.
    #[inline]
    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    /// True when the grain plays backwards.
    #[inline]
    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Left and right equal power panning gains.
    #[inline]
    pub fn pan_gains(&self) -> (f32, f32) {
        (self.left_gain, self.right_gain)
    }

    /// Number of samples this grain rendered since it got started.
    #[inline]
    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Grain playback progress in range \[0, 1\].
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.length == 0 {
            0.0
        } else {
            (self.samples_processed as f32 / self.length as f32).min(1.0)
        }
    }

    /// Current, shaped envelope level in range \[0, 1\].
    #[inline]
    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    /// Current envelope stage.
    #[inline]
    pub fn envelope_stage(&self) -> GrainEnvelopeStage {
        self.envelope.stage()
    }

    /// Current read position in the source, normalized to range \[0, 1\].
    pub fn current_position(&self) -> f32 {
        if self.source_length == 0 {
            return 0.0;
        }
        let position = self.start_offset as f64 + self.position;
        (position / self.source_length as f64).clamp(0.0, 1.0) as f32
    }

    /// (Re)start this grain with the given settings.
    ///
    /// `length` is the grain length in samples and must be > 0. `pitch_ratio` is the playback
    /// speed and must be > 0. `pan` is the stereo position in range \[0, 1\] (0.5 = center).
    /// Attack, decay and release are sample times which get rescaled to fit into the grain.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        source: &SampleBuffer,
        start_offset: usize,
        length: usize,
        pitch_ratio: f64,
        pan: f32,
        attack: usize,
        decay: usize,
        sustain: f32,
        release: usize,
        reverse: bool,
        velocity: f32,
        note: u8,
    ) {
        debug_assert!(length > 0, "Invalid grain length");
        debug_assert!(pitch_ratio > 0.0, "Invalid grain pitch ratio");
        debug_assert!((0.0..=1.0).contains(&pan), "Invalid grain panning");

        self.active = true;
        self.done = false;
        self.source_length = source.frame_count();
        self.source_sample_rate = source.sample_rate();
        self.start_offset = start_offset;
        self.length = length;
        self.pitch_ratio = pitch_ratio.max(0.0);
        (self.left_gain, self.right_gain) = equal_power_pan_gains(pan);
        self.reverse = reverse;
        self.velocity = velocity.clamp(0.0, 1.0);
        self.note = note;
        self.position = if reverse {
            length.saturating_sub(1) as f64
        } else {
            0.0
        };
        self.samples_processed = 0;
        self.envelope.reset(length, attack, decay, sustain, release);
    }

    /// Start fading out from the current envelope level. Calling this on a grain which is
    /// already releasing has no effect.
    pub fn trigger_release(&mut self) {
        if self.active {
            self.envelope.trigger_release(self.samples_processed);
        }
    }

    /// Stop playback immediately.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.done = true;
    }

    /// Render and mix (add) the grain into the given interleaved output buffer, starting at the
    /// given output frame.
    ///
    /// Mono output receives the average of the left and right grain signal, wider layouts only
    /// the first two channels. Mono sources play on both stereo channels.
    ///
    /// The resampling step uses the source sample rate from [`Self::start`]. When a different
    /// source gets passed in later on, the grain reads it with that step.
    pub fn process(
        &mut self,
        source: &SampleBuffer,
        output: &mut [f32],
        channel_count: usize,
        start_frame: usize,
        output_sample_rate: u32,
    ) {
        if !self.active || channel_count == 0 || output_sample_rate == 0 {
            return;
        }
        let direction = if self.reverse { -1.0 } else { 1.0 };
        let step = self.pitch_ratio * self.source_sample_rate as f64 / output_sample_rate as f64
            * direction;
        let stereo_source = source.channel_count() > 1;

        for frame in output.frames_mut(channel_count).skip(start_frame) {
            let envelope = self.envelope.process(self.samples_processed);
            if self.envelope.is_silent() {
                self.deactivate();
                return;
            }

            let read_position = self.start_offset as f64 + self.position;
            let left = Self::interpolate_sample(source, 0, read_position);
            let right = if stereo_source {
                Self::interpolate_sample(source, 1, read_position)
            } else {
                left
            };
            let gain = envelope * self.velocity;
            let left = left * gain * self.left_gain;
            let right = right * gain * self.right_gain;
            match frame {
                [mono] => *mono += (left + right) * 0.5,
                [l, r, ..] => {
                    *l += left;
                    *r += right;
                }
                [] => (),
            }

            self.position += step;
            self.samples_processed += 1;
            if self.samples_processed >= self.length {
                self.deactivate();
                return;
            }
        }
    }

    /// Linearly interpolate a sample of the given source channel at a fractional frame
    /// position. Positions outside of `[0, frame_count - 1)` are silent.
    #[inline]
    pub fn interpolate_sample(source: &SampleBuffer, channel: usize, position: f64) -> f32 {
        let samples = source.channel(channel);
        let len = samples.len();
        if position.is_nan() || position < 0.0 || position >= len.saturating_sub(1) as f64 {
            return 0.0;
        }
        let index = position as usize;
        let fraction = (position - index as f64) as f32;
        assume!(unsafe: index + 1 < len, "Position is checked above");
        let y0 = samples[index];
        let y1 = samples[index + 1];
        y0 + (y1 - y0) * fraction
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(len: usize) -> SampleBuffer {
        let samples = (0..len).map(|i| i as f32 / len as f32).collect();
        SampleBuffer::from_planar(vec![samples], 44100).unwrap()
    }

    fn start_grain(grain: &mut Grain, source: &SampleBuffer, reverse: bool) {
        grain.start(source, 100, 400, 1.0, 0.5, 10, 0, 1.0, 10, reverse, 1.0, 60);
    }

    #[test]
    fn interpolation() {
        let source = SampleBuffer::from_planar(vec![vec![0.0, 1.0, 3.0]], 44100).unwrap();
        assert_eq!(Grain::interpolate_sample(&source, 0, 0.5), 0.5);
        assert_eq!(Grain::interpolate_sample(&source, 0, 1.5), 2.0);
        assert_eq!(Grain::interpolate_sample(&source, 0, 1.0), 1.0);
        assert_eq!(Grain::interpolate_sample(&source, 0, -0.5), 0.0);
        assert_eq!(Grain::interpolate_sample(&source, 0, 2.0), 0.0);
        assert_eq!(Grain::interpolate_sample(&source, 0, 10.0), 0.0);
    }

    #[test]
    fn lifecycle() {
        let source = ramp_buffer(1000);
        let mut grain = Grain::new();
        assert!(!grain.is_active());

        start_grain(&mut grain, &source, false);
        assert!(grain.is_active() && !grain.is_done());
        assert_eq!(grain.note(), 60);

        let mut output = vec![0.0; 2 * 256];
        grain.process(&source, &mut output, 2, 0, 44100);
        assert!(grain.is_active());
        assert_eq!(grain.samples_processed(), 256);
        assert!((grain.progress() - 256.0 / 400.0).abs() < 1e-6);

        let mut output = vec![0.0; 2 * 256];
        grain.process(&source, &mut output, 2, 0, 44100);
        assert!(!grain.is_active() && grain.is_done());
        assert_eq!(grain.samples_processed(), 400);
        // stops writing after the grain ended
        assert!(output[2 * 144..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn forward_and_reverse_positions() {
        let source = ramp_buffer(1000);
        let mut output = vec![0.0; 2 * 50];

        let mut grain = Grain::new();
        start_grain(&mut grain, &source, false);
        assert!((grain.current_position() - 100.0 / 1000.0).abs() < 1e-6);
        grain.process(&source, &mut output, 2, 0, 44100);
        assert!((grain.current_position() - 150.0 / 1000.0).abs() < 1e-6);

        let mut grain = Grain::new();
        start_grain(&mut grain, &source, true);
        assert!((grain.current_position() - 499.0 / 1000.0).abs() < 1e-6);
        grain.process(&source, &mut output, 2, 0, 44100);
        assert!((grain.current_position() - 449.0 / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn resampling_step() {
        let source = ramp_buffer(1000);
        let mut output = vec![0.0; 100];
        let mut grain = Grain::new();
        // one octave up, rendered at half the source rate: 4 source frames per output frame
        grain.start(&source, 0, 800, 2.0, 0.5, 0, 0, 1.0, 0, false, 1.0, 72);
        grain.process(&source, &mut output, 1, 0, 22050);
        assert!((grain.current_position() - 400.0 / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn swapped_source_keeps_step() {
        let source = ramp_buffer(1000);
        let swapped = SampleBuffer::from_planar(vec![vec![0.25; 2000]], 22050).unwrap();
        let mut output = vec![0.0; 100];
        let mut grain = Grain::new();
        grain.start(&source, 0, 800, 1.0, 0.5, 0, 0, 1.0, 0, false, 1.0, 60);
        grain.process(&swapped, &mut output, 1, 0, 44100);
        // step stays 1.0, and samples are read from the swapped buffer
        assert_eq!(grain.source_sample_rate(), 44100);
        assert!((grain.current_position() - 100.0 / 1000.0).abs() < 1e-6);
        let center = std::f32::consts::FRAC_1_SQRT_2;
        assert!(output.iter().all(|s| (s - 0.25 * center).abs() < 1e-6));
    }

    #[test]
    fn panning_and_velocity() {
        let source = SampleBuffer::from_planar(vec![vec![1.0; 1000]], 44100).unwrap();
        let mut grain = Grain::new();
        // no attack or release: constant envelope of 1
        grain.start(&source, 0, 500, 1.0, 0.0, 0, 0, 1.0, 0, false, 0.5, 60);
        let mut output = vec![0.0; 2 * 10];
        grain.process(&source, &mut output, 2, 0, 44100);
        // left-most pan: cos(π/8) and sin(π/8) gains, scaled by the velocity
        assert!((output[0] - 0.5 * 0.923_879_5).abs() < 1e-5);
        assert!((output[1] - 0.5 * 0.382_683_4).abs() < 1e-5);

        let (left, right) = grain.pan_gains();
        assert!((left * left + right * right - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stereo_source_and_output_layouts() {
        let source =
            SampleBuffer::from_planar(vec![vec![1.0; 1000], vec![-1.0; 1000]], 44100).unwrap();
        let mut grain = Grain::new();
        grain.start(&source, 0, 500, 1.0, 0.5, 0, 0, 1.0, 0, false, 1.0, 60);
        let center = std::f32::consts::FRAC_1_SQRT_2;

        let mut stereo = vec![0.0; 2 * 4];
        grain.process(&source, &mut stereo, 2, 0, 44100);
        assert!((stereo[0] - center).abs() < 1e-6);
        assert!((stereo[1] + center).abs() < 1e-6);

        let mut mono = vec![0.0; 4];
        grain.process(&source, &mut mono, 1, 0, 44100);
        assert!(mono.iter().all(|s| s.abs() < 1e-6));

        let mut surround = vec![0.0; 4 * 4];
        grain.process(&source, &mut surround, 4, 0, 44100);
        assert!((surround[0] - center).abs() < 1e-6);
        assert!((surround[1] + center).abs() < 1e-6);
        assert_eq!(surround[2], 0.0);
        assert_eq!(surround[3], 0.0);
    }

    #[test]
    fn accumulates_from_start_frame() {
        let source = SampleBuffer::from_planar(vec![vec![1.0; 1000]], 44100).unwrap();
        let mut grain = Grain::new();
        grain.start(&source, 0, 500, 1.0, 0.5, 0, 0, 1.0, 0, false, 1.0, 60);
        let mut output = vec![1.0; 8];
        grain.process(&source, &mut output, 1, 4, 44100);
        assert!(output[..4].iter().all(|s| *s == 1.0));
        assert!(output[4..].iter().all(|s| *s > 1.0));
        assert_eq!(grain.samples_processed(), 4);
    }

    #[test]
    fn envelope_range() {
        let source = ramp_buffer(10000);
        let mut grain = Grain::new();
        grain.start(&source, 1000, 2000, 1.3, 0.2, 300, 500, 0.4, 900, true, 1.0, 64);
        let mut output = vec![0.0; 2];
        while grain.is_active() {
            grain.process(&source, &mut output, 2, 0, 48000);
            let level = grain.envelope_level();
            assert!((0.0..=1.0).contains(&level));
        }
    }

    #[test]
    fn release_is_idempotent() {
        let source = ramp_buffer(10000);
        let mut once = Grain::new();
        let mut twice = Grain::new();
        for grain in [&mut once, &mut twice] {
            grain.start(&source, 0, 5000, 1.0, 0.5, 100, 100, 0.7, 1000, false, 1.0, 60);
            let mut output = vec![0.0; 2 * 500];
            grain.process(&source, &mut output, 2, 0, 44100);
        }
        once.trigger_release();
        twice.trigger_release();
        let mut output_once = vec![0.0; 2 * 200];
        let mut output_twice = vec![0.0; 2 * 200];
        once.process(&source, &mut output_once, 2, 0, 44100);
        twice.process(&source, &mut output_twice[..2 * 100], 2, 0, 44100);
        twice.trigger_release();
        twice.process(&source, &mut output_twice[2 * 100..], 2, 0, 44100);
        assert_eq!(output_once, output_twice);
        assert_eq!(once.envelope_level(), twice.envelope_level());
    }

    #[test]
    fn release_terminates_grain() {
        let source = ramp_buffer(10000);
        let mut grain = Grain::new();
        grain.start(&source, 0, 5000, 1.0, 0.5, 0, 0, 1.0, 100, false, 1.0, 60);
        let mut output = vec![0.0; 2 * 64];
        grain.process(&source, &mut output, 2, 0, 44100);
        grain.trigger_release();
        assert!(grain.is_released());
        assert_eq!(grain.envelope_stage(), GrainEnvelopeStage::TriggeredRelease);
        let mut output = vec![0.0; 2 * 256];
        grain.process(&source, &mut output, 2, 0, 44100);
        assert!(!grain.is_active() && grain.is_done());
        assert!(grain.samples_processed() <= 64 + 100);
    }
}
