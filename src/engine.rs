//! The grain engine: a fixed grain pool, note tracking, stochastic grain scheduling and mixing.

use std::sync::Arc;

use four_cc::FourCC;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    grain::{fit_envelope_times, Grain},
    parameter::{IntoBoxedParameter, Parameter, ParameterValueUpdate},
    sample::SampleBuffer,
    utils::{buffer::scale_buffer, pitch_ratio_from_semitones},
    Error,
};

// -------------------------------------------------------------------------------------------------

mod info;
mod notes;
mod options;
mod parameters;
mod shared;

pub use info::GrainInfo;
pub use notes::HeldNotes;
pub use options::{GrainDensityMode, GrainEngineOptions};
pub use parameters::GrainParameters;
pub use shared::SharedGrainEngine;

// -------------------------------------------------------------------------------------------------

/// Polyphonic granular synthesizer.
///
/// While notes are held, the engine spawns grains from the current source buffer at the
/// configured density, picking one of the held notes at random for each new grain. Grains are
/// transposed relative to [`Self::ROOT_NOTE`] and mixed into the output buffer.
///
/// All grains are preallocated: `process`, `note_on`, `note_off` and `all_notes_off` never
/// allocate. See [`SharedGrainEngine`] to drive an engine from multiple threads.
pub struct GrainEngine {
    /// Pool of reusable grain instances.
    grains: Box<[Grain]>,
    /// Output frame offsets of grains which got spawned in the current process cycle.
    grain_start_frames: Box<[usize]>,
    /// Indices of currently active grains.
    active_grain_indices: Vec<usize>,
    /// Number of pool slots which may be spawned into or stolen from.
    max_active_grains: usize,
    density_mode: GrainDensityMode,
    notes: HeldNotes,
    parameters: GrainParameters,
    /// Output frames until the next grain gets spawned.
    samples_until_next_grain: f64,
    source: Option<Arc<SampleBuffer>>,
    sample_rate: u32,
    block_size: usize,
    spawned_grain_count: u64,
    rng: SmallRng,
}

impl Default for GrainEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainEngine {
    /// MIDI note which plays grains untransposed.
    pub const ROOT_NOTE: u8 = 60;
    /// Size of the preallocated grain pool.
    pub const MAX_GRAINS: usize = GrainEngineOptions::MAX_ACTIVE_GRAINS;

    const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Create a new engine with default options.
    pub fn new() -> Self {
        Self::with_valid_options(GrainEngineOptions::default())
    }

    /// Create a new engine with the given options.
    pub fn with_options(options: GrainEngineOptions) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self::with_valid_options(options))
    }

    fn with_valid_options(options: GrainEngineOptions) -> Self {
        let grains = vec![Grain::new(); Self::MAX_GRAINS].into_boxed_slice();
        let grain_start_frames = vec![0; Self::MAX_GRAINS].into_boxed_slice();
        let active_grain_indices = Vec::with_capacity(Self::MAX_GRAINS);
        let rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            grains,
            grain_start_frames,
            active_grain_indices,
            max_active_grains: options.max_active_grains,
            density_mode: options.density_mode,
            notes: HeldNotes::new(),
            parameters: GrainParameters::default(),
            samples_until_next_grain: 0.0,
            source: None,
            sample_rate: Self::DEFAULT_SAMPLE_RATE,
            block_size: 0,
            spawned_grain_count: 0,
            rng,
        }
    }

    /// Set output sample rate and the maximum expected block size and reset the grain
    /// scheduler. Must be called before processing.
    pub fn prepare(&mut self, sample_rate: u32, block_size: usize) {
        log::debug!("Preparing grain engine: {sample_rate} Hz, {block_size} frames");
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.samples_until_next_grain = 0.0;
    }

    /// Output sample rate, as set in [`Self::prepare`].
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Maximum expected block size, as set in [`Self::prepare`].
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Currently used source buffer.
    pub fn source_buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.source.as_ref()
    }

    /// Replace the source buffer. Playing grains continue playing with the new buffer.
    /// Setting the current buffer again does nothing.
    pub fn set_source_buffer(&mut self, source: Option<Arc<SampleBuffer>>) {
        let unchanged = match (&self.source, &source) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        match &source {
            Some(source) => log::info!(
                "Setting grain source: {} channels, {} frames at {} Hz",
                source.channel_count(),
                source.frame_count(),
                source.sample_rate()
            ),
            None => log::info!("Removing grain source"),
        }
        self.source = source;
    }

    /// Currently held notes.
    pub fn held_notes(&self) -> &HeldNotes {
        &self.notes
    }

    /// Start holding the given MIDI note with the given velocity in range \[0, 1\].
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        if note as usize >= notes::NOTE_COUNT {
            log::warn!("Ignoring note-on for invalid MIDI note {note}");
            return;
        }
        let velocity = if velocity.is_nan() {
            0.0
        } else {
            velocity.clamp(0.0, 1.0)
        };
        self.notes.insert(note, velocity);
    }

    /// Stop holding the given MIDI note and release all grains which got spawned by it.
    pub fn note_off(&mut self, note: u8) {
        self.notes.remove(note);
        for &index in &self.active_grain_indices {
            let grain = &mut self.grains[index];
            if grain.is_active() && grain.note() == note {
                grain.trigger_release();
            }
        }
    }

    /// Stop holding all notes and release all playing grains.
    pub fn all_notes_off(&mut self) {
        self.notes.clear();
        for &index in &self.active_grain_indices {
            self.grains[index].trigger_release();
        }
    }

    /// Number of pool slots which may be used for playback.
    pub fn max_active_grains(&self) -> usize {
        self.max_active_grains
    }

    /// Set the number of pool slots which may be used for playback. Clamped to range
    /// \[64, 2048\]. Grains which play beyond the new limit fade out naturally.
    pub fn set_max_active_grains(&mut self, max_active_grains: usize) {
        let max_active_grains = max_active_grains.clamp(
            GrainEngineOptions::MIN_ACTIVE_GRAINS,
            GrainEngineOptions::MAX_ACTIVE_GRAINS,
        );
        if max_active_grains != self.max_active_grains {
            log::debug!("Setting max active grains to {max_active_grains}");
            self.max_active_grains = max_active_grains;
        }
    }

    /// How the grain density gets applied to multiple held notes.
    pub fn density_mode(&self) -> GrainDensityMode {
        self.density_mode
    }

    pub fn set_density_mode(&mut self, density_mode: GrainDensityMode) {
        self.density_mode = density_mode;
    }

    /// Current grain parameters.
    pub fn parameters(&self) -> &GrainParameters {
        &self.parameters
    }

    /// Replace all grain parameters at once.
    pub fn set_parameters(&mut self, parameters: GrainParameters) {
        self.parameters = parameters;
    }

    pub fn set_grain_size(&mut self, size_ms: f32) {
        self.parameters.set_size(size_ms);
    }

    pub fn set_density(&mut self, grains_per_second: f32) {
        self.parameters.set_density(grains_per_second);
    }

    pub fn set_position(&mut self, position: f32) {
        self.parameters.set_position(position);
    }

    pub fn set_pitch(&mut self, semitones: f32) {
        self.parameters.set_pitch(semitones);
    }

    pub fn set_pan_spread(&mut self, spread: f32) {
        self.parameters.set_pan_spread(spread);
    }

    pub fn set_attack(&mut self, attack_ms: f32) {
        self.parameters.set_attack(attack_ms);
    }

    pub fn set_decay(&mut self, decay_ms: f32) {
        self.parameters.set_decay(decay_ms);
    }

    pub fn set_sustain(&mut self, sustain: f32) {
        self.parameters.set_sustain(sustain);
    }

    pub fn set_release(&mut self, release_ms: f32) {
        self.parameters.set_release(release_ms);
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.parameters.set_reverse(reverse);
    }

    pub fn set_spray(&mut self, spray: f32) {
        self.parameters.set_spray(spray);
    }

    pub fn set_pitch_random(&mut self, semitones: f32) {
        self.parameters.set_pitch_random(semitones);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.parameters.set_volume(volume);
    }

    /// Descriptors of all engine parameters: the grain parameters, max active grains and
    /// density mode.
    pub fn parameter_descriptors() -> Vec<Box<dyn Parameter>> {
        let mut descriptors = GrainParameters::descriptors();
        descriptors.push(GrainEngineOptions::MAX_ACTIVE_GRAINS_PARAMETER.into_box());
        descriptors.push(GrainEngineOptions::DENSITY_MODE_PARAMETER.into_box());
        descriptors
    }

    /// Apply a raw or normalized parameter value update to the parameter with the given id.
    pub fn apply_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        let result = match id {
            _ if id == GrainEngineOptions::MAX_ACTIVE_GRAINS_PARAMETER.id() => {
                GrainEngineOptions::MAX_ACTIVE_GRAINS_PARAMETER
                    .update_value(value)
                    .map(|max_grains| self.set_max_active_grains(max_grains as usize))
            }
            _ if id == GrainEngineOptions::DENSITY_MODE_PARAMETER.id() => {
                GrainEngineOptions::DENSITY_MODE_PARAMETER
                    .update_value(value)
                    .map(|mode| self.set_density_mode(mode))
            }
            _ => self.parameters.apply_update(id, value),
        };
        result.inspect_err(|err| log::warn!("Failed to apply parameter update: {err}"))
    }

    /// Number of grains which got spawned since the engine got created.
    pub fn spawned_grain_count(&self) -> u64 {
        self.spawned_grain_count
    }

    /// Number of currently playing grains.
    pub fn num_active_grains(&self) -> usize {
        self.active_grain_indices.len()
    }

    /// Access to the whole grain pool.
    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    /// Create a snapshot of all playing grains.
    pub fn active_grain_info(&self) -> Vec<GrainInfo> {
        let mut info = Vec::with_capacity(self.active_grain_indices.len());
        self.write_active_grain_info(&mut info);
        info
    }

    /// Write a snapshot of all playing grains into the given vector, replacing its content.
    /// Does not allocate when the vector has enough capacity.
    pub fn write_active_grain_info(&self, info: &mut Vec<GrainInfo>) {
        info.clear();
        info.extend(
            self.active_grain_indices
                .iter()
                .map(|&index| GrainInfo::from(&self.grains[index])),
        );
    }

    /// Spawn grains for held notes and mix all playing grains into the given interleaved
    /// output buffer. The buffer is added to, so clear it first when needed. The master
    /// volume gets applied to the whole buffer.
    ///
    /// Mono outputs get a mono downmix of the grains, outputs with more than two channels only
    /// get the first two channels written.
    pub fn process(&mut self, output: &mut [f32], channel_count: usize) {
        if channel_count == 0 || self.sample_rate == 0 {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };
        if source.is_empty() {
            return;
        }
        let frame_count = output.len() / channel_count;

        // Spawn new grains
        if !self.notes.is_empty() {
            let density = self
                .density_mode
                .effective_density(self.parameters.density(), self.notes.len());
            if density > 0.0 {
                let samples_per_grain = self.sample_rate as f64 / density as f64;
                for frame in 0..frame_count {
                    // spawn before counting down: grains are exactly `samples_per_grain` apart
                    while self.samples_until_next_grain <= 0.0 {
                        let note_index = self.rng.random_range(0..self.notes.len());
                        if let Some((note, velocity)) = self.notes.nth(note_index) {
                            self.spawn_grain_at_frame(&source, note, velocity, frame);
                        }
                        self.samples_until_next_grain += samples_per_grain;
                    }
                    self.samples_until_next_grain -= 1.0;
                }
            }
        }

        // Render all active grains
        for &index in &self.active_grain_indices {
            let start_frame = self.grain_start_frames[index];
            self.grains[index].process(
                &source,
                output,
                channel_count,
                start_frame,
                self.sample_rate,
            );
            self.grain_start_frames[index] = 0;
        }

        // Cleanup grains from the list which finished playback
        self.active_grain_indices
            .retain(|&index| self.grains[index].is_active());

        // Apply master volume
        scale_buffer(output, self.parameters.volume());
    }

    /// Spawn a new grain for the given note with the current parameters. Returns the pool
    /// index of the new grain, or None when there is no source to play.
    pub fn spawn_grain(&mut self, note: u8, velocity: f32) -> Option<usize> {
        let source = self.source.clone()?;
        self.spawn_grain_at_frame(&source, note, velocity, 0)
    }

    fn spawn_grain_at_frame(
        &mut self,
        source: &SampleBuffer,
        note: u8,
        velocity: f32,
        frame: usize,
    ) -> Option<usize> {
        let source_length = source.frame_count();
        if source_length == 0 {
            return None;
        }
        let index = self.inactive_grain()?;
        let source_rate = source.sample_rate() as f64;
        let params = &self.parameters;

        let length =
            ((params.size() as f64 / 1000.0 * source_rate) as usize).clamp(1, source_length);

        let mut position = params.position();
        if params.spray() > 0.0 {
            let spray = (self.rng.random::<f32>() * 2.0 - 1.0) * params.spray();
            position = (position + spray).clamp(0.0, 1.0);
        }
        let max_start_offset = source_length - length;
        let start_offset =
            ((position as f64 * max_start_offset as f64) as usize).min(max_start_offset);

        let mut semitones = note as f32 - Self::ROOT_NOTE as f32 + params.pitch();
        if params.pitch_random() > 0.0 {
            semitones += (self.rng.random::<f32>() * 2.0 - 1.0) * params.pitch_random();
        }
        let pitch_ratio = pitch_ratio_from_semitones(semitones) as f64;

        let pan = if params.pan_spread() > 0.0 {
            0.5 + (self.rng.random::<f32>() - 0.5) * params.pan_spread()
        } else {
            0.5
        };

        let ms_to_samples = |ms: f32| (ms as f64 / 1000.0 * source_rate) as usize;
        let (attack, decay, release) = fit_envelope_times(
            ms_to_samples(params.attack()),
            ms_to_samples(params.decay()),
            ms_to_samples(params.release()),
            length,
        );

        let grain = &mut self.grains[index];
        let recycled = grain.is_active();
        grain.start(
            source,
            start_offset,
            length,
            pitch_ratio,
            pan,
            attack,
            decay,
            params.sustain(),
            release,
            params.reverse(),
            velocity,
            note,
        );
        if !recycled {
            self.active_grain_indices.push(index);
        }
        self.grain_start_frames[index] = frame;
        self.spawned_grain_count += 1;
        Some(index)
    }

    /// Find a free grain slot within the first `max_active_grains` slots. When all are busy,
    /// steal the grain which is closest to its end.
    fn inactive_grain(&self) -> Option<usize> {
        let grains = &self.grains[..self.max_active_grains.min(self.grains.len())];
        if let Some(index) = grains.iter().position(|grain| !grain.is_active()) {
            return Some(index);
        }
        let mut stolen = None;
        let mut max_progress = f32::MIN;
        for (index, grain) in grains.iter().enumerate() {
            let progress = grain.progress();
            if progress > max_progress {
                max_progress = progress;
                stolen = Some(index);
            }
        }
        stolen
    }
}

// -------------------------------------------------------------------------------------------------
