use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, TryLockError,
};

use crossbeam_queue::ArrayQueue;
use four_cc::FourCC;

use super::{GrainDensityMode, GrainEngine, GrainEngineOptions, GrainInfo, GrainParameters};
use crate::{
    parameter::{FloatParameter, ParameterValueUpdate},
    sample::SampleBuffer,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Messages which are passed lock-free from control threads to the audio thread.
#[derive(Debug, Clone, Copy)]
enum NoteEventMessage {
    NoteOn { note: u8, velocity: f32 },
}

// -------------------------------------------------------------------------------------------------

/// f32 value which can be shared across threads.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// -------------------------------------------------------------------------------------------------

/// Lock-free parameter storage. Values are clamped when stored and get applied to the engine
/// at the start of the next process call.
#[derive(Debug)]
struct AtomicGrainParameters {
    size: AtomicF32,
    density: AtomicF32,
    position: AtomicF32,
    pitch: AtomicF32,
    pan_spread: AtomicF32,
    attack: AtomicF32,
    decay: AtomicF32,
    sustain: AtomicF32,
    release: AtomicF32,
    reverse: AtomicBool,
    spray: AtomicF32,
    pitch_random: AtomicF32,
    volume: AtomicF32,
    max_active_grains: AtomicUsize,
    density_mode: AtomicU8,
    changed: AtomicBool,
}

impl AtomicGrainParameters {
    fn new(parameters: &GrainParameters, options: &GrainEngineOptions) -> Self {
        Self {
            size: AtomicF32::new(parameters.size()),
            density: AtomicF32::new(parameters.density()),
            position: AtomicF32::new(parameters.position()),
            pitch: AtomicF32::new(parameters.pitch()),
            pan_spread: AtomicF32::new(parameters.pan_spread()),
            attack: AtomicF32::new(parameters.attack()),
            decay: AtomicF32::new(parameters.decay()),
            sustain: AtomicF32::new(parameters.sustain()),
            release: AtomicF32::new(parameters.release()),
            reverse: AtomicBool::new(parameters.reverse()),
            spray: AtomicF32::new(parameters.spray()),
            pitch_random: AtomicF32::new(parameters.pitch_random()),
            volume: AtomicF32::new(parameters.volume()),
            max_active_grains: AtomicUsize::new(options.max_active_grains),
            density_mode: AtomicU8::new(options.density_mode as u8),
            changed: AtomicBool::new(false),
        }
    }

    fn store(&self, parameters: &GrainParameters) {
        self.size.store(parameters.size());
        self.density.store(parameters.density());
        self.position.store(parameters.position());
        self.pitch.store(parameters.pitch());
        self.pan_spread.store(parameters.pan_spread());
        self.attack.store(parameters.attack());
        self.decay.store(parameters.decay());
        self.sustain.store(parameters.sustain());
        self.release.store(parameters.release());
        self.reverse.store(parameters.reverse(), Ordering::Relaxed);
        self.spray.store(parameters.spray());
        self.pitch_random.store(parameters.pitch_random());
        self.volume.store(parameters.volume());
        self.mark_changed();
    }

    fn load(&self) -> GrainParameters {
        let mut parameters = GrainParameters::new();
        parameters.set_size(self.size.load());
        parameters.set_density(self.density.load());
        parameters.set_position(self.position.load());
        parameters.set_pitch(self.pitch.load());
        parameters.set_pan_spread(self.pan_spread.load());
        parameters.set_attack(self.attack.load());
        parameters.set_decay(self.decay.load());
        parameters.set_sustain(self.sustain.load());
        parameters.set_release(self.release.load());
        parameters.set_reverse(self.reverse.load(Ordering::Relaxed));
        parameters.set_spray(self.spray.load());
        parameters.set_pitch_random(self.pitch_random.load());
        parameters.set_volume(self.volume.load());
        parameters
    }

    fn density_mode(&self) -> GrainDensityMode {
        if self.density_mode.load(Ordering::Relaxed) == GrainDensityMode::Shared as u8 {
            GrainDensityMode::Shared
        } else {
            GrainDensityMode::PerNote
        }
    }

    fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::Acquire)
    }
}

// -------------------------------------------------------------------------------------------------

struct SharedState {
    engine: Mutex<GrainEngine>,
    note_events: ArrayQueue<NoteEventMessage>,
    parameters: AtomicGrainParameters,
    grain_info: Mutex<Vec<GrainInfo>>,
    active_grain_count: AtomicUsize,
}

// -------------------------------------------------------------------------------------------------

/// A thread-safe, cloneable handle to a [`GrainEngine`].
///
/// The audio thread calls [`Self::process`], while any number of control threads may send
/// notes, change parameters, swap the source buffer or poll the grain snapshot:
/// - Note-ons and parameter changes are lock-free. They get applied at the start of the next
///   process call.
/// - Note-offs, source changes and `prepare` briefly lock the engine.
/// - The grain snapshot is published by the audio thread without ever blocking it, so it may
///   lag behind by a block.
#[derive(Clone)]
pub struct SharedGrainEngine {
    shared: Arc<SharedState>,
}

impl SharedGrainEngine {
    /// Create a new shared engine with the given options.
    pub fn new(options: GrainEngineOptions) -> Result<Self, Error> {
        let engine = GrainEngine::with_options(options)?;
        let parameters = AtomicGrainParameters::new(engine.parameters(), &options);
        let shared = Arc::new(SharedState {
            engine: Mutex::new(engine),
            note_events: ArrayQueue::new(options.note_event_capacity),
            parameters,
            grain_info: Mutex::new(Vec::with_capacity(GrainEngine::MAX_GRAINS)),
            active_grain_count: AtomicUsize::new(0),
        });
        Ok(Self { shared })
    }

    /// Lock the engine and run the given function with it, after applying pending note
    /// events and parameter changes.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut GrainEngine) -> R) -> R {
        let mut engine = self.lock_engine();
        self.process_messages(&mut engine);
        f(&mut engine)
    }

    /// See [`GrainEngine::prepare`].
    pub fn prepare(&self, sample_rate: u32, block_size: usize) {
        self.lock_engine().prepare(sample_rate, block_size);
    }

    /// See [`GrainEngine::set_source_buffer`].
    pub fn set_source_buffer(&self, source: Option<Arc<SampleBuffer>>) {
        self.lock_engine().set_source_buffer(source);
    }

    /// Queue a note-on. Does not block, unless the note event queue is full.
    pub fn note_on(&self, note: u8, velocity: f32) {
        let message = NoteEventMessage::NoteOn { note, velocity };
        if let Err(message) = self.shared.note_events.push(message) {
            log::warn!("Note event queue is full. Applying note-on directly...");
            let mut engine = self.lock_engine();
            self.process_messages(&mut engine);
            Self::process_message(&mut engine, message);
        }
    }

    /// See [`GrainEngine::note_off`].
    pub fn note_off(&self, note: u8) {
        let mut engine = self.lock_engine();
        self.process_messages(&mut engine);
        engine.note_off(note);
    }

    /// See [`GrainEngine::all_notes_off`].
    pub fn all_notes_off(&self) {
        let mut engine = self.lock_engine();
        self.process_messages(&mut engine);
        engine.all_notes_off();
    }

    /// Apply pending events and render the next block. See [`GrainEngine::process`].
    pub fn process(&self, output: &mut [f32], channel_count: usize) {
        let mut engine = self.lock_engine();
        self.process_messages(&mut engine);
        engine.process(output, channel_count);

        self.shared
            .active_grain_count
            .store(engine.num_active_grains(), Ordering::Relaxed);
        match self.shared.grain_info.try_lock() {
            Ok(mut info) => engine.write_active_grain_info(&mut info),
            Err(TryLockError::Poisoned(err)) => {
                engine.write_active_grain_info(&mut err.into_inner());
            }
            Err(TryLockError::WouldBlock) => {
                // a reader holds the snapshot: skip publishing this block
            }
        }
    }

    /// Snapshot of all playing grains, as published by the last process call.
    pub fn active_grain_info(&self) -> Vec<GrainInfo> {
        self.shared
            .grain_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of playing grains, as published by the last process call.
    pub fn num_active_grains(&self) -> usize {
        self.shared.active_grain_count.load(Ordering::Relaxed)
    }

    /// Current parameter values, including changes which are not yet applied.
    pub fn parameters(&self) -> GrainParameters {
        self.shared.parameters.load()
    }

    /// Replace all grain parameters at once.
    pub fn set_parameters(&self, parameters: &GrainParameters) {
        self.shared.parameters.store(parameters);
    }

    /// Apply a raw or normalized parameter value update to the parameter with the given id.
    pub fn apply_parameter_update(
        &self,
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
            _ => {
                let mut parameters = self.parameters();
                parameters
                    .apply_update(id, value)
                    .map(|_| self.set_parameters(&parameters))
            }
        };
        result.inspect_err(|err| log::warn!("Failed to apply parameter update: {err}"))
    }

    pub fn set_max_active_grains(&self, max_active_grains: usize) {
        let max_active_grains = max_active_grains.clamp(
            GrainEngineOptions::MIN_ACTIVE_GRAINS,
            GrainEngineOptions::MAX_ACTIVE_GRAINS,
        );
        let parameters = &self.shared.parameters;
        parameters
            .max_active_grains
            .store(max_active_grains, Ordering::Relaxed);
        parameters.mark_changed();
    }

    pub fn set_density_mode(&self, density_mode: GrainDensityMode) {
        let parameters = &self.shared.parameters;
        parameters
            .density_mode
            .store(density_mode as u8, Ordering::Relaxed);
        parameters.mark_changed();
    }

    pub fn set_grain_size(&self, size_ms: f32) {
        self.store_float(&self.shared.parameters.size, &GrainParameters::SIZE, size_ms);
    }

    pub fn set_density(&self, grains_per_second: f32) {
        let density = &self.shared.parameters.density;
        self.store_float(density, &GrainParameters::DENSITY, grains_per_second);
    }

    pub fn set_position(&self, position: f32) {
        let value = &self.shared.parameters.position;
        self.store_float(value, &GrainParameters::POSITION, position);
    }

    pub fn set_pitch(&self, semitones: f32) {
        self.store_float(&self.shared.parameters.pitch, &GrainParameters::PITCH, semitones);
    }

    pub fn set_pan_spread(&self, spread: f32) {
        let value = &self.shared.parameters.pan_spread;
        self.store_float(value, &GrainParameters::PAN_SPREAD, spread);
    }

    pub fn set_attack(&self, attack_ms: f32) {
        let value = &self.shared.parameters.attack;
        self.store_float(value, &GrainParameters::ATTACK, attack_ms);
    }

    pub fn set_decay(&self, decay_ms: f32) {
        self.store_float(&self.shared.parameters.decay, &GrainParameters::DECAY, decay_ms);
    }

    pub fn set_sustain(&self, sustain: f32) {
        let value = &self.shared.parameters.sustain;
        self.store_float(value, &GrainParameters::SUSTAIN, sustain);
    }

    pub fn set_release(&self, release_ms: f32) {
        let value = &self.shared.parameters.release;
        self.store_float(value, &GrainParameters::RELEASE, release_ms);
    }

    pub fn set_reverse(&self, reverse: bool) {
        let parameters = &self.shared.parameters;
        parameters.reverse.store(reverse, Ordering::Relaxed);
        parameters.mark_changed();
    }

    pub fn set_spray(&self, spray: f32) {
        self.store_float(&self.shared.parameters.spray, &GrainParameters::SPRAY, spray);
    }

    pub fn set_pitch_random(&self, semitones: f32) {
        let value = &self.shared.parameters.pitch_random;
        self.store_float(value, &GrainParameters::PITCH_RANDOM, semitones);
    }

    pub fn set_volume(&self, volume: f32) {
        self.store_float(&self.shared.parameters.volume, &GrainParameters::VOLUME, volume);
    }

    fn store_float(&self, value: &AtomicF32, descriptor: &FloatParameter, new_value: f32) {
        value.store(descriptor.clamp_value(new_value));
        self.shared.parameters.mark_changed();
    }

    fn lock_engine(&self) -> MutexGuard<'_, GrainEngine> {
        self.shared
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply pending parameter changes and note events to the locked engine.
    fn process_messages(&self, engine: &mut GrainEngine) {
        let parameters = &self.shared.parameters;
        if parameters.take_changed() {
            engine.set_parameters(parameters.load());
            engine.set_max_active_grains(parameters.max_active_grains.load(Ordering::Relaxed));
            engine.set_density_mode(parameters.density_mode());
        }
        while let Some(message) = self.shared.note_events.pop() {
            Self::process_message(engine, message);
        }
    }

    fn process_message(engine: &mut GrainEngine, message: NoteEventMessage) {
        match message {
            NoteEventMessage::NoteOn { note, velocity } => engine.note_on(note, velocity),
        }
    }
}

// -------------------------------------------------------------------------------------------------
