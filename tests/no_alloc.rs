//! Makes sure that rendering grains does not allocate memory in the audio thread.

use std::sync::Arc;

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

use granulator::{
    GrainDensityMode, GrainEngine, GrainEngineOptions, SampleBuffer, SharedGrainEngine,
};

// -------------------------------------------------------------------------------------------------

#[global_allocator]
static A: AllocDisabler = AllocDisabler;

// -------------------------------------------------------------------------------------------------

fn noise_source(channel_count: usize) -> Arc<SampleBuffer> {
    let channels = (0..channel_count)
        .map(|channel| {
            (0..48000)
                .map(|frame| (((frame * 7919 + channel * 104729) % 2001) as f32 / 1000.0) - 1.0)
                .collect()
        })
        .collect();
    Arc::new(SampleBuffer::from_planar(channels, 48000).unwrap())
}

#[test]
fn engine_process() {
    let options = GrainEngineOptions::default()
        .max_active_grains(GrainEngineOptions::MAX_ACTIVE_GRAINS)
        .seed(7);
    let mut engine = GrainEngine::with_options(options).unwrap();
    engine.prepare(44100, 256);
    engine.set_source_buffer(Some(noise_source(2)));
    engine.set_density(100.0);
    engine.set_grain_size(500.0);
    engine.set_spray(0.5);
    engine.set_pitch_random(12.0);
    engine.set_pan_spread(1.0);
    for note in [36, 48, 60, 64, 67, 72, 84, 96] {
        engine.note_on(note, 0.8);
    }

    let mut output = vec![0.0; 256 * 2];
    for block in 0..200 {
        if block == 100 {
            engine.note_off(60);
            engine.set_reverse(true);
            engine.set_max_active_grains(GrainEngineOptions::MIN_ACTIVE_GRAINS);
        }
        output.fill(0.0);
        assert_no_alloc(|| engine.process(&mut output, 2));
    }
    assert!(engine.num_active_grains() > 0);
}

#[test]
fn shared_engine_process() {
    let options = GrainEngineOptions::default()
        .density_mode(GrainDensityMode::Shared)
        .seed(11);
    let engine = SharedGrainEngine::new(options).unwrap();
    engine.prepare(48000, 128);
    engine.set_source_buffer(Some(noise_source(1)));

    let mut output = vec![0.0; 128 * 2];
    for block in 0..300 {
        // queued events and parameter changes get applied in process
        match block {
            0 => {
                engine.note_on(60, 1.0);
                engine.note_on(67, 0.5);
            }
            50 => engine.set_density(80.0),
            100 => engine.set_position(0.75),
            150 => engine.set_volume(0.5),
            _ => (),
        }
        output.fill(0.0);
        assert_no_alloc(|| engine.process(&mut output, 2));
    }
    assert!(engine.num_active_grains() > 0);
    assert!(!engine.active_grain_info().is_empty());
}
