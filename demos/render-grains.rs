//! Renders a grain cloud from an audio file into a wav file.

use std::{io, path::PathBuf, sync::Arc};

use arg::{parse_args, Args};
use hound::{SampleFormat, WavSpec, WavWriter};

use granulator::{Error, GrainEngine, GrainEngineOptions, SampleBuffer};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const SAMPLE_RATE: u32 = 48000;
const CHANNEL_COUNT: usize = 2;
const BLOCK_SIZE: usize = 512;

// Grain parameters (tweak as needed!)
const GRAIN_SIZE: f32 = 120.0; // 10ms - 30s
const GRAIN_DENSITY: f32 = 25.0; // 1hz - 100hz
const GRAIN_SPRAY: f32 = 0.15; // 0.0 = no randomness, 1.0 = full random
const GRAIN_PAN_SPREAD: f32 = 0.8; // 0.0 = center, 1.0 = full left/right
const GRAIN_PITCH_RANDOM: f32 = 0.1; // semitones
const GRAIN_ATTACK: f32 = 30.0; // ms
const GRAIN_RELEASE: f32 = 60.0; // ms

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "i", long = "input")]
    /// Audio file to granulate.
    input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Wav file to write the grain cloud into. By default \"grains.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "d", long = "duration")]
    /// Duration of the rendered file in seconds. By default 8.
    duration: Option<f32>,
    #[arg(short = "p", long = "position")]
    /// Normalized grain position in the source, in range [0, 1]. By default 0.5.
    position: Option<f32>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .with_module_level("symphonia_core", log::LevelFilter::Warn)
        .with_module_level("symphonia_format", log::LevelFilter::Warn)
        .init()
        .expect("Failed to set logger");

    let Some(input_path) = args.input_path else {
        return Err(Error::ParameterError(
            "missing input file. Pass an audio file path via '--input'".to_string(),
        ));
    };
    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from("grains.wav"));
    let duration = args.duration.unwrap_or(8.0).max(0.0);

    // Load the source and setup the engine
    let source = Arc::new(SampleBuffer::from_file(&input_path)?);
    log::info!(
        "Loaded '{}': {} channels, {} Hz, {:.2}s",
        input_path.display(),
        source.channel_count(),
        source.sample_rate(),
        source.duration().as_secs_f32()
    );

    let mut engine = GrainEngine::with_options(GrainEngineOptions::default().seed(0x5eed))?;
    engine.prepare(SAMPLE_RATE, BLOCK_SIZE);
    engine.set_source_buffer(Some(source));

    engine.set_grain_size(GRAIN_SIZE);
    engine.set_density(GRAIN_DENSITY);
    engine.set_position(args.position.unwrap_or(0.5));
    engine.set_spray(GRAIN_SPRAY);
    engine.set_pan_spread(GRAIN_PAN_SPREAD);
    engine.set_pitch_random(GRAIN_PITCH_RANDOM);
    engine.set_attack(GRAIN_ATTACK);
    engine.set_release(GRAIN_RELEASE);
    engine.set_volume(0.5);

    // Create the wav writer
    let spec = WavSpec {
        channels: CHANNEL_COUNT as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&output_path, spec).map_err(io::Error::other)?;

    // Play a chord, then a single note and let the cloud fade out
    let total_frames = (duration * SAMPLE_RATE as f32) as usize;
    let chord_off_frame = total_frames / 2;
    let note_off_frame = total_frames * 3 / 4;

    for note in [48, 55, 60, 64] {
        engine.note_on(note, 0.8);
    }

    let mut output = vec![0.0; BLOCK_SIZE * CHANNEL_COUNT];
    let mut frame = 0;
    while frame < total_frames {
        if frame <= chord_off_frame && chord_off_frame < frame + BLOCK_SIZE {
            for note in [48, 55, 64] {
                engine.note_off(note);
            }
            engine.set_position(0.25);
            engine.set_reverse(true);
        }
        if frame <= note_off_frame && note_off_frame < frame + BLOCK_SIZE {
            engine.all_notes_off();
        }

        let frames = BLOCK_SIZE.min(total_frames - frame);
        let block = &mut output[..frames * CHANNEL_COUNT];
        block.fill(0.0);
        engine.process(block, CHANNEL_COUNT);
        for sample in block.iter() {
            writer.write_sample(*sample).map_err(io::Error::other)?;
        }
        frame += frames;
    }

    writer.finalize().map_err(io::Error::other)?;
    log::info!(
        "Rendered {} grains into '{}'",
        engine.spawned_grain_count(),
        output_path.display()
    );
    Ok(())
}
