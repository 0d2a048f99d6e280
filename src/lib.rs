#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod engine;
mod error;
mod grain;
mod sample;

// public, flat re-exports
pub use error::Error;

pub use sample::SampleBuffer;

pub use grain::{fit_envelope_times, Grain, GrainEnvelope, GrainEnvelopeStage};

pub use engine::{
    GrainDensityMode, GrainEngine, GrainEngineOptions, GrainInfo, GrainParameters, HeldNotes,
    SharedGrainEngine,
};

// public mods
pub mod parameter;
pub mod utils;
