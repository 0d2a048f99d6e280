use crate::grain::Grain;

// -------------------------------------------------------------------------------------------------

/// Read-only visualization record of a single playing grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainInfo {
    /// Current read position in the source, normalized to \[0, 1\].
    pub position: f32,
    /// Playback progress of the grain in \[0, 1\].
    pub progress: f32,
    /// Current, shaped envelope level in \[0, 1\].
    pub envelope: f32,
    /// Start of the grain window in the source, normalized to \[0, 1\].
    pub window_start: f32,
    /// End of the grain window in the source, normalized to \[0, 1\].
    pub window_end: f32,
    /// MIDI note which spawned the grain.
    pub note: u8,
    pub active: bool,
}

impl From<&Grain> for GrainInfo {
    fn from(grain: &Grain) -> Self {
        let (window_start, window_end) = if grain.source_length() > 0 {
            let source_length = grain.source_length() as f32;
            (
                (grain.start_offset() as f32 / source_length).min(1.0),
                ((grain.start_offset() + grain.length()) as f32 / source_length).min(1.0),
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            position: grain.current_position(),
            progress: grain.progress(),
            envelope: grain.envelope_level(),
            window_start,
            window_end,
            note: grain.note(),
            active: grain.is_active(),
        }
    }
}
