/// Number of addressable MIDI notes.
pub const NOTE_COUNT: usize = 128;

// -------------------------------------------------------------------------------------------------

/// Ordered, fixed-size table of currently held MIDI notes and their velocities.
///
/// Inserting, removing and picking notes never allocates, so the table can be used in the
/// audio thread.
#[derive(Debug, Clone)]
pub struct HeldNotes {
    velocities: [Option<f32>; NOTE_COUNT],
    count: usize,
}

impl Default for HeldNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl HeldNotes {
    pub const fn new() -> Self {
        Self {
            velocities: [None; NOTE_COUNT],
            count: 0,
        }
    }

    /// Number of held notes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Velocity of the given note, when it is held.
    pub fn get(&self, note: u8) -> Option<f32> {
        self.velocities.get(note as usize).copied().flatten()
    }

    /// Insert or update a note. Notes > 127 are ignored.
    pub fn insert(&mut self, note: u8, velocity: f32) {
        if let Some(entry) = self.velocities.get_mut(note as usize) {
            if entry.is_none() {
                self.count += 1;
            }
            *entry = Some(velocity);
        }
    }

    /// Remove a note and return its velocity, when it was held.
    pub fn remove(&mut self, note: u8) -> Option<f32> {
        let velocity = self.velocities.get_mut(note as usize)?.take();
        if velocity.is_some() {
            self.count -= 1;
        }
        velocity
    }

    /// Remove all notes.
    pub fn clear(&mut self) {
        self.velocities = [None; NOTE_COUNT];
        self.count = 0;
    }

    /// Iterate over all held notes and velocities in ascending note order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f32)> + '_ {
        self.velocities
            .iter()
            .enumerate()
            .filter_map(|(note, velocity)| velocity.map(|velocity| (note as u8, velocity)))
    }

    /// The held note at the given index in ascending note order.
    pub fn nth(&self, index: usize) -> Option<(u8, f32)> {
        self.iter().nth(index)
    }
}

// -------------------------------------------------------------------------------------------------
