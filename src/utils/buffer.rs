// -------------------------------------------------------------------------------------------------

/// Apply the given volume factor to all samples in the buffer.
pub fn scale_buffer(buffer: &mut [f32], volume: f32) {
    if volume == 1.0 {
        // nothing to do
    } else if volume <= 0.0 {
        clear_buffer(buffer);
    } else {
        for sample in buffer.iter_mut() {
            *sample *= volume;
        }
    }
}

/// Fill the given buffer with zeros.
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

// -------------------------------------------------------------------------------------------------

/// Copy the given interleaved buffer into a planar one.
/// The planar buffer's layout defines layout of the interleaved buffer (channel and frame count).
pub fn interleaved_to_planar(interleaved: &[f32], planar: &mut [Vec<f32>]) {
    let channel_count = planar.len();
    match channel_count {
        1 => {
            for (p, i) in planar[0].iter_mut().zip(interleaved) {
                *p = *i;
            }
        }
        2 => {
            let left = &mut planar[0];
            for (index, l) in left.iter_mut().enumerate() {
                *l = interleaved[index * 2];
            }
            let right = &mut planar[1];
            for (index, r) in right.iter_mut().enumerate() {
                *r = interleaved[index * 2 + 1];
            }
        }
        _ => {
            for (channel_index, channel_values) in planar.iter_mut().enumerate() {
                for (frame_index, value) in channel_values.iter_mut().enumerate() {
                    *value = interleaved[frame_index * channel_count + channel_index];
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Frame based access to interleaved audio buffers.
pub trait InterleavedBufferMut {
    /// Iterate over complete frames of `channel_count` interleaved samples.
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32>;
}

impl InterleavedBufferMut for [f32] {
    #[inline]
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32> {
        debug_assert!(channel_count > 0, "Need at least one channel");
        self.chunks_exact_mut(channel_count)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling() {
        let mut buffer = vec![1.0, -1.0, 0.5, -0.5];
        scale_buffer(&mut buffer, 1.0);
        assert_eq!(buffer, vec![1.0, -1.0, 0.5, -0.5]);
        scale_buffer(&mut buffer, 0.5);
        assert_eq!(buffer, vec![0.5, -0.5, 0.25, -0.25]);
        // tiny gains scale, they don't mute
        scale_buffer(&mut buffer, 0.0001);
        assert_eq!(buffer, vec![0.5 * 0.0001, -0.5 * 0.0001, 0.25 * 0.0001, -0.25 * 0.0001]);
        let mut buffer = vec![1.0, -1.0];
        scale_buffer(&mut buffer, 0.99999);
        assert_eq!(buffer, vec![0.99999, -0.99999]);
        scale_buffer(&mut buffer, 0.0);
        assert_eq!(buffer, vec![0.0; 2]);
    }

    #[test]
    fn interleaved_planar() {
        let interleaved_stereo = vec![1.0, 4.0, 2.0, 3.0, 3.0, 2.0, 4.0, 1.0];
        let mut planar_stereo = vec![vec![0.0; 4], vec![0.0; 4]];
        interleaved_to_planar(&interleaved_stereo, &mut planar_stereo);
        assert_eq!(
            planar_stereo,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 3.0, 2.0, 1.0]]
        );

        let interleaved_general = vec![1.0, 4.0, 2.0, 2.0, 3.0, 1.0];
        let mut planar_general = vec![vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]];
        interleaved_to_planar(&interleaved_general, &mut planar_general);
        assert_eq!(
            planar_general,
            vec![vec![1.0, 2.0], vec![4.0, 3.0], vec![2.0, 1.0]]
        );
    }

    #[test]
    fn frames() {
        let mut buffer = vec![0.0; 6];
        for (index, frame) in buffer.frames_mut(2).enumerate() {
            frame[0] = index as f32;
            frame[1] = -(index as f32);
        }
        assert_eq!(buffer, vec![0.0, -0.0, 1.0, -1.0, 2.0, -2.0]);
    }
}
