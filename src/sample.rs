//! Decoded, shared source sample buffers for the grain engine.

use std::{path::Path, time::Duration};

use crate::{utils::buffer::interleaved_to_planar, Error};

// -------------------------------------------------------------------------------------------------

mod decoder;
use decoder::AudioDecoder;

// -------------------------------------------------------------------------------------------------

/// A decoded, planar multichannel sample buffer with its sample rate.
///
/// Buffers are immutable once created. The engine holds them via `Arc<SampleBuffer>` and only
/// ever reads from them, so the owner can swap them at any time.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    channels: Vec<Box<[f32]>>,
    frame_count: usize,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a new buffer from planar channel data.
    ///
    /// All channels must have the same length. A buffer with zero frames is valid, but will
    /// produce silence only.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, Error> {
        if channels.is_empty() {
            return Err(Error::ParameterError(
                "Sample buffers need at least one channel".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Sample buffer sample rate must be > 0".to_string(),
            ));
        }
        let frame_count = channels[0].len();
        if channels.iter().any(|channel| channel.len() != frame_count) {
            return Err(Error::ParameterError(
                "Sample buffer channels must have the same length".to_string(),
            ));
        }
        let channels = channels
            .into_iter()
            .map(|channel| channel.into_boxed_slice())
            .collect();
        Ok(Self {
            channels,
            frame_count,
            sample_rate,
        })
    }

    /// Create a new buffer from interleaved sample data.
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ParameterError(
                "Sample buffers need at least one channel".to_string(),
            ));
        }
        if samples.len() % channel_count != 0 {
            return Err(Error::ParameterError(format!(
                "Interleaved buffer length {} is not a multiple of the channel count {}",
                samples.len(),
                channel_count
            )));
        }
        let frame_count = samples.len() / channel_count;
        let mut planar = vec![vec![0.0; frame_count]; channel_count];
        interleaved_to_planar(samples, &mut planar);
        Self::from_planar(planar, sample_rate)
    }

    /// Decode the given audio file into a new buffer.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        log::debug!("Decoding sample file '{}'...", path.display());
        Self::from_decoder(AudioDecoder::from_file(path)?)
    }

    /// Decode the given raw, encoded audio file buffer into a new buffer.
    pub fn from_file_buffer(file_buffer: Vec<u8>) -> Result<Self, Error> {
        Self::from_decoder(AudioDecoder::from_buffer(file_buffer)?)
    }

    fn from_decoder(mut decoder: AudioDecoder) -> Result<Self, Error> {
        let (samples, channel_count, sample_rate) = decoder.decode_all()?;
        let buffer = Self::from_interleaved(&samples, channel_count, sample_rate)?;
        log::debug!(
            "Decoded {} frames with {} channels at {} Hz",
            buffer.frame_count,
            channel_count,
            sample_rate
        );
        Ok(buffer)
    }

    /// Number of channels in the buffer. Always > 0.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames in each channel.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// True when the buffer has no sample frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// The buffer's sample rate.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of the buffer at its own sample rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count as f64 / self.sample_rate as f64)
    }

    /// Access samples of the given channel.
    ///
    /// Panics when the channel index is out of bounds.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar() -> Result<(), Error> {
        let buffer = SampleBuffer::from_planar(vec![vec![0.0, 1.0], vec![2.0, 3.0]], 48000)?;
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.channel(1), &[2.0, 3.0]);
        assert!(!buffer.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_layouts() {
        assert!(SampleBuffer::from_planar(vec![], 44100).is_err());
        assert!(SampleBuffer::from_planar(vec![vec![0.0]], 0).is_err());
        assert!(SampleBuffer::from_planar(vec![vec![0.0], vec![0.0, 1.0]], 44100).is_err());
        assert!(SampleBuffer::from_interleaved(&[0.0, 1.0, 2.0], 2, 44100).is_err());
        assert!(SampleBuffer::from_interleaved(&[0.0], 0, 44100).is_err());
    }

    #[test]
    fn interleaved() -> Result<(), Error> {
        let buffer = SampleBuffer::from_interleaved(&[1.0, -1.0, 2.0, -2.0], 2, 22050)?;
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0), &[1.0, 2.0]);
        assert_eq!(buffer.channel(1), &[-1.0, -2.0]);
        assert_eq!(buffer.duration(), Duration::from_secs_f64(2.0 / 22050.0));
        Ok(())
    }

    #[test]
    fn decode_wav() -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 32000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for frame in 0..1000 {
                writer.write_sample(if frame % 2 == 0 { 16384i16 } else { -16384i16 })?;
                writer.write_sample(0i16)?;
            }
            writer.finalize()?;
        }
        let buffer = SampleBuffer::from_file_buffer(cursor.into_inner())?;
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.sample_rate(), 32000);
        assert_eq!(buffer.frame_count(), 1000);
        assert!((buffer.channel(0)[0] - 0.5).abs() < 0.001);
        assert!((buffer.channel(0)[1] + 0.5).abs() < 0.001);
        assert!(buffer.channel(1).iter().all(|s| *s == 0.0));
        Ok(())
    }

    #[test]
    fn decode_missing_file() {
        assert!(matches!(
            SampleBuffer::from_file("this/file/does/not/exist.wav"),
            Err(Error::MediaFileNotFound)
        ));
    }
}
