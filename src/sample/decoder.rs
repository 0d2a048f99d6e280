use std::{fs::File, io, path::Path};

use symphonia::core::{
    audio::{SampleBuffer as DecodeBuffer, SignalSpec},
    codecs::{Decoder, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Decodes a whole audio file into interleaved f32 samples via Symphonia.
pub(crate) struct AudioDecoder {
    track_id: u32, // Internal track index.
    decoder: Box<dyn Decoder>,
    format: Box<dyn FormatReader>,
}

impl AudioDecoder {
    /// Create a new decoder from the given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = Box::new(File::open(path)?);
        let source_stream = MediaSourceStream::new(file, Default::default());
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }
        Self::from_source_stream(source_stream, hint)
    }

    /// Create a new decoder from the given encoded file buffer.
    pub fn from_buffer(buffer: Vec<u8>) -> Result<Self, Error> {
        let cursor = Box::new(io::Cursor::new(buffer));
        let source_stream = MediaSourceStream::new(cursor, Default::default());
        Self::from_source_stream(source_stream, Hint::new())
    }

    /// Create a new decoder from the given Symphonia MediaSourceStream. The file extension
    /// hint, if any, helps the format registry to pick a format reader.
    fn from_source_stream(source_stream: MediaSourceStream, hint: Hint) -> Result<Self, Error> {
        // Use the default options when reading and decoding.
        let format_opts: FormatOptions = Default::default();
        let metadata_opts: MetadataOptions = Default::default();
        let decoder_opts: DecoderOptions = Default::default();

        // Probe the media source stream for a format.
        let probed = symphonia::default::get_probe()
            .format(&hint, source_stream, &format_opts, &metadata_opts)
            .map_err(|_| Error::MediaFileProbeError)?;

        // Get the format reader yielded by the probe operation.
        let format = probed.format;

        // Get the default track.
        let track = format.default_track().ok_or(Error::MediaFileProbeError)?;
        let track_id = track.id;

        // Create a decoder for the track.
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|err| Error::AudioDecodingError(Box::new(err)))?;

        Ok(Self {
            track_id,
            decoder,
            format,
        })
    }

    /// Decode all remaining packets. Returns interleaved samples, channel count and sample rate.
    pub fn decode_all(&mut self) -> Result<(Vec<f32>, usize, u32), Error> {
        let mut samples = Vec::new();
        let mut buffer = None;
        let mut buffer_capacity = 0;
        let mut signal_spec = None;
        while let Some(spec) = self.read_packet(&mut buffer, &mut buffer_capacity) {
            if let Some(buffer) = &buffer {
                samples.extend_from_slice(buffer.samples());
            }
            signal_spec = Some(spec);
        }
        let spec = match signal_spec {
            Some(spec) => spec,
            None => self.codec_signal_spec()?,
        };
        Ok((samples, spec.channels.count(), spec.rate))
    }

    /// Signal spec from the codec parameters, used when a file has no packets at all.
    fn codec_signal_spec(&self) -> Result<SignalSpec, Error> {
        let params = self.decoder.codec_params();
        match (params.sample_rate, params.channels) {
            (Some(rate), Some(channels)) => Ok(SignalSpec { rate, channels }),
            _ => Err(Error::MediaFileProbeError),
        }
    }

    /// Read and decode the next packet into the given buffer, reallocating it when needed.
    /// Returns `None` in case of EOF or internal error.
    fn read_packet(
        &mut self,
        buffer: &mut Option<DecodeBuffer<f32>>,
        buffer_capacity: &mut usize,
    ) -> Option<SignalSpec> {
        loop {
            // Demux an encoded packet from the media format.
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    return None; // End of this stream.
                }
                Err(err) => {
                    log::error!("Audio file decoder format error: {err}");
                    return None; // We cannot recover from format errors, quit.
                }
            };
            // If the packet does not belong to the selected track, skip over it.
            if packet.track_id() != self.track_id {
                continue;
            }
            // Decode the packet into an audio buffer.
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let capacity = decoded.capacity();
                    if buffer.is_none() || *buffer_capacity < capacity {
                        *buffer = Some(DecodeBuffer::new(capacity as u64, spec));
                        *buffer_capacity = capacity;
                    }
                    if let Some(buffer) = buffer {
                        buffer.copy_interleaved_ref(decoded);
                    }
                    return Some(spec);
                }
                Err(SymphoniaError::IoError(err)) => {
                    // The packet failed to decode due to an IO error, skip the packet.
                    log::warn!("Audio file decoder I/O error: {err}");
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    // The packet failed to decode due to invalid data, skip the packet.
                    log::warn!("Audio file decoder error: {err}");
                    continue;
                }
                Err(err) => {
                    log::error!("Audio file decoder fatal error: {err}");
                    return None;
                }
            };
        }
    }
}
