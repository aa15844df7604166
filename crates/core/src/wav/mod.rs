//! 16-bit PCM WAV serialization and decoding of uncompressed WAV input.

use std::io::{Cursor, Write};

use crate::{CartError, DecodedBuffer, Result};

const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: usize = 2;

/// Serializes `buffer` as a canonical 44-byte-header PCM WAV file.
///
/// Fails only when the layout does not fit the 32-bit header fields.
pub fn encode_wav(buffer: &DecodedBuffer) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(encoded_len(buffer));
    write_wav(buffer, &mut bytes)?;
    Ok(bytes)
}

/// Total byte length [`encode_wav`] produces for `buffer`.
pub fn encoded_len(buffer: &DecodedBuffer) -> usize {
    HEADER_LEN + data_len(buffer)
}

/// Streams the WAV encoding of `buffer` into `writer`.
pub fn write_wav<W: Write>(buffer: &DecodedBuffer, mut writer: W) -> Result<()> {
    let header = Header::for_buffer(buffer)?;

    writer.write_all(b"RIFF")?;
    writer.write_all(&header.riff_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?; // chunk size
    writer.write_all(&1u16.to_le_bytes())?; // PCM
    writer.write_all(&header.channels.to_le_bytes())?;
    writer.write_all(&buffer.sample_rate().to_le_bytes())?;
    writer.write_all(&header.byte_rate.to_le_bytes())?;
    writer.write_all(&header.block_align.to_le_bytes())?;
    writer.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&header.data_size.to_le_bytes())?;

    let planes: Vec<&[f32]> = buffer.channels().collect();
    let mut frame = Vec::with_capacity(planes.len() * BYTES_PER_SAMPLE);
    for index in 0..buffer.frame_count() {
        frame.clear();
        for plane in &planes {
            frame.extend_from_slice(&quantize(plane[index]).to_le_bytes());
        }
        writer.write_all(&frame)?;
    }

    writer.flush()?;
    Ok(())
}

struct Header {
    channels: u16,
    block_align: u16,
    byte_rate: u32,
    data_size: u32,
    riff_size: u32,
}

impl Header {
    fn for_buffer(buffer: &DecodedBuffer) -> Result<Self> {
        let too_large = || CartError::InvalidBuffer("buffer does not fit a 16-bit PCM WAV header");

        let channels = u16::try_from(buffer.channel_count()).map_err(|_| too_large())?;
        let block_align = channels
            .checked_mul(BYTES_PER_SAMPLE as u16)
            .ok_or_else(too_large)?;
        let byte_rate = buffer
            .sample_rate()
            .checked_mul(u32::from(block_align))
            .ok_or_else(too_large)?;
        let data_size = u32::try_from(data_len(buffer)).map_err(|_| too_large())?;
        let riff_size = data_size
            .checked_add((HEADER_LEN - 8) as u32)
            .ok_or_else(too_large)?;

        Ok(Self {
            channels,
            block_align,
            byte_rate,
            data_size,
            riff_size,
        })
    }
}

/// Float to signed 16-bit: clamp to [-1, 1], scale negatives by 32768 and
/// the rest by 32767, truncate toward zero.
///
/// The product is formed in `f64`, where it is exact for every `f32` input.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = f64::from(sample).clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32_768.0) as i16
    } else {
        (clamped * 32_767.0) as i16
    }
}

/// Decodes an uncompressed WAV file into planar float samples.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedBuffer> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(undecodable)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(undecodable)?,
        (hound::SampleFormat::Int, bits @ 1..=32) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(undecodable)?
        }
        (format, bits) => {
            return Err(CartError::Undecodable(format!(
                "unsupported sample format {format:?} at {bits} bits"
            )))
        }
    };

    DecodedBuffer::from_interleaved(spec.sample_rate, channels, &samples)
        .map_err(|err| CartError::Undecodable(err.to_string()))
}

fn data_len(buffer: &DecodedBuffer) -> usize {
    buffer.frame_count() * buffer.channel_count() * BYTES_PER_SAMPLE
}

fn undecodable(err: hound::Error) -> CartError {
    CartError::Undecodable(err.to_string())
}
