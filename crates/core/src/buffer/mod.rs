//! Immutable decoded sample buffers and the sample-accurate edits on them.
//!
//! Edits never write into an existing buffer; each one allocates the new
//! channel data and hands back a fresh [`DecodedBuffer`].

use std::sync::Arc;

use serde::Serialize;

use crate::{CartError, Result};

/// A `[start, end)` span in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    start: f64,
    end: f64,
}

impl Region {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(CartError::InvalidRegion { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Frame span `[start, end)` for a buffer, clamped to its length.
    pub fn frame_span(&self, sample_rate: u32, frame_count: usize) -> (usize, usize) {
        let to_frame = |seconds: f64| {
            let frame = (seconds * f64::from(sample_rate)).floor();
            if frame <= 0.0 {
                0
            } else {
                (frame as usize).min(frame_count)
            }
        };
        (to_frame(self.start), to_frame(self.end))
    }
}

/// Decoded multichannel audio. Cloning shares the sample storage.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    sample_rate: u32,
    channels: Arc<[Box<[f32]>]>,
}

impl DecodedBuffer {
    /// Builds a buffer from planar channel data. All channels must have the
    /// same length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CartError::InvalidBuffer("sample rate must be positive"));
        }
        if channels.is_empty() {
            return Err(CartError::InvalidBuffer("at least one channel is required"));
        }
        if channels.len() > usize::from(u16::MAX) {
            return Err(CartError::InvalidBuffer("too many channels"));
        }
        let frames = channels[0].len();
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(CartError::InvalidBuffer("channel lengths differ"));
        }

        Ok(Self::from_planar(
            sample_rate,
            channels.into_iter().map(Vec::into_boxed_slice).collect(),
        ))
    }

    /// Builds a buffer from interleaved frames.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Result<Self> {
        if channel_count == 0 {
            return Err(CartError::InvalidBuffer("at least one channel is required"));
        }
        if samples.len() % channel_count != 0 {
            return Err(CartError::InvalidBuffer("sample count is not a whole number of frames"));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// A zero-length buffer with the given layout.
    pub fn empty(sample_rate: u32, channel_count: usize) -> Self {
        Self::from_planar(
            sample_rate,
            (0..channel_count.max(1)).map(|_| Box::default()).collect(),
        )
    }

    fn from_planar(sample_rate: u32, channels: Vec<Box<[f32]>>) -> Self {
        Self {
            sample_rate,
            channels: channels.into(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, |channel| channel.len())
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|channel| &channel[..])
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(|channel| &channel[..])
    }

    fn map_channels(&self, f: impl Fn(&[f32]) -> Box<[f32]>) -> Self {
        Self::from_planar(self.sample_rate, self.channels().map(f).collect())
    }
}

/// Result of a ripple delete that had something to cut.
#[derive(Debug, Clone, PartialEq)]
pub enum RippleOutcome {
    /// The region was excised and the tail shifted left.
    Spliced(DecodedBuffer),
    /// The region covered the whole buffer; nothing is left.
    Cleared(DecodedBuffer),
}

impl RippleOutcome {
    pub fn buffer(&self) -> &DecodedBuffer {
        match self {
            Self::Spliced(buffer) | Self::Cleared(buffer) => buffer,
        }
    }

    pub fn into_buffer(self) -> DecodedBuffer {
        match self {
            Self::Spliced(buffer) | Self::Cleared(buffer) => buffer,
        }
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared(_))
    }
}

/// Copies the frames covered by `region` into a new buffer. Returns `None`
/// when the region maps to no frames.
pub fn extract_region(buffer: &DecodedBuffer, region: Region) -> Option<DecodedBuffer> {
    let (start, end) = region.frame_span(buffer.sample_rate(), buffer.frame_count());
    if end <= start {
        return None;
    }
    Some(buffer.map_channels(|channel| Box::from(&channel[start..end])))
}

/// Removes the frames covered by `region` and closes the gap. Returns `None`
/// when the region maps to no frames.
pub fn ripple_delete(buffer: &DecodedBuffer, region: Region) -> Option<RippleOutcome> {
    let frame_count = buffer.frame_count();
    let (start, end) = region.frame_span(buffer.sample_rate(), frame_count);
    if end <= start {
        return None;
    }

    let cut = end - start;
    if cut >= frame_count {
        return Some(RippleOutcome::Cleared(DecodedBuffer::empty(
            buffer.sample_rate(),
            buffer.channel_count(),
        )));
    }

    let remaining = frame_count - cut;
    Some(RippleOutcome::Spliced(buffer.map_channels(|channel| {
        let mut out = Vec::with_capacity(remaining);
        out.extend_from_slice(&channel[..start]);
        out.extend_from_slice(&channel[end..]);
        out.into_boxed_slice()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(sample_rate: u32, frames: usize) -> DecodedBuffer {
        let left: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        DecodedBuffer::new(sample_rate, vec![left, right]).unwrap()
    }

    #[test]
    fn rejects_inconsistent_buffers() {
        assert!(DecodedBuffer::new(44_100, vec![]).is_err());
        assert!(DecodedBuffer::new(0, vec![vec![0.0]]).is_err());
        assert!(DecodedBuffer::new(44_100, vec![vec![0.0; 3], vec![0.0; 2]]).is_err());
    }

    #[test]
    fn rejects_invalid_regions() {
        assert!(Region::new(1.0, 1.0).is_err());
        assert!(Region::new(2.0, 1.0).is_err());
        assert!(Region::new(-0.5, 1.0).is_err());
        assert!(Region::new(0.0, f64::INFINITY).is_err());
        assert!(Region::new(0.0, 0.25).is_ok());
    }

    #[test]
    fn interleaved_input_is_split_per_channel() {
        let buffer = DecodedBuffer::from_interleaved(8_000, 2, &[0.1, -0.1, 0.2, -0.2]).unwrap();
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.1, 0.2]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.1, -0.2]);
        assert!(DecodedBuffer::from_interleaved(8_000, 2, &[0.1, 0.2, 0.3]).is_err());
    }

    #[test]
    fn extracts_one_second_from_three() {
        let buffer = DecodedBuffer::new(44_100, vec![vec![0.25; 3 * 44_100]]).unwrap();
        let clip = extract_region(&buffer, Region::new(1.0, 2.0).unwrap()).unwrap();

        assert_eq!(clip.frame_count(), 44_100);
        assert_eq!(clip.sample_rate(), 44_100);
        assert_eq!(clip.channel_count(), 1);
    }

    #[test]
    fn extraction_copies_samples_verbatim() {
        let buffer = ramp(10, 10);
        let clip = extract_region(&buffer, Region::new(0.2, 0.5).unwrap()).unwrap();

        assert_eq!(clip.channel(0).unwrap(), &buffer.channel(0).unwrap()[2..5]);
        assert_eq!(clip.channel(1).unwrap(), &buffer.channel(1).unwrap()[2..5]);
    }

    #[test]
    fn extraction_below_one_frame_is_nothing() {
        let buffer = ramp(10, 10);
        assert!(extract_region(&buffer, Region::new(0.31, 0.39).unwrap()).is_none());
        assert!(extract_region(&buffer, Region::new(5.0, 6.0).unwrap()).is_none());
    }

    #[test]
    fn extraction_clamps_past_the_end() {
        let buffer = ramp(10, 10);
        let clip = extract_region(&buffer, Region::new(0.8, 4.0).unwrap()).unwrap();
        assert_eq!(clip.frame_count(), 2);
    }

    #[test]
    fn ripple_delete_splices_channels() {
        let buffer =
            DecodedBuffer::new(1, vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![-1.0, -2.0, -3.0, -4.0, -5.0]])
                .unwrap();

        let outcome = ripple_delete(&buffer, Region::new(1.0, 3.0).unwrap()).unwrap();
        assert!(!outcome.is_cleared());

        let edited = outcome.into_buffer();
        assert_eq!(edited.channel(0).unwrap(), &[1.0, 4.0, 5.0]);
        assert_eq!(edited.channel(1).unwrap(), &[-1.0, -4.0, -5.0]);
        assert_eq!(edited.sample_rate(), 1);
        // the source buffer is untouched
        assert_eq!(buffer.frame_count(), 5);
    }

    #[test]
    fn ripple_delete_keeps_samples_outside_the_cut() {
        let buffer = ramp(100, 300);
        let edited = ripple_delete(&buffer, Region::new(1.0, 2.0).unwrap())
            .unwrap()
            .into_buffer();

        assert_eq!(edited.frame_count(), 200);
        let head = extract_region(&edited, Region::new(0.0, 1.0).unwrap()).unwrap();
        let tail = extract_region(&edited, Region::new(1.0, 2.0).unwrap()).unwrap();
        assert_eq!(head.channel(0).unwrap(), &buffer.channel(0).unwrap()[..100]);
        assert_eq!(tail.channel(1).unwrap(), &buffer.channel(1).unwrap()[200..]);
    }

    #[test]
    fn ripple_delete_of_everything_clears() {
        let buffer = ramp(10, 10);
        let outcome = ripple_delete(&buffer, Region::new(0.0, 1.0).unwrap()).unwrap();

        assert!(outcome.is_cleared());
        assert_eq!(outcome.buffer().frame_count(), 0);
        assert_eq!(outcome.buffer().channel_count(), 2);
    }

    #[test]
    fn ripple_delete_of_nothing_is_rejected() {
        let buffer = ramp(10, 10);
        assert!(ripple_delete(&buffer, Region::new(0.11, 0.15).unwrap()).is_none());
    }
}
