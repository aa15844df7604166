//! Waveform editor session: one loaded buffer and at most one selection.

use tracing::debug;

use crate::{
    buffer::{extract_region, ripple_delete, RippleOutcome},
    config::EditorConfig,
    wav::{decode_wav, encode_wav},
    CartError, DecodedBuffer, Region, Result, SourceDescriptor, SourceHandle,
};

#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    config: EditorConfig,
    source_name: String,
    buffer: Option<DecodedBuffer>,
    selection: Option<Region>,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replaces the loaded buffer. Any selection belongs to the old buffer
    /// and is dropped.
    pub fn load(&mut self, source_name: impl Into<String>, buffer: DecodedBuffer) {
        self.source_name = source_name.into();
        debug!(
            name = %self.source_name,
            frames = buffer.frame_count(),
            channels = buffer.channel_count(),
            "editor buffer loaded"
        );
        self.buffer = Some(buffer);
        self.selection = None;
    }

    /// Decodes WAV bytes and loads them. The session is untouched on failure.
    pub fn load_wav(&mut self, source_name: impl Into<String>, bytes: &[u8]) -> Result<()> {
        let buffer = decode_wav(bytes)?;
        self.load(source_name, buffer);
        Ok(())
    }

    pub fn unload(&mut self) {
        self.buffer = None;
        self.selection = None;
        self.source_name.clear();
    }

    pub fn buffer(&self) -> Option<&DecodedBuffer> {
        self.buffer.as_ref()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn selection(&self) -> Option<Region> {
        self.selection
    }

    /// Makes `region` the only selection, replacing any previous one. An end
    /// past the buffer is clamped to its duration.
    pub fn select(&mut self, region: Region) -> Result<Region> {
        let buffer = self.buffer.as_ref().ok_or(CartError::NoBuffer)?;
        let duration = buffer.duration_seconds();
        let region = Region::new(region.start(), region.end().min(duration)).map_err(|_| {
            CartError::InvalidRegion {
                start: region.start(),
                end: region.end(),
            }
        })?;

        if let Some(previous) = self.selection.replace(region) {
            debug!(start = previous.start(), end = previous.end(), "selection replaced");
        }
        Ok(region)
    }

    pub fn clear_selection(&mut self) -> Option<Region> {
        self.selection.take()
    }

    /// Cuts the selection out of the loaded buffer. On success the edited
    /// buffer replaces the old one and the selection is cleared. `Ok(None)`
    /// means the selection covers no whole frame and nothing changed.
    pub fn ripple_delete_selection(&mut self) -> Result<Option<RippleOutcome>> {
        let (buffer, region) = self.active()?;
        let Some(outcome) = ripple_delete(buffer, region) else {
            return Ok(None);
        };

        debug!(
            start = region.start(),
            end = region.end(),
            remaining = outcome.buffer().frame_count(),
            cleared = outcome.is_cleared(),
            "ripple delete applied"
        );
        self.buffer = Some(outcome.buffer().clone());
        self.selection = None;
        Ok(Some(outcome))
    }

    /// The selected frames as a new buffer. `Ok(None)` means the selection
    /// covers no whole frame.
    pub fn extract_selection(&self) -> Result<Option<DecodedBuffer>> {
        let (buffer, region) = self.active()?;
        Ok(extract_region(buffer, region))
    }

    /// WAV bytes of the selection.
    pub fn export_selection(&self) -> Result<Option<Vec<u8>>> {
        self.extract_selection()?
            .map(|clip| encode_wav(&clip))
            .transpose()
    }

    /// WAV bytes of the whole loaded buffer, including any edits.
    pub fn export_buffer(&self) -> Result<Vec<u8>> {
        let buffer = self.buffer.as_ref().ok_or(CartError::NoBuffer)?;
        encode_wav(buffer)
    }

    /// Packages the selection as an in-memory WAV source ready to be added
    /// to a stack.
    pub fn selection_as_source(&self) -> Result<Option<SourceDescriptor>> {
        let Some(bytes) = self.export_selection()? else {
            return Ok(None);
        };

        let base = if self.source_name.trim().is_empty() {
            "Selection"
        } else {
            self.source_name.as_str()
        };
        Ok(Some(SourceDescriptor::new(
            SourceHandle::memory(bytes),
            self.config.clip_mime_type.clone(),
            format!("{base}{}", self.config.clip_suffix),
        )))
    }

    fn active(&self) -> Result<(&DecodedBuffer, Region)> {
        let buffer = self.buffer.as_ref().ok_or(CartError::NoBuffer)?;
        let region = self.selection.ok_or(CartError::NoSelection)?;
        Ok((buffer, region))
    }
}
