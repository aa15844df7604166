//! Cart items and the source references they are built from.

use std::{fmt, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Opaque, immutable identifier of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(Uuid);

impl CartId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Playback status of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    #[default]
    Queued,
    Playing,
    /// Set only by the playback surface. Counts as live for the
    /// one-playing-item rule but never sinks or requeues on its own.
    Paused,
    Played,
}

impl CartStatus {
    /// `true` for the statuses that occupy the single on-air slot.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Reference to the bytes behind a cart. The core never reads through it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum SourceHandle {
    Path(PathBuf),
    Url(String),
    /// Encoded audio held in memory, e.g. a clip cut in the editor.
    Memory(#[serde(serialize_with = "serialize_byte_len")] Arc<[u8]>),
}

impl SourceHandle {
    pub fn memory(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory(bytes.into())
    }
}

fn serialize_byte_len<S: Serializer>(bytes: &Arc<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

/// What an ingestion collaborator hands over for each dropped or picked file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub source: SourceHandle,
    pub mime_type: String,
    pub display_name: String,
}

impl SourceDescriptor {
    pub fn new(
        source: SourceHandle,
        mime_type: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            mime_type: mime_type.into(),
            display_name: display_name.into(),
        }
    }
}

/// One loaded audio clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    id: CartId,
    source: SourceHandle,
    title: String,
    duration_seconds: f64,
    status: CartStatus,
    added_at: DateTime<Utc>,
}

impl CartItem {
    /// Builds a fresh `Queued` cart with an unresolved duration.
    pub fn new(source: SourceHandle, title: &str, fallback_title: &str) -> Self {
        Self {
            id: CartId::new(),
            source,
            title: normalize_title(title, fallback_title),
            duration_seconds: 0.0,
            status: CartStatus::Queued,
            added_at: Utc::now(),
        }
    }

    pub fn from_descriptor(descriptor: SourceDescriptor, fallback_title: &str) -> Self {
        Self::new(descriptor.source, &descriptor.display_name, fallback_title)
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Locator the playback surface is asked to play.
    pub fn stream_locator(&self) -> String {
        match &self.source {
            SourceHandle::Path(path) => path.display().to_string(),
            SourceHandle::Url(url) => url.clone(),
            SourceHandle::Memory(_) => format!("memory:{}", self.id),
        }
    }

    pub fn rename(&mut self, title: &str, fallback_title: &str) {
        self.title = normalize_title(title, fallback_title);
    }

    pub(crate) fn set_status(&mut self, status: CartStatus) {
        self.status = status;
    }

    pub(crate) fn set_duration(&mut self, seconds: f64) {
        self.duration_seconds = seconds;
    }
}

fn normalize_title(title: &str, fallback_title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        fallback_title.to_string()
    } else {
        trimmed.to_string()
    }
}
