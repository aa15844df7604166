//! Core library for the Cart Deck player.
//!
//! Two independent subsystems live here. The cart side ([`CartQueue`],
//! [`StackRegistry`]) keeps hotkeyed stacks of audio carts ordered and
//! tracks which cart is on air. The editor side ([`DecodedBuffer`],
//! [`EditorSession`] and the [`buffer`] / [`wav`] functions) cuts regions out
//! of decoded audio and serializes the result as 16-bit PCM WAV.
//!
//! Everything runs synchronously. UI layers drive the API one event at a
//! time and render from the read-only snapshots.

pub mod buffer;
pub mod cart;
pub mod config;
pub mod editor;
pub mod error;
pub mod queue;
pub mod registry;
pub mod wav;

pub use buffer::{extract_region, ripple_delete, DecodedBuffer, Region, RippleOutcome};
pub use cart::{CartId, CartItem, CartStatus, SourceDescriptor, SourceHandle};
pub use config::{AppConfig, EditorConfig, StackConfig};
pub use editor::EditorSession;
pub use error::{CartError, Result};
pub use queue::{Activation, CartQueue, Placement, ReorderTarget};
pub use registry::{MoveOutcome, MoveRequest, StackId, StackRegistry, StackSnapshot};
pub use wav::{decode_wav, encode_wav, write_wav};
