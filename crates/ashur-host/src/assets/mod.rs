//! Asynchronous asset-loading pipeline.
//!
//! Texture and shader loads are fire-and-forget: the caller gets a handle
//! immediately and resolution happens later. Requests issued before the GPU
//! device exists are queued and replayed in FIFO order at device-ready time.
//! Failures are logged and never surfaced to the call site.

mod loader;
mod path;

pub use loader::{AssetLoader, LoadEvent, PendingLoad};
pub use path::resolve_asset_path;
