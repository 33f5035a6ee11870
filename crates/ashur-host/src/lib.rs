//! Ashur rendering host crate.
//!
//! A 2D retained-mode rendering host: embedded programs drive it through a
//! small numeric-handle API (create texture/mesh/render target, begin/end
//! frame and pass, draw sprite/mesh/gizmo line) and the host translates those
//! calls into wgpu resource management and command submission.

pub mod assets;
pub mod device;
pub mod error;
pub mod gizmo;
pub mod host;
pub mod logging;
pub mod registry;
pub mod transform;

mod render;

pub use error::HostError;
pub use host::{HostConfig, RenderHost};
