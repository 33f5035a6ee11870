//! GPU device + surface management.
//!
//! Owns the wgpu Instance/Adapter/Device/Queue, configures the surface
//! (swapchain), and acquires per-frame drawable textures for the host.

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
