use std::fmt;

/// Errors surfaced synchronously to the embedded program.
///
/// Asset and draw-ordering problems are deliberately not represented here:
/// they degrade in place (fallback texture, silent no-op) and are observable
/// only through logs. The one prerequisite the caller must handle is the GPU
/// device not existing yet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HostError {
    /// A synchronous resource-creation call was made before GPU init.
    DeviceNotReady,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::DeviceNotReady => write!(f, "GPU device not ready"),
        }
    }
}

impl std::error::Error for HostError {}
