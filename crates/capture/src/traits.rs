//! Accelerated-backend trait abstraction

use std::time::Duration;

use crate::{CaptureRegion, CaptureResult};

/// Opaque handle to a zone registered with an accelerated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub u64);

/// Backend driving the accelerated capture path.
///
/// Implementations own the adapter/output binding, the capture session and
/// every registered zone. Production code uses the DXGI backend; tests
/// substitute a mock, which is why [`AcceleratedCapture`](crate::AcceleratedCapture)
/// takes the backend as a boxed trait object.
///
/// # Thread discipline
///
/// A backend, once opened, must be driven from a single thread. The trait is
/// `Send` so the whole capture context can be moved onto a dedicated capture
/// thread, but it is deliberately not `Sync`.
pub trait AcceleratedBackend: Send {
    /// Bind the first adapter and its first output, then open a capture
    /// session with the given frame timeout.
    ///
    /// Opening an already open backend is a no-op.
    fn open(&mut self, timeout: Duration) -> CaptureResult<()>;

    /// Register a rectangle for repeated capture and return its handle.
    ///
    /// Fails with [`CaptureError::ZoneRegistration`](crate::CaptureError::ZoneRegistration)
    /// if the region is empty or falls outside the output bounds.
    fn register_zone(&mut self, region: CaptureRegion) -> CaptureResult<ZoneId>;

    /// Capture one frame, updating every registered zone at once.
    fn capture_frame(&mut self) -> CaptureResult<()>;

    /// Copy a zone's latest pixels (native BGRA8) into `dest`, holding the
    /// zone's lock for the duration of the copy. Copies at most `dest.len()`
    /// bytes.
    fn read_zone(&mut self, zone: ZoneId, dest: &mut [u8]) -> CaptureResult<()>;

    /// Release the session and every registered zone. Idempotent.
    fn close(&mut self);
}
