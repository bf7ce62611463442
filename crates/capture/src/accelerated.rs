//! Accelerated capture path: lazy session, zone cache, reusable buffer
//!
//! Built for tight capture-to-inference loops: zone registration is paid once
//! per distinct region, frame capture once per call, and pixel storage once
//! per process.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    AcceleratedBackend, CaptureRegion, CaptureResult, FrameView, PixelBuffer, PixelFormat, ZoneId,
};

/// Bounded wait for one backend frame capture.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Stateful capture context for the high-frequency path.
///
/// The context owns the backend session, the zone cache and a single reusable
/// pixel buffer. Everything is initialized lazily on the first
/// [`capture`](Self::capture) call and released by [`teardown`](Self::teardown).
///
/// # Thread discipline
///
/// Once the first capture has run, the context must be driven from exactly one
/// thread. Moving it to another thread between calls is allowed (`Send`);
/// concurrent use is not, and the `&mut self` receiver makes that
/// unrepresentable without external synchronization, which callers must not
/// add around individual calls either - the backend's resource model is
/// single-threaded.
pub struct AcceleratedCapture {
    backend: Box<dyn AcceleratedBackend>,
    zones: HashMap<CaptureRegion, ZoneId>,
    buffer: Option<PixelBuffer>,
    session_open: bool,
    timeout: Duration,
}

impl AcceleratedCapture {
    /// Create a context over the platform backend.
    pub fn new() -> CaptureResult<Self> {
        Ok(Self::with_backend(crate::create_backend()?))
    }

    /// Create a context over an injected backend.
    pub fn with_backend(backend: Box<dyn AcceleratedBackend>) -> Self {
        Self {
            backend,
            zones: HashMap::new(),
            buffer: None,
            session_open: false,
            timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    /// Override the per-frame capture timeout. Takes effect when the session
    /// is (re)opened.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Capture the given region, reusing the zone registered for its geometry
    /// and overwriting the shared pixel buffer in place.
    ///
    /// Returns `None` when no fresh frame could be produced this call
    /// (session init failure, zone registration failure, frame timeout).
    /// Looping callers should treat that as "skip this iteration"; failures
    /// are logged, never retried internally.
    ///
    /// The returned view aliases the reusable buffer and is valid only until
    /// the next call on this context.
    ///
    /// # Known hazard
    ///
    /// The buffer is allocated at the dimensions of the first successfully
    /// captured region and never reallocated. Requesting a differently sized
    /// region afterwards overwrites the same storage and yields a view with
    /// the original dimensions; callers must keep the region size constant
    /// for the lifetime of the context (or until [`teardown`](Self::teardown)).
    pub fn capture(&mut self, region: CaptureRegion) -> Option<FrameView<'_>> {
        if !self.session_open {
            if let Err(err) = self.backend.open(self.timeout) {
                warn!("accelerated capture init failed: {err}");
                return None;
            }
            info!("accelerated capture session opened");
            self.session_open = true;
        }

        if !self.zones.contains_key(&region) {
            match self.backend.register_zone(region) {
                Ok(id) => {
                    info!(?region, "registered capture zone");
                    self.zones.insert(region, id);
                }
                // Leave the key absent so the next call with this geometry
                // retries registration.
                Err(err) => warn!(?region, "zone registration failed: {err}"),
            }
        }

        // One backend-level frame capture services every registered zone.
        if let Err(err) = self.backend.capture_frame() {
            warn!("frame capture failed: {err}");
            return None;
        }

        let zone = *self.zones.get(&region)?;

        let buffer = self
            .buffer
            .get_or_insert_with(|| PixelBuffer::new(region.width, region.height, PixelFormat::Bgra8));

        if let Err(err) = self.backend.read_zone(zone, buffer.data_mut()) {
            warn!(?region, "zone read failed: {err}");
            return None;
        }

        Some(buffer.view())
    }

    /// Release the backend session, the zone cache and the pixel buffer.
    ///
    /// The next [`capture`](Self::capture) call re-runs initialization from
    /// scratch. Safe to call at any time, including before first use.
    pub fn teardown(&mut self) {
        if self.session_open {
            info!("tearing down accelerated capture");
        }
        self.backend.close();
        self.zones.clear();
        self.buffer = None;
        self.session_open = false;
    }
}
