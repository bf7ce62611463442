//! Screen capture for the vision pipeline
//!
//! Two ways to get pixels, for two very different call patterns:
//! - [`capture`]: stateless snapshot of a screen region into a fresh RGB24
//!   buffer; safe from any thread, any frequency.
//! - [`AcceleratedCapture`]: stateful context for tight per-frame loops,
//!   backed by DXGI output duplication on Windows. Zones are registered once
//!   per region geometry and a single pixel buffer is reused across calls.
//!
//! The accelerated backend sits behind the [`AcceleratedBackend`] trait so
//! tests (and any future platform) can plug in their own implementation.

mod accelerated;
mod error;
mod frame;
mod generic;
mod traits;

#[cfg(target_os = "windows")]
mod dxgi;

#[cfg(target_os = "windows")]
mod gdi;

pub use accelerated::*;
pub use error::*;
pub use frame::*;
pub use generic::capture;
pub use traits::*;

#[cfg(target_os = "windows")]
pub use dxgi::DxgiBackend;

/// Create the platform backend for the accelerated path.
pub fn create_backend() -> CaptureResult<Box<dyn AcceleratedBackend>> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(DxgiBackend::new()))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform)
    }
}
