//! Generic capture path: stateless single-shot screen copy

use crate::{CaptureError, CaptureRegion, CaptureResult, PixelBuffer, PixelFormat};

/// Copy a screen region into a freshly allocated 24bpp RGB buffer.
///
/// Performs one direct bulk pixel copy from the screen; no caching and no
/// persistent handles. Every call is independent, so this is safe to call
/// concurrently from any number of threads and alongside the accelerated
/// path. The returned buffer holds exactly
/// `region.width * region.height * 3` bytes, rows tightly packed top-down.
///
/// # Errors
///
/// [`CaptureError::CaptureFailed`] if the bulk screen copy fails (no desktop
/// session, region fully off-screen), [`CaptureError::UnsupportedPlatform`]
/// on non-Windows targets.
pub fn capture(region: CaptureRegion) -> CaptureResult<PixelBuffer> {
    if region.is_empty() {
        return Err(CaptureError::CaptureFailed(format!(
            "empty capture region {region:?}"
        )));
    }

    #[cfg(target_os = "windows")]
    {
        crate::gdi::capture_screen_region(region)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform)
    }
}

/// Repack padded BGR rows (as produced by a 24bpp DIB surface) into a tight
/// RGB24 buffer, swapping the channel order per pixel.
pub(crate) fn repack_bgr_rows(
    src: &[u8],
    src_stride: usize,
    width: u32,
    height: u32,
) -> CaptureResult<PixelBuffer> {
    let w = width as usize;
    let h = height as usize;
    if src_stride < w * 3 || src.len() < src_stride * h {
        return Err(CaptureError::CaptureFailed(format!(
            "screen copy returned a short buffer ({} bytes for {width}x{height}, stride {src_stride})",
            src.len()
        )));
    }

    let mut buffer = PixelBuffer::new(width, height, PixelFormat::Rgb8);
    let dst = buffer.data_mut();
    for y in 0..h {
        let row = &src[y * src_stride..y * src_stride + w * 3];
        let out = &mut dst[y * w * 3..(y + 1) * w * 3];
        for (s, d) in row.chunks_exact(3).zip(out.chunks_exact_mut(3)) {
            d[0] = s[2];
            d[1] = s[1];
            d[2] = s[0];
        }
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build padded BGR source rows where each pixel encodes its coordinates.
    fn padded_rows(width: u32, height: u32, stride: usize) -> Vec<u8> {
        let mut src = vec![0xEE; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let at = y * stride + x * 3;
                src[at] = 10; // B
                src[at + 1] = x as u8; // G
                src[at + 2] = y as u8; // R
            }
        }
        src
    }

    #[test]
    fn test_repack_produces_exact_rgb24_len() {
        let stride = (7 * 3 + 3) / 4 * 4; // DIB rows pad to 4 bytes
        let src = padded_rows(7, 5, stride);
        let buffer = repack_bgr_rows(&src, stride, 7, 5).unwrap();
        assert_eq!(buffer.data().len(), 7 * 5 * 3);
        assert_eq!(buffer.format(), PixelFormat::Rgb8);
    }

    #[test]
    fn test_repack_swaps_channels_and_drops_padding() {
        let stride = 4 * 3 + 8;
        let src = padded_rows(4, 3, stride);
        let buffer = repack_bgr_rows(&src, stride, 4, 3).unwrap();

        for y in 0..3 {
            for x in 0..4 {
                let px = &buffer.data()[(y * 4 + x) * 3..(y * 4 + x) * 3 + 3];
                assert_eq!(px, [y as u8, x as u8, 10]); // R G B
            }
        }
        // Padding byte never leaks into the output.
        assert!(!buffer.data().contains(&0xEE));
    }

    #[test]
    fn test_repack_rejects_short_source() {
        let src = vec![0u8; 10];
        assert!(repack_bgr_rows(&src, 12, 4, 4).is_err());
    }

    #[test]
    fn test_empty_region_is_rejected() {
        assert!(capture(CaptureRegion::new(0, 0, 0, 100)).is_err());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_unsupported_platform_off_windows() {
        let err = capture(CaptureRegion::new(0, 0, 10, 10)).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedPlatform));
    }

    /// Independent concurrent calls must never interfere: each thread gets a
    /// buffer of the right size with its own pixel pattern.
    #[test]
    fn test_concurrent_repacks_are_independent() {
        let handles: Vec<_> = (1..=8u32)
            .map(|n| {
                std::thread::spawn(move || {
                    let width = n * 3;
                    let height = n * 2;
                    let stride = (width as usize * 3 + 3) / 4 * 4;
                    let src = padded_rows(width, height, stride);
                    let buffer = repack_bgr_rows(&src, stride, width, height).unwrap();
                    assert_eq!(buffer.data().len(), (width * height * 3) as usize);
                    // Last pixel carries its own coordinates.
                    let last = &buffer.data()[buffer.data().len() - 3..];
                    assert_eq!(last[0], (height - 1) as u8);
                    assert_eq!(last[1], (width - 1) as u8);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
