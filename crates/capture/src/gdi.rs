//! GDI bulk screen copy backing the generic capture path

use std::ffi::c_void;

use windows::Win32::Foundation::HANDLE;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC,
    SelectObject, BI_RGB, BITMAPINFO, BITMAPINFOHEADER, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
    SRCCOPY,
};

use crate::generic::repack_bgr_rows;
use crate::{CaptureError, CaptureRegion, CaptureResult, PixelBuffer};

/// 24bpp DIB rows are padded to 4-byte boundaries.
fn dib_stride(width: u32) -> usize {
    (width as usize * 3 + 3) / 4 * 4
}

/// One BitBlt from the desktop DC into a 24bpp DIB section, repacked into a
/// tight RGB buffer. All GDI objects are scoped to this call.
pub(crate) fn capture_screen_region(region: CaptureRegion) -> CaptureResult<PixelBuffer> {
    let width = region.width as i32;
    let height = region.height as i32;
    let stride = dib_stride(region.width);

    let surface = DibSurface::new(width, height)?;
    unsafe {
        BitBlt(
            surface.mem_dc,
            0,
            0,
            width,
            height,
            surface.screen_dc,
            region.x,
            region.y,
            SRCCOPY,
        )
        .map_err(|err| CaptureError::CaptureFailed(format!("BitBlt: {err}")))?;
    }

    let src = unsafe { std::slice::from_raw_parts(surface.bits, stride * region.height as usize) };
    repack_bgr_rows(src, stride, region.width, region.height)
}

/// Desktop DC, memory DC and a top-down 24bpp DIB section, released in
/// reverse order on drop so no GDI object leaks on error paths.
struct DibSurface {
    screen_dc: HDC,
    mem_dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
    bits: *const u8,
}

impl DibSurface {
    fn new(width: i32, height: i32) -> CaptureResult<Self> {
        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(CaptureError::CaptureFailed(
                    "GetDC(NULL) returned null".into(),
                ));
            }

            let mem_dc = CreateCompatibleDC(screen_dc);
            if mem_dc.is_invalid() {
                let _ = ReleaseDC(None, screen_dc);
                return Err(CaptureError::CaptureFailed(
                    "CreateCompatibleDC failed".into(),
                ));
            }

            let mut info = BITMAPINFO::default();
            info.bmiHeader.biSize = size_of::<BITMAPINFOHEADER>() as u32;
            info.bmiHeader.biWidth = width;
            // Negative height selects a top-down surface.
            info.bmiHeader.biHeight = -height;
            info.bmiHeader.biPlanes = 1;
            info.bmiHeader.biBitCount = 24;
            info.bmiHeader.biCompression = BI_RGB.0;

            let mut bits: *mut c_void = std::ptr::null_mut();
            let bitmap = CreateDIBSection(
                mem_dc,
                &info,
                DIB_RGB_COLORS,
                &mut bits,
                HANDLE::default(),
                0,
            )
            .map_err(|err| {
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(None, screen_dc);
                CaptureError::CaptureFailed(format!("CreateDIBSection: {err}"))
            })?;
            if bits.is_null() {
                let _ = DeleteObject(bitmap);
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(None, screen_dc);
                return Err(CaptureError::CaptureFailed(
                    "CreateDIBSection returned a null pixel buffer".into(),
                ));
            }

            let previous = SelectObject(mem_dc, bitmap);
            Ok(Self {
                screen_dc,
                mem_dc,
                bitmap,
                previous,
                bits: bits.cast_const().cast(),
            })
        }
    }
}

impl Drop for DibSurface {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.mem_dc, self.previous);
            let _ = DeleteObject(self.bitmap);
            let _ = DeleteDC(self.mem_dc);
            let _ = ReleaseDC(None, self.screen_dc);
        }
    }
}
