//! Capture regions and pixel buffer data structures

/// Pixel format of a captured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// BGRA 8-bit per channel, premultiplied alpha (accelerated path)
    Bgra8,
    /// RGB 8-bit per channel, no alpha (generic path)
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A screen rectangle to capture, in screen coordinates.
///
/// Equality and hashing cover all four fields; the accelerated path uses the
/// region itself as the zone-cache key, so two calls with identical geometry
/// resolve to the same backend zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of a tightly packed buffer holding this region
    pub fn byte_len(&self, format: PixelFormat) -> usize {
        self.width as usize * self.height as usize * format.bytes_per_pixel()
    }
}

/// An owned pixel buffer with tightly packed rows.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer of exactly
    /// `width * height * bytes_per_pixel` bytes.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            data: vec![0; len],
            width,
            height,
            format,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and take its storage
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Borrow the buffer as a non-owning view
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.data,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

/// A non-owning view of pixel data whose storage lives elsewhere.
///
/// Views handed out by the accelerated path alias its reusable buffer and are
/// only valid until the next capture call; the borrow checker enforces this
/// because the next call needs the capture context mutably.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_len_matches_dimensions() {
        let buffer = PixelBuffer::new(100, 50, PixelFormat::Rgb8);
        assert_eq!(buffer.data().len(), 100 * 50 * 3);

        let buffer = PixelBuffer::new(64, 64, PixelFormat::Bgra8);
        assert_eq!(buffer.data().len(), 64 * 64 * 4);
    }

    #[test]
    fn test_view_reflects_buffer() {
        let mut buffer = PixelBuffer::new(4, 2, PixelFormat::Bgra8);
        buffer.data_mut()[0] = 0xAB;

        let view = buffer.view();
        assert_eq!(view.width(), 4);
        assert_eq!(view.height(), 2);
        assert_eq!(view.format(), PixelFormat::Bgra8);
        assert_eq!(view.data()[0], 0xAB);
        assert_eq!(view.data().len(), 4 * 2 * 4);
    }

    #[test]
    fn test_region_equality_is_geometric() {
        let a = CaptureRegion::new(10, 20, 100, 50);
        let b = CaptureRegion::new(10, 20, 100, 50);
        let c = CaptureRegion::new(10, 20, 100, 51);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(CaptureRegion::new(0, 0, 0, 10).is_empty());
        assert_eq!(a.byte_len(PixelFormat::Rgb8), 100 * 50 * 3);
    }
}
