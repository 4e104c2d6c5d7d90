use anyhow::bail;

/// Pixel layouts a frame can carry. Still-image output is always `Rgba8888`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8888,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A decoded, caller-owned frame. The backend only ever borrows it; the
/// pixel buffer always holds exactly `width * height * bytes_per_pixel` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: i32,
    pub height: i32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: i32, height: i32, format: PixelFormat) -> Bitmap {
        let len = width.max(0) as usize * height.max(0) as usize * format.bytes_per_pixel();

        Bitmap {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    pub fn from_raw(width: i32, height: i32, format: PixelFormat, data: Vec<u8>) -> anyhow::Result<Bitmap> {
        if width <= 0 || height <= 0 {
            bail!("Invalid bitmap dimensions {width}x{height}");
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            bail!("Bitmap buffer of {} bytes does not match {width}x{height} {format:?} (expected {expected})", data.len());
        }

        Ok(Bitmap {
            width,
            height,
            format,
            data,
        })
    }
}
