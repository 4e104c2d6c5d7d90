use std::path::Path;

use crate::frame::Bitmap;

/// Token for a matrix owned by the backend. Zero means "no resource": it is
/// never dereferenced and releasing it is a no-op. Every valid handle handed
/// out by a conversion or filter call must be released exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatHandle(pub u64);

impl MatHandle {
    pub const NULL: MatHandle = MatHandle(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// The native vision capability boundary. Implementations supply the actual
/// filter kernels (color conversion, blur, Canny, cascade loading); callers
/// own the sequencing and the handle lifetimes.
pub trait VisionBackend {
    /// Runs the whole default still chain in one call and hands back a new frame.
    fn process_photo_frame(&self, bitmap: &Bitmap) -> anyhow::Result<Bitmap>;

    /// Processes one raw NV21 preview buffer; the result is the derived
    /// grayscale plane.
    fn process_preview_frame(&self, buffer: &[u8], width: i32, height: i32) -> anyhow::Result<Vec<u8>>;

    fn bitmap_to_mat(&self, bitmap: &Bitmap) -> anyhow::Result<MatHandle>;

    /// Writes a matrix into a destination frame of the same dimensions. The
    /// destination is not guaranteed consistent after an error.
    fn mat_to_bitmap(&self, handle: MatHandle, out: &mut Bitmap) -> anyhow::Result<()>;

    fn grayscale(&self, src: MatHandle) -> anyhow::Result<MatHandle>;

    /// Gaussian blur followed by Canny. Thresholds are forwarded as given,
    /// low > high included.
    fn edge_detect(&self, src: MatHandle, low_threshold: f64, high_threshold: f64) -> anyhow::Result<MatHandle>;

    /// Expands a single-channel matrix into the destination handle's slot as
    /// four-channel RGBA.
    fn expand_gray(&self, src: MatHandle, dst: MatHandle) -> anyhow::Result<()>;

    fn mat_type(&self, handle: MatHandle) -> anyhow::Result<i32>;

    /// (cols, rows) of the matrix behind the handle.
    fn mat_size(&self, handle: MatHandle) -> anyhow::Result<(i32, i32)>;

    fn load_classifier(&self, path: &Path) -> anyhow::Result<()>;

    fn classifier_loaded(&self) -> bool;

    /// Never fails observably; zero and unknown handles are silently ignored.
    fn release_mat(&self, handle: MatHandle);
}
