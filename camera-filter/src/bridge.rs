use std::path::Path;

use vision::{Bitmap, MatHandle, VisionBackend};

pub const DEFAULT_LOW_THRESHOLD: f64 = 50.0;
pub const DEFAULT_HIGH_THRESHOLD: f64 = 150.0;

/// Call surface over the vision backend. Every operation collapses a backend
/// error into that operation's sentinel value, so no failure crosses this
/// boundary as anything but a value; logging here is diagnostic only.
pub struct FrameBridge {
    backend: Box<dyn VisionBackend>,
}

impl FrameBridge {
    pub fn new(backend: Box<dyn VisionBackend>) -> FrameBridge {
        FrameBridge { backend }
    }

    pub fn process_photo(&self, bitmap: &Bitmap) -> Option<Bitmap> {
        match self.backend.process_photo_frame(bitmap) {
            Ok(output) => Some(output),
            Err(e) => {
                log::error!("Photo frame processing failed: {e}");
                None
            }
        }
    }

    pub fn process_preview(&self, buffer: &[u8], width: i32, height: i32) -> Option<Vec<u8>> {
        match self.backend.process_preview_frame(buffer, width, height) {
            Ok(output) => Some(output),
            Err(e) => {
                log::error!("Preview frame processing failed: {e}");
                None
            }
        }
    }

    pub fn bitmap_to_mat(&self, bitmap: &Bitmap) -> MatHandle {
        match self.backend.bitmap_to_mat(bitmap) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("Bitmap to mat conversion failed: {e}");
                MatHandle::NULL
            }
        }
    }

    pub fn mat_to_bitmap(&self, handle: MatHandle, out: &mut Bitmap) -> bool {
        match self.backend.mat_to_bitmap(handle, out) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Mat to bitmap conversion failed: {e}");
                false
            }
        }
    }

    pub fn grayscale(&self, src: MatHandle) -> MatHandle {
        match self.backend.grayscale(src) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("Grayscale conversion failed: {e}");
                MatHandle::NULL
            }
        }
    }

    pub fn apply_canny(&self, src: MatHandle) -> MatHandle {
        self.apply_canny_with_thresholds(src, DEFAULT_LOW_THRESHOLD, DEFAULT_HIGH_THRESHOLD)
    }

    /// Thresholds are forwarded as given; low > high is not rejected here.
    pub fn apply_canny_with_thresholds(&self, src: MatHandle, low_threshold: f64, high_threshold: f64) -> MatHandle {
        match self.backend.edge_detect(src, low_threshold, high_threshold) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("Edge detection failed: {e}");
                MatHandle::NULL
            }
        }
    }

    pub fn expand_gray(&self, src: MatHandle, dst: MatHandle) -> bool {
        match self.backend.expand_gray(src, dst) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Grayscale expansion failed: {e}");
                false
            }
        }
    }

    pub fn mat_type(&self, handle: MatHandle) -> Option<i32> {
        self.backend.mat_type(handle).ok()
    }

    pub fn mat_size(&self, handle: MatHandle) -> Option<(i32, i32)> {
        self.backend.mat_size(handle).ok()
    }

    pub fn load_classifier(&self, path: &Path) -> bool {
        match self.backend.load_classifier(path) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Cascade load failed: {e}");
                false
            }
        }
    }

    pub fn classifier_loaded(&self) -> bool {
        self.backend.classifier_loaded()
    }

    /// Zero handles are never forwarded; releasing an unknown handle is a
    /// backend-side no-op either way.
    pub fn release_mat(&self, handle: MatHandle) {
        if handle.is_valid() {
            self.backend.release_mat(handle);
        }
    }
}
