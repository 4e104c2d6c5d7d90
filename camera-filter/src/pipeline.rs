use std::{fs, path::Path, sync::Mutex};

use anyhow::{bail, ensure};
use vision::{Bitmap, MatHandle, PixelFormat};

use crate::bridge::FrameBridge;

/// The transform applied to the next submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSelection {
    None,
    Grayscale,
    EdgeDetection,
}

/// Lifecycle of the optional detector model. `Unloaded` covers the
/// recognized "no model file" condition; `LoadFailed` is terminal for the
/// pipeline instance and is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    Unloaded,
    Loaded,
    LoadFailed,
}

/// Drives the conversion -> filter -> conversion-back sequence for still
/// frames. The selection is read once per submission; changing it never
/// affects a frame already in flight.
pub struct FilterPipeline {
    bridge: FrameBridge,
    filter: Mutex<FilterSelection>,
    classifier: ClassifierState,
}

impl FilterPipeline {
    /// The classifier load happens here, once. A missing or empty model file
    /// is a valid "no detector" state, not an error; none of the implemented
    /// filters need the detector.
    pub fn new(bridge: FrameBridge, cascade_path: &Path) -> FilterPipeline {
        let classifier = load_classifier(&bridge, cascade_path);

        FilterPipeline {
            bridge,
            filter: Mutex::new(FilterSelection::None),
            classifier,
        }
    }

    pub fn set_filter(&self, filter: FilterSelection) {
        *self.filter.lock().unwrap() = filter;
    }

    pub fn current_filter(&self) -> FilterSelection {
        *self.filter.lock().unwrap()
    }

    pub fn classifier_state(&self) -> ClassifierState {
        self.classifier
    }

    /// The preview path talks to the bridge directly; expose it so hosts do
    /// not need a second backend instance.
    pub fn bridge(&self) -> &FrameBridge {
        &self.bridge
    }

    /// Applies the selected filter to a still frame. The result is a new
    /// RGBA frame of the input's size; on any failure in the sequence the
    /// original frame is handed back untouched.
    pub fn process_image(&self, bitmap: Bitmap) -> Bitmap {
        match self.try_process(&bitmap) {
            Ok(processed) => processed,
            Err(e) => {
                log::error!("Image processing failed, returning original frame: {e}");
                bitmap
            }
        }
    }

    fn try_process(&self, bitmap: &Bitmap) -> anyhow::Result<Bitmap> {
        // An invalid rgba handle is not checked here; the grayscale step is
        // the first point that can observe it.
        let rgba = MatGuard::new(&self.bridge, self.bridge.bitmap_to_mat(bitmap));
        let gray = MatGuard::new(&self.bridge, self.bridge.grayscale(rgba.handle()));
        ensure!(gray.handle().is_valid(), "Grayscale conversion failed");

        let edges = match self.current_filter() {
            FilterSelection::EdgeDetection => {
                let edges = MatGuard::new(&self.bridge, self.bridge.apply_canny(gray.handle()));
                ensure!(edges.handle().is_valid(), "Edge detection failed");
                Some(edges)
            }
            FilterSelection::None | FilterSelection::Grayscale => None,
        };
        let filtered = edges.as_ref().map_or(gray.handle(), |e| e.handle());

        // The expansion back into the rgba mat only happens while the filter
        // output still has the grayscale element type; any other type leaves
        // the rgba mat holding whatever was last written into it and the
        // output below is built from that.
        if let (Some(filtered_type), Some(gray_type)) =
            (self.bridge.mat_type(filtered), self.bridge.mat_type(gray.handle()))
        {
            if filtered_type == gray_type {
                ensure!(
                    self.bridge.expand_gray(filtered, rgba.handle()),
                    "Grayscale expansion failed"
                );
            }
        }

        let (cols, rows) = match self.bridge.mat_size(rgba.handle()) {
            Some(size) => size,
            None => bail!("Output mat size unavailable"),
        };
        let mut processed = Bitmap::new(cols, rows, PixelFormat::Rgba8888);
        ensure!(
            self.bridge.mat_to_bitmap(rgba.handle(), &mut processed),
            "Mat to bitmap conversion failed"
        );

        Ok(processed)
    }

    /// Reserved for native-resource teardown at disposal time. Safe to call
    /// any number of times in any state.
    pub fn release(&self) {}
}

fn load_classifier(bridge: &FrameBridge, cascade_path: &Path) -> ClassifierState {
    match fs::metadata(cascade_path) {
        Ok(meta) if meta.len() > 0 => {}
        _ => {
            log::debug!("No cascade model at {}, detector stays unloaded", cascade_path.display());
            return ClassifierState::Unloaded;
        }
    }

    if bridge.load_classifier(cascade_path) {
        ClassifierState::Loaded
    } else {
        ClassifierState::LoadFailed
    }
}

/// Scoped handle ownership: releases through the bridge exactly once when
/// dropped, so every exit path of a processing sequence cleans up. Wrapping
/// an invalid handle is fine; its release is a no-op.
struct MatGuard<'a> {
    bridge: &'a FrameBridge,
    handle: MatHandle,
}

impl<'a> MatGuard<'a> {
    fn new(bridge: &'a FrameBridge, handle: MatHandle) -> MatGuard<'a> {
        MatGuard { bridge, handle }
    }

    fn handle(&self) -> MatHandle {
        self.handle
    }
}

impl Drop for MatGuard<'_> {
    fn drop(&mut self) {
        self.bridge.release_mat(self.handle);
    }
}
