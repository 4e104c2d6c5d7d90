#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{bail, ensure};
use camera_filter::{FilterPipeline, FrameBridge};
use vision::{Bitmap, MatHandle, PixelFormat, VisionBackend};

pub const TYPE_GRAY: i32 = 0;
pub const TYPE_RGBA: i32 = 24;
pub const TYPE_FLOAT: i32 = 5;

pub struct FakeMat {
    pub cols: i32,
    pub rows: i32,
    pub typ: i32,
}

/// Per-operation failure switches for the mock backend.
#[derive(Clone, Default)]
pub struct MockConfig {
    pub fail_photo: bool,
    pub fail_preview: bool,
    pub fail_bitmap_to_mat: bool,
    pub fail_mat_to_bitmap: bool,
    pub fail_grayscale: bool,
    pub fail_edge_detect: bool,
    pub fail_expand: bool,
    pub fail_classifier: bool,
    /// Element type the fake edge mat reports; defaults to the grayscale type.
    pub edge_output_type: Option<i32>,
}

impl MockConfig {
    pub fn all_failing() -> MockConfig {
        MockConfig {
            fail_photo: true,
            fail_preview: true,
            fail_bitmap_to_mat: true,
            fail_mat_to_bitmap: true,
            fail_grayscale: true,
            fail_edge_detect: true,
            fail_expand: true,
            fail_classifier: true,
            edge_output_type: None,
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub mats: HashMap<u64, FakeMat>,
    pub next_handle: u64,
    pub grayscale_calls: usize,
    pub edge_calls: usize,
    pub expand_calls: usize,
    pub canny_thresholds: Vec<(f64, f64)>,
    pub released: Vec<u64>,
    pub classifier_loaded: bool,
}

pub type SharedState = Arc<Mutex<MockState>>;

/// In-memory stand-in for the native vision layer: mats are bare
/// (cols, rows, type) records and every call is counted, so tests can assert
/// the exact sequence and the handle bookkeeping.
pub struct MockBackend {
    config: MockConfig,
    state: SharedState,
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> MockBackend {
        MockBackend {
            config,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    fn register(&self, mat: FakeMat) -> MatHandle {
        let mut state = self.state.lock().unwrap();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.mats.insert(handle, mat);
        MatHandle(handle)
    }

    fn mat(&self, handle: MatHandle) -> anyhow::Result<(i32, i32, i32)> {
        let state = self.state.lock().unwrap();
        match state.mats.get(&handle.0) {
            Some(mat) => Ok((mat.cols, mat.rows, mat.typ)),
            None => bail!("unknown mat handle {}", handle.0),
        }
    }
}

impl VisionBackend for MockBackend {
    fn process_photo_frame(&self, bitmap: &Bitmap) -> anyhow::Result<Bitmap> {
        ensure!(!self.config.fail_photo, "photo processing disabled");
        Ok(Bitmap::new(bitmap.width, bitmap.height, PixelFormat::Rgba8888))
    }

    fn process_preview_frame(&self, buffer: &[u8], width: i32, height: i32) -> anyhow::Result<Vec<u8>> {
        ensure!(!self.config.fail_preview, "preview processing disabled");
        ensure!(width > 0 && height > 0, "bad preview dimensions");
        let expected = width as usize * height as usize * 3 / 2;
        ensure!(buffer.len() >= expected, "short preview buffer");
        Ok(vec![0; (width * height) as usize])
    }

    fn bitmap_to_mat(&self, bitmap: &Bitmap) -> anyhow::Result<MatHandle> {
        ensure!(!self.config.fail_bitmap_to_mat, "bitmap conversion disabled");
        let typ = match bitmap.format {
            PixelFormat::Rgba8888 => TYPE_RGBA,
            PixelFormat::Gray8 => TYPE_GRAY,
        };
        Ok(self.register(FakeMat {
            cols: bitmap.width,
            rows: bitmap.height,
            typ,
        }))
    }

    fn mat_to_bitmap(&self, handle: MatHandle, out: &mut Bitmap) -> anyhow::Result<()> {
        ensure!(!self.config.fail_mat_to_bitmap, "bitmap writeback disabled");
        let (cols, rows, _) = self.mat(handle)?;
        ensure!(cols == out.width && rows == out.height, "size mismatch");
        out.data.fill(7);
        Ok(())
    }

    fn grayscale(&self, src: MatHandle) -> anyhow::Result<MatHandle> {
        self.state.lock().unwrap().grayscale_calls += 1;
        ensure!(!self.config.fail_grayscale, "grayscale disabled");
        let (cols, rows, _) = self.mat(src)?;
        Ok(self.register(FakeMat {
            cols,
            rows,
            typ: TYPE_GRAY,
        }))
    }

    fn edge_detect(&self, src: MatHandle, low_threshold: f64, high_threshold: f64) -> anyhow::Result<MatHandle> {
        {
            let mut state = self.state.lock().unwrap();
            state.edge_calls += 1;
            state.canny_thresholds.push((low_threshold, high_threshold));
        }
        ensure!(!self.config.fail_edge_detect, "edge detection disabled");
        let (cols, rows, _) = self.mat(src)?;
        let typ = self.config.edge_output_type.unwrap_or(TYPE_GRAY);
        Ok(self.register(FakeMat { cols, rows, typ }))
    }

    fn expand_gray(&self, src: MatHandle, dst: MatHandle) -> anyhow::Result<()> {
        self.state.lock().unwrap().expand_calls += 1;
        ensure!(!self.config.fail_expand, "expansion disabled");
        self.mat(src)?;
        self.mat(dst)?;
        if let Some(mat) = self.state.lock().unwrap().mats.get_mut(&dst.0) {
            mat.typ = TYPE_RGBA;
        }
        Ok(())
    }

    fn mat_type(&self, handle: MatHandle) -> anyhow::Result<i32> {
        Ok(self.mat(handle)?.2)
    }

    fn mat_size(&self, handle: MatHandle) -> anyhow::Result<(i32, i32)> {
        let (cols, rows, _) = self.mat(handle)?;
        Ok((cols, rows))
    }

    fn load_classifier(&self, _path: &Path) -> anyhow::Result<()> {
        ensure!(!self.config.fail_classifier, "classifier loading disabled");
        self.state.lock().unwrap().classifier_loaded = true;
        Ok(())
    }

    fn classifier_loaded(&self) -> bool {
        self.state.lock().unwrap().classifier_loaded
    }

    fn release_mat(&self, handle: MatHandle) {
        let mut state = self.state.lock().unwrap();
        state.released.push(handle.0);
        state.mats.remove(&handle.0);
    }
}

pub fn rgba_bitmap(width: i32, height: i32) -> Bitmap {
    let data = vec![3; (width * height * 4) as usize];
    Bitmap::from_raw(width, height, PixelFormat::Rgba8888, data).expect("valid test bitmap")
}

pub fn bridge_with(config: MockConfig) -> (FrameBridge, SharedState) {
    let backend = MockBackend::with_config(config);
    let state = backend.state();
    (FrameBridge::new(Box::new(backend)), state)
}

pub fn pipeline_with(config: MockConfig) -> (FilterPipeline, SharedState) {
    pipeline_with_cascade(config, Path::new("/nonexistent/cascade.xml"))
}

pub fn pipeline_with_cascade(config: MockConfig, cascade_path: &Path) -> (FilterPipeline, SharedState) {
    let (bridge, state) = bridge_with(config);
    (FilterPipeline::new(bridge, cascade_path), state)
}
