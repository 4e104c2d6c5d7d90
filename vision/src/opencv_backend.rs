use std::{collections::HashMap, path::Path, sync::Mutex};

use anyhow::bail;
use opencv::{
    core::{Mat, Vec4b, CV_8UC1, CV_8UC4},
    imgproc::{
        canny_def, cvt_color_def, gaussian_blur_def, COLOR_GRAY2RGBA, COLOR_RGBA2GRAY,
        COLOR_YUV2GRAY_NV21,
    },
    objdetect::CascadeClassifier,
    prelude::*,
};

use crate::{
    backend::{MatHandle, VisionBackend},
    frame::{Bitmap, PixelFormat},
};

/// Backend over the OpenCV bindings. Matrices live in a registry keyed by
/// handle so their lifetime stays explicit on the caller's side; handle 0 is
/// never allocated.
pub struct OpencvBackend {
    registry: Mutex<MatRegistry>,
    classifier: Mutex<Option<CascadeClassifier>>,
}

struct MatRegistry {
    mats: HashMap<u64, Mat>,
    next_handle: u64,
}

impl OpencvBackend {
    pub fn new() -> OpencvBackend {
        OpencvBackend {
            registry: Mutex::new(MatRegistry {
                mats: HashMap::new(),
                next_handle: 1,
            }),
            classifier: Mutex::new(None),
        }
    }

    fn register(&self, mat: Mat) -> MatHandle {
        let mut registry = self.registry.lock().unwrap();
        let handle = registry.next_handle;
        registry.next_handle += 1;
        registry.mats.insert(handle, mat);

        MatHandle(handle)
    }

    fn mat(&self, handle: MatHandle) -> anyhow::Result<Mat> {
        let registry = self.registry.lock().unwrap();
        match registry.mats.get(&handle.0) {
            Some(mat) => Ok(mat.clone()),
            None => bail!("Unknown mat handle {}", handle.0),
        }
    }
}

impl VisionBackend for OpencvBackend {
    fn process_photo_frame(&self, bitmap: &Bitmap) -> anyhow::Result<Bitmap> {
        let input = mat_from_bitmap(bitmap)?;

        let mut gray = Mat::default();
        match input.typ() {
            CV_8UC1 => {
                gray = input.clone();
            }
            CV_8UC4 => {
                cvt_color_def(&input, &mut gray, COLOR_RGBA2GRAY)?;
            }
            _ => {
                bail!("Photo frame of unsupported mat type {}", input.typ());
            }
        }

        let mut output = Mat::default();
        cvt_color_def(&gray, &mut output, COLOR_GRAY2RGBA)?;

        rgba_bitmap_from_mat(&output)
    }

    fn process_preview_frame(&self, buffer: &[u8], width: i32, height: i32) -> anyhow::Result<Vec<u8>> {
        if width <= 0 || height <= 0 {
            bail!("Invalid preview dimensions {width}x{height}");
        }
        let rows = height + height / 2;
        let expected = rows as usize * width as usize;
        if buffer.len() < expected {
            bail!("Preview buffer of {} bytes is too short for {width}x{height} NV21 (expected {expected})", buffer.len());
        }

        let yuv = Mat::new_rows_cols_with_data(rows, width, &buffer[..expected])?.clone_pointee();
        let mut gray = Mat::default();
        cvt_color_def(&yuv, &mut gray, COLOR_YUV2GRAY_NV21)?;

        Ok(gray.data_bytes()?.to_vec())
    }

    fn bitmap_to_mat(&self, bitmap: &Bitmap) -> anyhow::Result<MatHandle> {
        let mat = mat_from_bitmap(bitmap)?;

        Ok(self.register(mat))
    }

    fn mat_to_bitmap(&self, handle: MatHandle, out: &mut Bitmap) -> anyhow::Result<()> {
        let mat = self.mat(handle)?;
        if mat.cols() != out.width || mat.rows() != out.height {
            bail!(
                "Mat of {}x{} does not match output bitmap of {}x{}",
                mat.cols(), mat.rows(), out.width, out.height
            );
        }

        let expanded;
        let pixels: &[u8] = match (mat.typ(), out.format) {
            (CV_8UC4, PixelFormat::Rgba8888) | (CV_8UC1, PixelFormat::Gray8) => mat.data_bytes()?,
            (CV_8UC1, PixelFormat::Rgba8888) => {
                let mut converted = Mat::default();
                cvt_color_def(&mat, &mut converted, COLOR_GRAY2RGBA)?;
                expanded = converted;
                expanded.data_bytes()?
            }
            (typ, format) => bail!("Unsupported mat type {typ} for bitmap format {format:?}"),
        };
        if pixels.len() != out.data.len() {
            bail!("Mat data of {} bytes does not fit a bitmap buffer of {}", pixels.len(), out.data.len());
        }
        out.data.copy_from_slice(pixels);

        Ok(())
    }

    fn grayscale(&self, src: MatHandle) -> anyhow::Result<MatHandle> {
        let src_mat = self.mat(src)?;
        let mut gray = Mat::default();
        cvt_color_def(&src_mat, &mut gray, COLOR_RGBA2GRAY)?;

        Ok(self.register(gray))
    }

    fn edge_detect(&self, src: MatHandle, low_threshold: f64, high_threshold: f64) -> anyhow::Result<MatHandle> {
        let src_mat = self.mat(src)?;

        let mut blurred = Mat::default();
        gaussian_blur_def(&src_mat, &mut blurred, (5, 5).into(), 1.5)?;
        let mut edges = Mat::default();
        canny_def(&blurred, &mut edges, low_threshold, high_threshold)?;

        Ok(self.register(edges))
    }

    fn expand_gray(&self, src: MatHandle, dst: MatHandle) -> anyhow::Result<()> {
        let src_mat = self.mat(src)?;
        let mut expanded = Mat::default();
        cvt_color_def(&src_mat, &mut expanded, COLOR_GRAY2RGBA)?;

        let mut registry = self.registry.lock().unwrap();
        match registry.mats.get_mut(&dst.0) {
            Some(slot) => {
                *slot = expanded;
                Ok(())
            }
            None => bail!("Unknown mat handle {}", dst.0),
        }
    }

    fn mat_type(&self, handle: MatHandle) -> anyhow::Result<i32> {
        let registry = self.registry.lock().unwrap();
        match registry.mats.get(&handle.0) {
            Some(mat) => Ok(mat.typ()),
            None => bail!("Unknown mat handle {}", handle.0),
        }
    }

    fn mat_size(&self, handle: MatHandle) -> anyhow::Result<(i32, i32)> {
        let registry = self.registry.lock().unwrap();
        match registry.mats.get(&handle.0) {
            Some(mat) => Ok((mat.cols(), mat.rows())),
            None => bail!("Unknown mat handle {}", handle.0),
        }
    }

    fn load_classifier(&self, path: &Path) -> anyhow::Result<()> {
        let path = match path.to_str() {
            Some(path) => path,
            None => bail!("Cascade path {} is not valid UTF-8", path.display()),
        };
        let cascade = CascadeClassifier::new(path)?;
        if cascade.empty()? {
            bail!("Cascade model at {path} loaded empty");
        }
        log::debug!("Loaded cascade model from {path}");
        *self.classifier.lock().unwrap() = Some(cascade);

        Ok(())
    }

    fn classifier_loaded(&self) -> bool {
        self.classifier.lock().unwrap().is_some()
    }

    fn release_mat(&self, handle: MatHandle) {
        self.registry.lock().unwrap().mats.remove(&handle.0);
    }
}

fn mat_from_bitmap(bitmap: &Bitmap) -> anyhow::Result<Mat> {
    let mat = match bitmap.format {
        PixelFormat::Rgba8888 => {
            let pixels = bitmap
                .data
                .chunks_exact(4)
                .map(|p| Vec4b::from_array([p[0], p[1], p[2], p[3]]))
                .collect::<Vec<_>>();
            Mat::new_rows_cols_with_data(bitmap.height, bitmap.width, pixels.as_slice())?.clone_pointee()
        }
        PixelFormat::Gray8 => {
            Mat::new_rows_cols_with_data(bitmap.height, bitmap.width, bitmap.data.as_slice())?.clone_pointee()
        }
    };

    Ok(mat)
}

fn rgba_bitmap_from_mat(mat: &Mat) -> anyhow::Result<Bitmap> {
    Bitmap::from_raw(mat.cols(), mat.rows(), PixelFormat::Rgba8888, mat.data_bytes()?.to_vec())
}
