mod backend;
mod frame;
mod opencv_backend;

pub use backend::{MatHandle, VisionBackend};
pub use frame::{Bitmap, PixelFormat};
pub use opencv_backend::OpencvBackend;
