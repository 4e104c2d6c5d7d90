mod bridge;
mod pipeline;

pub use bridge::{FrameBridge, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
pub use pipeline::{ClassifierState, FilterPipeline, FilterSelection};
