pub mod image_ops;
pub mod metrics;

// Re-export commonly used items
pub use image_ops::{
    decode_image, decode_image_async, encode_jpeg, encode_jpeg_async, encode_png, normalize_rgb,
};
pub use metrics::{Metrics, MetricsSnapshot};
