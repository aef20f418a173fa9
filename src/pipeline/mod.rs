pub mod annotator;
pub mod compositor;
pub mod filter;

pub use annotator::AnnotationPipeline;
pub use compositor::{covering_rect, Compositor};
pub use filter::RegionFilter;
