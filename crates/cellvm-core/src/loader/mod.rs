pub mod loader;

pub use loader::{sample_image, ImageLoader, ProgramImage, Segment, IMAGE_MAGIC};
