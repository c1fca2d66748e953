//! Utility functions for the recognition path.
//!
//! Image loading from disk or upload bytes, and the character error rate used
//! to score predictions against labels.

pub mod image;
pub mod metrics;

pub use image::{dynamic_to_rgb, load_image, load_image_from_memory};
pub use metrics::{character_error_rate, edit_distance};
