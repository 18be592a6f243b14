pub mod pattern;

pub use pattern::{extract_extension_id, normalize_path, split_path, Pattern, Segment};
