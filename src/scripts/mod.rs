pub mod rebuild_index;

pub use rebuild_index::{rebuild_index, RebuildStats};
