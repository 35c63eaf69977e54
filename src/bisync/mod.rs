// Bidirectional synchronization
//
// Last-write-wins resolution for paths that differ on both sides.

pub mod resolver;

pub use resolver::{resolve, ConflictRecord, Resolution, Side};
