#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod block;
pub mod coords;
pub mod error;

// Re-export commonly used types
pub use block::{BiomeId, BlockId};
pub use coords::{BlockPos, ChunkPos};
pub use error::DecodeError;
