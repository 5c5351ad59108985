mod blend_cache;
mod blender;
mod border;
mod chunk;
mod heightmap;
mod jitter;
mod packed;
mod persist;

pub use blend_cache::*;
pub use blender::*;
pub use border::*;
pub use chunk::*;
pub use heightmap::*;
pub use jitter::*;
pub use packed::*;
pub use persist::*;
