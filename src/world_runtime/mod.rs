pub mod runtime;
pub mod streaming;

pub use runtime::SharedWorld;
pub use streaming::{ChunkUpdate, StreamingStats, StreamingWorld};
