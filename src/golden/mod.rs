pub mod component;
pub mod expect;
pub mod library;
pub mod types;

pub use component::{ComponentGroup, ComponentLibrary, ComponentTest, DEFAULT_VARIANT};
pub use expect::{ActionPattern, Expectation, Matcher};
pub use library::{PLAYGROUND_START_PATH, PLAYGROUND_TASK, TrajectoryLibrary};
pub use types::{CheckpointKind, EndToEndSpec, GoldenCheckpoint, GoldenTest, LibraryError, LibraryResult};
