pub mod conf;
mod error;
pub mod input_format;
pub mod io;
pub mod locality;
pub mod logging;
pub mod split;
pub mod topology;

// Re-exports:
pub use conf::{config, JobConf};
pub use error::*;
pub use input_format::{DefaultPolicy, FileInputFormat, InputFormat, NonSplittable, SplitPolicy};
pub use io::{
    BlockLocation, FileStatus, FileSystem, InMemoryFileSystem, LocalFileSystem, PathFilter,
};
pub use split::{FileSplit, InputSplit, Split};
