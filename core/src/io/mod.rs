//! The listing side of input planning: what a filesystem has to tell us about
//! the files of a job and where their blocks live.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod glob;
pub mod in_memory_fs;
pub mod local_fs_io;
pub use in_memory_fs::InMemoryFileSystem;
pub use local_fs_io::LocalFileSystem;

/// One replica group of a contiguous byte range of a file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockLocation {
    pub offset: u64,
    pub length: u64,
    pub hosts: Vec<String>,
    /// `/rack/host` strings, one per replica. May be empty.
    pub topology_paths: Vec<String>,
}

impl BlockLocation {
    pub fn new(offset: u64, length: u64, hosts: Vec<String>, topology_paths: Vec<String>) -> Self {
        BlockLocation {
            offset,
            length,
            hosts,
            topology_paths,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.offset <= offset && offset < self.end()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub len: u64,
    pub is_dir: bool,
    pub block_size: u64,
    pub replication: u16,
}

impl FileStatus {
    /// Final component of the path.
    pub fn name(&self) -> &str {
        path_name(&self.path)
    }
}

pub fn path_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Decides whether a listed path takes part in the job.
pub trait PathFilter: Send + Sync {
    fn accept(&self, path: &str) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accept(&self, path: &str) -> bool {
        self(path)
    }
}

/// Rejects names starting with `_` or `.`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HiddenFileFilter;

impl PathFilter for HiddenFileFilter {
    fn accept(&self, path: &str) -> bool {
        let name = path_name(path);
        !name.starts_with('_') && !name.starts_with('.')
    }
}

/// Accepts a path only if every wrapped filter does.
#[derive(Clone, Default)]
pub struct MultiPathFilter {
    filters: Vec<Arc<dyn PathFilter>>,
}

impl MultiPathFilter {
    pub fn new(filters: Vec<Arc<dyn PathFilter>>) -> Self {
        MultiPathFilter { filters }
    }
}

impl PathFilter for MultiPathFilter {
    fn accept(&self, path: &str) -> bool {
        self.filters.iter().all(|filter| filter.accept(path))
    }
}

/// Accepts paths whose final component matches a regular expression.
#[derive(Clone, Debug)]
pub struct RegexPathFilter {
    pattern: regex::Regex,
}

impl RegexPathFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(RegexPathFilter {
            pattern: regex::Regex::new(pattern)?,
        })
    }
}

impl PathFilter for RegexPathFilter {
    fn accept(&self, path: &str) -> bool {
        self.pattern.is_match(path_name(path))
    }
}

/// The external listing service. Every call may block.
pub trait FileSystem: Send + Sync {
    /// Expands `pattern`, keeping entries the filter accepts. `None` means a
    /// literal path that does not exist; an empty list means a glob that
    /// matched nothing.
    fn glob_status(
        &self,
        pattern: &str,
        filter: &dyn PathFilter,
    ) -> Result<Option<Vec<FileStatus>>>;

    /// Direct children of a directory that the filter accepts.
    fn list_status(&self, dir: &str, filter: &dyn PathFilter) -> Result<Vec<FileStatus>>;

    /// Blocks overlapping `[start, start + len)`, ordered by offset.
    fn file_block_locations(
        &self,
        file: &FileStatus,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>>;

    /// Returns false when nothing was removed.
    fn delete(&self, path: &str, recursive: bool) -> Result<bool>;
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn glob_status(
        &self,
        pattern: &str,
        filter: &dyn PathFilter,
    ) -> Result<Option<Vec<FileStatus>>> {
        (**self).glob_status(pattern, filter)
    }

    fn list_status(&self, dir: &str, filter: &dyn PathFilter) -> Result<Vec<FileStatus>> {
        (**self).list_status(dir, filter)
    }

    fn file_block_locations(
        &self,
        file: &FileStatus,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>> {
        (**self).file_block_locations(file, start, len)
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        (**self).delete(path, recursive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_file_filter() {
        let filter = HiddenFileFilter;
        assert!(filter.accept("/data/part-00000"));
        assert!(!filter.accept("/data/_SUCCESS"));
        assert!(!filter.accept("/data/.part-00000.crc"));
        assert!(filter.accept("/data/_tmp/part-1"));
    }

    #[test]
    fn test_multi_path_filter_requires_all() {
        let only_csv = |p: &str| p.ends_with(".csv");
        let filters: Vec<Arc<dyn PathFilter>> =
            vec![Arc::new(HiddenFileFilter), Arc::new(only_csv)];
        let filter = MultiPathFilter::new(filters);
        assert!(filter.accept("/in/a.csv"));
        assert!(!filter.accept("/in/.a.csv"));
        assert!(!filter.accept("/in/a.txt"));
    }

    #[test]
    fn test_regex_filter_matches_name_only() {
        let filter = RegexPathFilter::new("^part-[0-9]+$").unwrap();
        assert!(filter.accept("/jobs/part-0001"));
        assert!(!filter.accept("/part-0001/other"));
    }

    #[test]
    fn test_block_contains_is_half_open() {
        let block = BlockLocation::new(100, 50, vec![], vec![]);
        assert!(!block.contains(99));
        assert!(block.contains(100));
        assert!(block.contains(149));
        assert!(!block.contains(150));
        assert_eq!(path_name("/a/b/"), "b");
        assert_eq!(path_name("plain"), "plain");
    }
}
