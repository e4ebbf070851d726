//! A filesystem held entirely in memory, with block placement spelled out by
//! the caller. Used to describe a cluster without running one.
use std::collections::{BTreeMap, HashSet};
use std::io;

use parking_lot::RwLock;

use crate::error::Result;
use crate::io::glob::{glob_to_regex, has_glob};
use crate::io::{BlockLocation, FileStatus, FileSystem, PathFilter};
use crate::topology::strip_port;

#[derive(Clone, Debug)]
enum Entry {
    Dir,
    File {
        len: u64,
        block_size: u64,
        blocks: Vec<BlockLocation>,
    },
}

#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    entries: RwLock<BTreeMap<String, Entry>>,
    broken_patterns: RwLock<HashSet<String>>,
    undeletable: RwLock<HashSet<String>>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

fn parent(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(i) => Some(&path[..i]),
    }
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str) -> &Self {
        let path = normalize(path);
        self.add_parents(&path);
        self.entries.write().insert(path, Entry::Dir);
        self
    }

    fn add_parents(&self, path: &str) {
        let mut entries = self.entries.write();
        let mut current = parent(path);
        while let Some(dir) = current {
            if dir != "/" {
                entries.entry(dir.to_string()).or_insert(Entry::Dir);
            }
            current = parent(dir);
        }
    }

    /// Adds a file with explicit block locations.
    pub fn add_file(
        &self,
        path: &str,
        len: u64,
        block_size: u64,
        blocks: Vec<BlockLocation>,
    ) -> &Self {
        let path = normalize(path);
        self.add_parents(&path);
        self.entries.write().insert(
            path,
            Entry::File {
                len,
                block_size,
                blocks,
            },
        );
        self
    }

    /// Adds a file cut into `block_size` blocks. Block `i` is stored on the
    /// topology paths in `placements[i % placements.len()]`.
    pub fn add_placed_file(
        &self,
        path: &str,
        len: u64,
        block_size: u64,
        placements: &[Vec<&str>],
    ) -> &Self {
        let mut blocks = Vec::new();
        let mut offset = 0;
        let mut i = 0;
        while offset < len {
            let length = block_size.min(len - offset);
            let topology: Vec<String> = if placements.is_empty() {
                Vec::new()
            } else {
                placements[i % placements.len()].iter().map(|p| p.to_string()).collect()
            };
            let hosts = topology
                .iter()
                .map(|p| strip_port(p.rsplit('/').next().unwrap_or(p.as_str())).to_string())
                .collect();
            blocks.push(BlockLocation::new(offset, length, hosts, topology));
            offset += length;
            i += 1;
        }
        self.add_file(path, len, block_size, blocks)
    }

    /// Makes `glob_status` fail for this exact pattern.
    pub fn break_pattern(&self, pattern: &str) -> &Self {
        self.broken_patterns.write().insert(pattern.to_string());
        self
    }

    /// Makes `delete` refuse to remove this path.
    pub fn protect(&self, path: &str) -> &Self {
        self.undeletable.write().insert(normalize(path));
        self
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.read().contains_key(&normalize(path))
    }

    fn status(path: &str, entry: &Entry) -> FileStatus {
        match entry {
            Entry::Dir => FileStatus {
                path: path.to_string(),
                len: 0,
                is_dir: true,
                block_size: 0,
                replication: 0,
            },
            Entry::File {
                len,
                block_size,
                blocks,
            } => FileStatus {
                path: path.to_string(),
                len: *len,
                is_dir: false,
                block_size: *block_size,
                replication: blocks.first().map_or(0, |b| b.hosts.len() as u16),
            },
        }
    }
}

impl FileSystem for InMemoryFileSystem {
    fn glob_status(
        &self,
        pattern: &str,
        filter: &dyn PathFilter,
    ) -> Result<Option<Vec<FileStatus>>> {
        if self.broken_patterns.read().contains(pattern) {
            let message = format!("cannot glob {}", pattern);
            return Err(io::Error::new(io::ErrorKind::Other, message).into());
        }
        let pattern = normalize(pattern);
        let entries = self.entries.read();
        if !has_glob(&pattern) {
            return Ok(entries.get(&pattern).map(|entry| {
                let status = Self::status(&pattern, entry);
                if filter.accept(&status.path) {
                    vec![status]
                } else {
                    Vec::new()
                }
            }));
        }
        let matchers = components(&pattern)
            .into_iter()
            .map(glob_to_regex)
            .collect::<Result<Vec<_>>>()?;
        let matches = entries
            .iter()
            .filter(|(path, _)| {
                let parts = components(path);
                parts.len() == matchers.len()
                    && parts.iter().zip(&matchers).all(|(part, re)| re.is_match(part))
            })
            .map(|(path, entry)| Self::status(path, entry))
            .filter(|status| filter.accept(&status.path))
            .collect();
        Ok(Some(matches))
    }

    fn list_status(&self, dir: &str, filter: &dyn PathFilter) -> Result<Vec<FileStatus>> {
        let dir = normalize(dir);
        let entries = self.entries.read();
        if dir != "/" && !matches!(entries.get(&dir), Some(Entry::Dir)) {
            let message = format!("{} is not a directory", dir);
            return Err(io::Error::new(io::ErrorKind::NotFound, message).into());
        }
        Ok(entries
            .iter()
            .filter(|(path, _)| parent(path) == Some(dir.as_str()))
            .map(|(path, entry)| Self::status(path, entry))
            .filter(|status| filter.accept(&status.path))
            .collect())
    }

    fn file_block_locations(
        &self,
        file: &FileStatus,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>> {
        let entries = self.entries.read();
        match entries.get(&normalize(&file.path)) {
            Some(Entry::File { blocks, .. }) => {
                let end = start.saturating_add(len);
                Ok(blocks
                    .iter()
                    .filter(|b| b.offset < end && start < b.end().max(b.offset + 1))
                    .cloned()
                    .collect())
            }
            _ => {
                let message = format!("{} is not a file", file.path);
                Err(io::Error::new(io::ErrorKind::NotFound, message).into())
            }
        }
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let path = normalize(path);
        if self.undeletable.read().contains(&path) {
            return Ok(false);
        }
        let mut entries = self.entries.write();
        if !entries.contains_key(&path) {
            return Ok(false);
        }
        let prefix = format!("{}/", path);
        let children: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        if !children.is_empty() && !recursive {
            let message = format!("{} is not empty", path);
            return Err(io::Error::new(io::ErrorKind::Other, message).into());
        }
        for child in children {
            entries.remove(&child);
        }
        entries.remove(&path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::HiddenFileFilter;

    fn cluster() -> InMemoryFileSystem {
        let fs = InMemoryFileSystem::new();
        fs.add_placed_file("/in/a", 25, 10, &[vec!["/r1/h1:1004", "/r2/h2"]])
            .add_placed_file("/in/b", 5, 10, &[])
            .add_placed_file("/in/_logs/x", 1, 10, &[])
            .add_dir("/empty");
        fs
    }

    #[test]
    fn test_placed_file_blocks() {
        let fs = cluster();
        let status = fs.glob_status("/in/a", &HiddenFileFilter).unwrap().unwrap().remove(0);
        assert_eq!(status.replication, 2);
        let blocks = fs.file_block_locations(&status, 0, status.len).unwrap();
        let ranges: Vec<_> = blocks.iter().map(|b| (b.offset, b.length)).collect();
        assert_eq!(ranges, vec![(0, 10), (10, 10), (20, 5)]);
        assert_eq!(blocks[0].hosts, vec!["h1", "h2"]);
    }

    #[test]
    fn test_glob_and_list() {
        let fs = cluster();
        let all = fs.glob_status("/in/*", &HiddenFileFilter).unwrap().unwrap();
        let paths: Vec<_> = all.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["/in/a", "/in/b"]);
        assert_eq!(fs.glob_status("/nope", &HiddenFileFilter).unwrap(), None);
        assert_eq!(fs.glob_status("/nope/*", &HiddenFileFilter).unwrap(), Some(vec![]));

        let listed = fs.list_status("/", &HiddenFileFilter).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.is_dir));

        fs.break_pattern("/in/*");
        assert!(fs.glob_status("/in/*", &HiddenFileFilter).is_err());
    }

    #[test]
    fn test_delete() {
        let fs = cluster();
        assert!(fs.delete("/in/a", false).unwrap());
        assert!(!fs.exists("/in/a"));
        assert!(fs.delete("/in", false).is_err());
        fs.protect("/in");
        assert!(!fs.delete("/in", true).unwrap());
        assert!(fs.delete("/empty", true).unwrap());
    }
}
