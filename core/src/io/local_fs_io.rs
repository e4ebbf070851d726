//! Lists input files on the local filesystem. Every file is reported as a
//! sequence of fixed-size blocks held by a single `localhost` replica.
use std::fs;
use std::path::{Path, PathBuf};

use crate::conf::{config, JobConf};
use crate::error::Result;
use crate::io::glob::{glob_to_regex, has_glob};
use crate::io::{BlockLocation, FileStatus, FileSystem, PathFilter};
use crate::topology::DEFAULT_RACK;

pub const LOCAL_HOST: &str = "localhost";
pub const DEFAULT_LOCAL_BLOCK_SIZE: u64 = 32 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct LocalFileSystem {
    block_size: u64,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        LocalFileSystem::new(DEFAULT_LOCAL_BLOCK_SIZE)
    }
}

impl LocalFileSystem {
    pub fn new(block_size: u64) -> Self {
        LocalFileSystem {
            block_size: block_size.max(1),
        }
    }

    pub fn from_conf(job: &JobConf) -> Self {
        LocalFileSystem::new(job.get_u64(config::LOCAL_BLOCK_SIZE, DEFAULT_LOCAL_BLOCK_SIZE))
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    fn status(&self, path: &Path) -> Result<FileStatus> {
        let metadata = fs::metadata(path)?;
        Ok(FileStatus {
            path: path.to_string_lossy().into_owned(),
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
            block_size: self.block_size,
            replication: 1,
        })
    }

    /// Expands a glob one path component at a time.
    fn expand(&self, pattern: &Path) -> Result<Vec<PathBuf>> {
        let mut candidates = vec![PathBuf::new()];
        for component in pattern.components() {
            let part = component.as_os_str().to_string_lossy();
            let mut next = Vec::new();
            if has_glob(&part) {
                let matcher = glob_to_regex(&part)?;
                for base in &candidates {
                    let dir = if base.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        base.as_path()
                    };
                    if !dir.is_dir() {
                        continue;
                    }
                    let mut names = Vec::new();
                    for entry in fs::read_dir(dir)? {
                        let entry = entry?;
                        let name = entry.file_name().to_string_lossy().into_owned();
                        if matcher.is_match(&name) {
                            names.push(name);
                        }
                    }
                    names.sort();
                    next.extend(names.into_iter().map(|name| base.join(name)));
                }
            } else {
                for base in &candidates {
                    let joined = base.join(component.as_os_str());
                    if joined.exists() {
                        next.push(joined);
                    }
                }
            }
            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }
        Ok(candidates)
    }
}

/// Accepts plain paths and `file://` URLs.
fn local_path(path: &str) -> PathBuf {
    if path.starts_with("file:") {
        if let Ok(url) = url::Url::parse(path) {
            if let Ok(p) = url.to_file_path() {
                return p;
            }
        }
    }
    PathBuf::from(path)
}

impl FileSystem for LocalFileSystem {
    fn glob_status(
        &self,
        pattern: &str,
        filter: &dyn PathFilter,
    ) -> Result<Option<Vec<FileStatus>>> {
        let path = local_path(pattern);
        if !has_glob(pattern) {
            if !path.exists() {
                return Ok(None);
            }
            let status = self.status(&path)?;
            return Ok(Some(if filter.accept(&status.path) {
                vec![status]
            } else {
                Vec::new()
            }));
        }
        let mut matches = Vec::new();
        for matched in self.expand(&path)? {
            let status = self.status(&matched)?;
            if filter.accept(&status.path) {
                matches.push(status);
            }
        }
        Ok(Some(matches))
    }

    fn list_status(&self, dir: &str, filter: &dyn PathFilter) -> Result<Vec<FileStatus>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(local_path(dir))? {
            paths.push(entry?.path());
        }
        paths.sort();
        let mut result = Vec::with_capacity(paths.len());
        for path in paths {
            let status = self.status(&path)?;
            if filter.accept(&status.path) {
                result.push(status);
            }
        }
        Ok(result)
    }

    fn file_block_locations(
        &self,
        file: &FileStatus,
        start: u64,
        len: u64,
    ) -> Result<Vec<BlockLocation>> {
        let end = start.saturating_add(len).min(file.len);
        let mut blocks = Vec::new();
        let mut offset = (start / self.block_size) * self.block_size;
        while offset < end {
            let length = self.block_size.min(file.len - offset);
            blocks.push(BlockLocation::new(
                offset,
                length,
                vec![LOCAL_HOST.to_string()],
                vec![format!("{}/{}", DEFAULT_RACK, LOCAL_HOST)],
            ));
            offset += length;
        }
        Ok(blocks)
    }

    fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let path = local_path(path);
        if !path.exists() {
            return Ok(false);
        }
        if path.is_dir() {
            if recursive {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_dir(&path)?;
            }
        } else {
            fs::remove_file(&path)?;
        }
        Ok(true)
    }
}
