//! Turns the input paths of a job into byte-range splits placed on the hosts
//! that hold most of their data.
use std::sync::Arc;

use crate::conf::{config, JobConf};
use crate::error::{Error, Result};
use crate::io::{FileStatus, FileSystem, HiddenFileFilter, MultiPathFilter, PathFilter};
use crate::split::FileSplit;

pub mod generator;
mod planner;
pub mod sizing;

pub use generator::generate_file_splits;
pub use sizing::{compute_goal_size, compute_split_size, SPLIT_SLOP};

/// Something that can describe a job's input as a list of splits.
pub trait InputFormat {
    fn get_splits(&self, job: &JobConf) -> Result<Vec<FileSplit>>;
}

/// Per-format knobs of file splitting.
pub trait SplitPolicy: Send + Sync {
    /// Whether files may be cut at arbitrary offsets. Formats whose records
    /// cannot be found from the middle of a file say no.
    fn is_splitable(&self, _job: &JobConf, _path: &str) -> bool {
        true
    }

    /// Lower bound on split size imposed by the format itself.
    fn format_min_split_size(&self) -> u64 {
        1
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl SplitPolicy for DefaultPolicy {}

/// Every file becomes exactly one split, e.g. for compressed input.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonSplittable;

impl SplitPolicy for NonSplittable {
    fn is_splitable(&self, _job: &JobConf, _path: &str) -> bool {
        false
    }
}

pub struct FileInputFormat<F: FileSystem> {
    fs: F,
    policy: Arc<dyn SplitPolicy>,
}

impl<F: FileSystem> FileInputFormat<F> {
    pub fn new(fs: F) -> Self {
        FileInputFormat {
            fs,
            policy: Arc::new(DefaultPolicy),
        }
    }

    pub fn with_policy<P: SplitPolicy + 'static>(fs: F, policy: P) -> Self {
        FileInputFormat {
            fs,
            policy: Arc::new(policy),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Resolves the job's input paths to the files to read.
    ///
    /// Globs are expanded, a matched directory contributes its direct
    /// children, hidden names (`_x`, `.x`) and anything the job's filter
    /// rejects are dropped. Missing paths and globs matching nothing are all
    /// collected and reported together.
    pub fn list_status(&self, job: &JobConf) -> Result<Vec<FileStatus>> {
        let dirs = job.get_input_paths();
        if dirs.is_empty() {
            return Err(Error::NoInputPaths);
        }

        let mut filters: Vec<Arc<dyn PathFilter>> = vec![Arc::new(HiddenFileFilter)];
        if let Some(job_filter) = job.get_input_path_filter()? {
            filters.push(job_filter);
        }
        let input_filter = MultiPathFilter::new(filters);

        let mut result = Vec::new();
        let mut errors = Vec::new();
        for path in &dirs {
            let matches = match self.fs.glob_status(path, &input_filter) {
                Ok(matches) => matches,
                Err(e) => {
                    log::info!("{}\n{}", path, e);
                    None
                }
            };
            match matches {
                None => errors.push(Error::InputPathNotFound(path.clone())),
                Some(matches) if matches.is_empty() => {
                    errors.push(Error::InputPatternNoMatches(path.clone()))
                }
                Some(matches) => {
                    for status in matches {
                        if status.is_dir {
                            result.extend(self.fs.list_status(&status.path, &input_filter)?);
                        } else {
                            result.push(status);
                        }
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::InvalidInput(errors));
        }
        log::info!("Total input paths to process : {}", result.len());
        Ok(result)
    }

    /// Sums the length of `files`. A leftover partitioning directory is
    /// removed and skipped, any other directory is an error.
    pub fn compute_total_size(
        &self,
        job: &JobConf,
        files: Vec<FileStatus>,
    ) -> Result<(u64, Vec<FileStatus>)> {
        let partitioning_dir = job.get_option(config::PARTITIONING_DIR);
        let mut total_size = 0;
        let mut kept = Vec::with_capacity(files.len());
        for file in files {
            if file.is_dir {
                let name = file.name();
                if name == config::DEFAULT_PARTITIONING_DIR
                    || partitioning_dir.as_deref() == Some(name)
                {
                    log::warn!("Removing already existing partitioning directory {}", file.path);
                    match self.fs.delete(&file.path, true) {
                        Ok(true) => {}
                        Ok(false) => log::error!("Remove of {} failed.", file.path),
                        Err(e) => log::error!("Remove of {} failed: {}", file.path, e),
                    }
                    continue;
                }
                return Err(Error::NotAFile(file.path));
            }
            total_size += file.len;
            kept.push(file);
        }
        Ok((total_size, kept))
    }

    fn plan_file(
        &self,
        job: &JobConf,
        file: &FileStatus,
        min_size: u64,
        max_size: u64,
    ) -> Result<Vec<FileSplit>> {
        let blocks = if file.len == 0 {
            Vec::new()
        } else {
            self.fs.file_block_locations(file, 0, file.len)?
        };
        let split_size = compute_split_size(file.block_size, min_size, max_size);
        let splitable = self.policy.is_splitable(job, &file.path);
        generate_file_splits(file, &blocks, split_size, splitable)
    }
}

impl<F: FileSystem> InputFormat for FileInputFormat<F> {
    /// Splits every input file and numbers the splits in file order. Records
    /// the number of files processed under `atomic.input.files`.
    fn get_splits(&self, job: &JobConf) -> Result<Vec<FileSplit>> {
        let min_size = self.policy.format_min_split_size().max(job.min_split_size());
        let max_size = job.max_split_size();

        let files = self.list_status(job)?;
        let (total_size, files) = self.compute_total_size(job, files)?;
        log::debug!("Total input size: {} bytes", total_size);

        let per_file = planner::plan_in_order(&files, job.planner_threads(), |file| {
            self.plan_file(job, file, min_size, max_size)
        })?;
        let mut splits: Vec<FileSplit> = per_file.into_iter().flatten().collect();
        for (index, split) in splits.iter_mut().enumerate() {
            split.set_index(index);
        }

        job.set_long(config::INPUT_FILES, files.len() as u64);
        log::debug!("Total # of splits: {}", splits.len());
        Ok(splits)
    }
}
