use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::io::glob::{escape_path, split_escaped, split_path_strings, unescape_path};
use crate::io::{PathFilter, RegexPathFilter};

pub mod config {
    /// Comma separated, escaped list of input paths.
    pub const INPUT_DIR: &str = "atomic.input.dir";
    pub const MIN_SPLIT_SIZE: &str = "atomic.min.split.size";
    /// Accepted and stored, but split sizing does not clamp to it.
    pub const MAX_SPLIT_SIZE: &str = "atomic.max.split.size";
    pub const INPUT_PATH_FILTER_REGEX: &str = "atomic.input.pathFilter.regex";
    /// Extra name under which a leftover partitioning directory is recognised.
    pub const PARTITIONING_DIR: &str = "atomic.partitioning.dir";
    /// Written by split planning: number of input files processed.
    pub const INPUT_FILES: &str = "atomic.input.files";
    pub const WORKING_DIR: &str = "atomic.working.dir";
    pub const PLANNER_THREADS: &str = "atomic.input.planner.threads";
    pub const LOCAL_BLOCK_SIZE: &str = "atomic.local.block.size";

    pub const DEFAULT_PARTITIONING_DIR: &str = "atomic-partitions";
    pub const ENV_PREFIX: &str = "ATOMIC_";
}

/// Overrides read from `ATOMIC_*` environment variables.
#[derive(Debug, Default, Deserialize)]
struct EnvConfig {
    input_dir: Option<String>,
    min_split_size: Option<u64>,
    max_split_size: Option<u64>,
    planner_threads: Option<usize>,
    working_dir: Option<String>,
}

/// Settings of one job. Setters take `&self` so planning can record its
/// results on a shared configuration.
#[derive(Default)]
pub struct JobConf {
    settings: RwLock<HashMap<String, String>>,
    path_filter: RwLock<Option<Arc<dyn PathFilter>>>,
}

impl std::fmt::Debug for JobConf {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("JobConf")
            .field("settings", &*self.settings.read())
            .field("path_filter", &self.path_filter.read().is_some())
            .finish()
    }
}

impl Clone for JobConf {
    fn clone(&self) -> Self {
        JobConf {
            settings: RwLock::new(self.settings.read().clone()),
            path_filter: RwLock::new(self.path_filter.read().clone()),
        }
    }
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a TOML document. Nested tables are flattened into dotted keys,
    /// so `[atomic.min.split]` with `size = 1` and `"atomic.min.split.size" = 1`
    /// mean the same thing.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(input)?;
        let conf = JobConf::new();
        flatten_into(&conf, "", &toml::Value::Table(table))?;
        Ok(conf)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Overlays `ATOMIC_*` environment variables on top of the current settings.
    pub fn load_from_env(&self) -> Result<&Self> {
        let env: EnvConfig = envy::prefixed(config::ENV_PREFIX).from_env()?;
        self.apply_env(env);
        Ok(self)
    }

    fn apply_env(&self, env: EnvConfig) {
        if let Some(dirs) = env.input_dir {
            self.set_input_paths_str(&dirs);
        }
        if let Some(min) = env.min_split_size {
            self.set_long(config::MIN_SPLIT_SIZE, min);
        }
        if let Some(max) = env.max_split_size {
            self.set_long(config::MAX_SPLIT_SIZE, max);
        }
        if let Some(threads) = env.planner_threads {
            self.set_long(config::PLANNER_THREADS, threads as u64);
        }
        if let Some(dir) = env.working_dir {
            self.set(config::WORKING_DIR, &dir);
        }
    }

    pub fn set(&self, key: &str, value: &str) -> &Self {
        self.settings
            .write()
            .insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn set_long(&self, key: &str, value: u64) -> &Self {
        self.set(key, &value.to_string())
    }

    pub fn set_if_missing(&self, key: &str, value: &str) -> &Self {
        self.settings
            .write()
            .entry(key.to_owned())
            .or_insert_with(|| value.to_owned());
        self
    }

    pub fn remove(&self, key: &str) -> &Self {
        self.settings.write().remove(key);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.read().contains_key(key)
    }

    /// Get a parameter as an Option
    pub fn get_option(&self, key: &str) -> Option<String> {
        self.settings.read().get(key).cloned()
    }

    pub fn get_or_else(&self, key: &str, default_value: &str) -> String {
        self.get_option(key)
            .unwrap_or_else(|| default_value.to_owned())
    }

    pub fn get_u64(&self, key: &str, default_value: u64) -> u64 {
        self.get_option(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default_value)
    }

    pub fn get_int(&self, key: &str, default_value: i32) -> i32 {
        self.get_option(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default_value)
    }

    /// Get a parameter as a boolean, falling back to a default if not set
    pub fn get_boolean(&self, key: &str, default_value: bool) -> bool {
        self.get_option(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default_value)
    }

    pub fn get_all(&self) -> Vec<(String, String)> {
        let mut all: Vec<_> = self
            .settings
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort();
        all
    }

    /// Get all parameters that start with `prefix`
    pub fn get_all_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.get_all()
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key[prefix.len()..].to_owned(), value))
            .collect()
    }

    pub fn min_split_size(&self) -> u64 {
        self.get_u64(config::MIN_SPLIT_SIZE, 1)
    }

    pub fn set_min_input_split_size(&self, size: u64) -> &Self {
        self.set_long(config::MIN_SPLIT_SIZE, size)
    }

    pub fn max_split_size(&self) -> u64 {
        self.get_u64(config::MAX_SPLIT_SIZE, u64::MAX)
    }

    pub fn set_max_input_split_size(&self, size: u64) -> &Self {
        self.set_long(config::MAX_SPLIT_SIZE, size)
    }

    /// Worker threads for split planning; `0` means one per cpu.
    pub fn planner_threads(&self) -> usize {
        match self.get_u64(config::PLANNER_THREADS, 1) {
            0 => num_cpus::get(),
            n => n as usize,
        }
    }

    pub fn working_directory(&self) -> Option<String> {
        self.get_option(config::WORKING_DIR)
    }

    fn qualify(&self, path: &str) -> String {
        match self.working_directory() {
            Some(base) if !is_absolute(path) => {
                format!("{}/{}", base.trim_end_matches('/'), path)
            }
            _ => path.to_string(),
        }
    }

    /// Replaces the input paths. Relative paths are resolved against the
    /// working directory.
    pub fn set_input_paths(&self, paths: &[&str]) -> &Self {
        let joined = paths
            .iter()
            .map(|p| escape_path(&self.qualify(p)))
            .collect::<Vec<_>>()
            .join(",");
        self.set(config::INPUT_DIR, &joined)
    }

    /// Same as `set_input_paths`, from a comma separated string where commas
    /// inside `{...}` belong to a glob.
    pub fn set_input_paths_str(&self, comma_separated: &str) -> &Self {
        let paths = split_path_strings(comma_separated);
        let refs: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
        self.set_input_paths(&refs)
    }

    pub fn add_input_path(&self, path: &str) -> &Self {
        let escaped = escape_path(&self.qualify(path));
        let joined = match self.get_option(config::INPUT_DIR) {
            Some(dirs) if !dirs.is_empty() => format!("{},{}", dirs, escaped),
            _ => escaped,
        };
        self.set(config::INPUT_DIR, &joined)
    }

    pub fn add_input_paths(&self, comma_separated: &str) -> &Self {
        for path in split_path_strings(comma_separated) {
            self.add_input_path(&path);
        }
        self
    }

    pub fn get_input_paths(&self) -> Vec<String> {
        let dirs = self.get_or_else(config::INPUT_DIR, "");
        split_escaped(&dirs)
            .iter()
            .map(|p| unescape_path(p))
            .collect()
    }

    pub fn set_input_path_filter(&self, filter: Arc<dyn PathFilter>) -> &Self {
        *self.path_filter.write() = Some(filter);
        self
    }

    /// The job's own path filter: one set programmatically wins over one
    /// configured as a regex.
    pub fn get_input_path_filter(&self) -> Result<Option<Arc<dyn PathFilter>>> {
        if let Some(filter) = self.path_filter.read().clone() {
            return Ok(Some(filter));
        }
        match self.get_option(config::INPUT_PATH_FILTER_REGEX) {
            Some(pattern) => {
                let filter: Arc<dyn PathFilter> = Arc::new(RegexPathFilter::new(&pattern)?);
                Ok(Some(filter))
            }
            None => Ok(None),
        }
    }

    /// Return a string listing all keys and values, one per line.
    pub fn to_debug_string(&self) -> String {
        self.get_all()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.contains("://")
}

fn flatten_into(conf: &JobConf, prefix: &str, value: &toml::Value) -> Result<()> {
    let key = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };
    match value {
        toml::Value::Table(table) => {
            for (name, nested) in table {
                flatten_into(conf, &key(name.as_str()), nested)?;
            }
        }
        toml::Value::String(s) => {
            conf.set(prefix, s);
        }
        toml::Value::Integer(i) if *i < 0 => {
            return Err(Error::Config(format!("{} must not be negative (was {})", prefix, i)));
        }
        toml::Value::Integer(i) => {
            conf.set(prefix, &i.to_string());
        }
        toml::Value::Boolean(b) => {
            conf.set(prefix, &b.to_string());
        }
        toml::Value::Float(f) => {
            conf.set(prefix, &f.to_string());
        }
        toml::Value::Array(items) if prefix == config::INPUT_DIR => {
            let paths = items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => Ok(s.as_str()),
                    other => Err(Error::Config(format!(
                        "{} entries must be strings, got {}",
                        prefix, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            conf.set_input_paths(&paths);
        }
        other => {
            return Err(Error::Config(format!("unsupported value for {}: {}", prefix, other)));
        }
    }
    Ok(())
}
