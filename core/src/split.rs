use downcast_rs::{impl_downcast, DowncastSync};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub trait Split: DowncastSync + dyn_clone::DynClone {
    fn get_index(&self) -> usize;
}

impl_downcast!(sync Split);
dyn_clone::clone_trait_object!(Split);

/// A unit of input handed to a single task.
pub trait InputSplit {
    fn length(&self) -> u64;

    /// Hosts where the data of this split lives, best first.
    fn locations(&self) -> Vec<String>;
}

/// A contiguous byte range of one input file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileSplit {
    index: usize,
    path: String,
    start: u64,
    length: u64,
    hosts: Vec<String>,
}

impl FileSplit {
    pub fn new(path: &str, start: u64, length: u64, hosts: Vec<String>) -> Self {
        FileSplit {
            index: 0,
            path: path.to_string(),
            start,
            length,
            hosts,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// First byte past this split.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub(crate) fn set_hosts(&mut self, hosts: Vec<String>) {
        self.hosts = hosts;
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl Split for FileSplit {
    fn get_index(&self) -> usize {
        self.index
    }
}

impl InputSplit for FileSplit {
    fn length(&self) -> u64 {
        self.length
    }

    fn locations(&self) -> Vec<String> {
        self.hosts.clone()
    }
}

impl std::fmt::Display for FileSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}+{}", self.path, self.start, self.length)
    }
}

/// Serializes a split plan for handing it over to the scheduler.
pub fn encode_splits(splits: &[FileSplit]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(splits)?)
}

pub fn decode_splits(bytes: &[u8]) -> Result<Vec<FileSplit>> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_as_trait_object() {
        let mut split = FileSplit::new("/data/part-0", 128, 64, vec!["h1".to_string()]);
        split.set_index(3);
        let boxed: Box<dyn Split> = Box::new(split.clone());
        let cloned = dyn_clone::clone_box(&*boxed);
        assert_eq!(cloned.get_index(), 3);
        let concrete = cloned.downcast_ref::<FileSplit>().unwrap();
        assert_eq!(concrete, &split);
        assert_eq!(concrete.end(), 192);
        assert_eq!(concrete.to_string(), "/data/part-0:128+64");
    }

    #[test]
    fn test_encoded_plan_keeps_hosts_in_order() {
        let splits = vec![
            FileSplit::new("/a", 0, 10, vec!["h2".to_string(), "h1".to_string()]),
            FileSplit::new("/a", 10, 0, vec![]),
        ];
        let bytes = encode_splits(&splits).unwrap();
        let decoded = decode_splits(&bytes).unwrap();
        assert_eq!(decoded[0].locations(), vec!["h2", "h1"]);
        assert_eq!(decoded, splits);
    }
}
