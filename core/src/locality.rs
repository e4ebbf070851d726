//! Picks the hosts that hold the largest share of a split.
//!
//! Byte contributions of every block the split touches are summed per host and
//! per rack. Racks are ranked first, then the hosts inside each rack, so hosts
//! on a rack holding much of the split win over a lone host elsewhere.
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::io::BlockLocation;
use crate::split::{FileSplit, InputSplit};
use crate::topology::{fake_racks, strip_port, NodeHandle, TopologyRegistry};

/// Aggregated contribution of one rack or host.
#[derive(Debug)]
struct NodeInfo {
    node: NodeHandle,
    value: u64,
    block_ids: HashSet<usize>,
    /// Hosts below a rack; empty for hosts.
    leaves: BTreeSet<NodeHandle>,
}

impl NodeInfo {
    fn new(node: NodeHandle) -> Self {
        NodeInfo {
            node,
            value: 0,
            block_ids: HashSet::new(),
            leaves: BTreeSet::new(),
        }
    }

    /// A block counts at most once per node, however many topology paths
    /// lead to it.
    fn add_value(&mut self, block_index: usize, value: u64) {
        if self.block_ids.insert(block_index) {
            self.value += value;
        }
    }

    fn add_leaf(&mut self, leaf: NodeHandle) {
        self.leaves.insert(leaf);
    }
}

/// Index of the block holding `offset`.
pub fn get_block_index(blocks: &[BlockLocation], offset: u64) -> Result<usize> {
    blocks
        .iter()
        .position(|block| block.contains(offset))
        .ok_or_else(|| Error::OffsetOutOfRange {
            offset,
            last_byte: blocks
                .last()
                .map_or(-1, |b| i64::try_from(b.end()).map_or(i64::MAX, |end| end - 1)),
        })
}

/// Hosts contributing most to `[offset, offset + split_size)`.
///
/// A split inside a single block gets that block's hosts as they are. The
/// number of hosts returned is the replica count of the last block touched,
/// which assumes replication is uniform over the split.
pub fn get_split_hosts(
    blocks: &[BlockLocation],
    offset: u64,
    split_size: u64,
    registry: &mut TopologyRegistry,
) -> Result<Vec<String>> {
    let start_index = get_block_index(blocks, offset)?;
    let bytes_in_first_block = blocks[start_index].end() - offset;

    if bytes_in_first_block >= split_size {
        return Ok(blocks[start_index].hosts.clone());
    }

    let mut remaining = split_size - bytes_in_first_block;
    let mut index = start_index + 1;
    let mut bytes_in_last_block = bytes_in_first_block;
    while remaining > 0 {
        let block = blocks.get(index).ok_or(Error::SplitBeyondBlocks {
            offset,
            length: split_size,
        })?;
        bytes_in_last_block = remaining.min(block.length);
        remaining -= bytes_in_last_block;
        index += 1;
    }
    let end_index = index - 1;

    let mut hosts: HashMap<NodeHandle, NodeInfo> = HashMap::new();
    let mut racks: HashMap<NodeHandle, NodeInfo> = HashMap::new();
    let mut replication_factor = 0;

    for index in start_index..=end_index {
        let bytes_in_block = if index == start_index {
            bytes_in_first_block
        } else if index == end_index {
            bytes_in_last_block
        } else {
            blocks[index].length
        };

        let topology = if blocks[index].topology_paths.is_empty() {
            fake_racks(&blocks[index].hosts)
        } else {
            blocks[index].topology_paths.clone()
        };
        replication_factor = topology.len();

        for path in &topology {
            let host = registry.resolve(path);
            let rack = registry.rack_of(host);

            hosts
                .entry(host)
                .or_insert_with(|| NodeInfo::new(host))
                .add_value(index, bytes_in_block);

            let rack_info = racks.entry(rack).or_insert_with(|| NodeInfo::new(rack));
            rack_info.add_leaf(host);
            rack_info.add_value(index, bytes_in_block);
        }
    }

    Ok(identify_hosts(replication_factor, &racks, &hosts, registry))
}

/// Most bytes first; equal contributions fall back to the canonical path.
fn by_contribution(registry: &TopologyRegistry, a: &NodeInfo, b: &NodeInfo) -> Ordering {
    b.value
        .cmp(&a.value)
        .then_with(|| registry.path(a.node).cmp(registry.path(b.node)))
}

fn identify_hosts(
    replication_factor: usize,
    racks: &HashMap<NodeHandle, NodeInfo>,
    hosts: &HashMap<NodeHandle, NodeInfo>,
    registry: &TopologyRegistry,
) -> Vec<String> {
    let mut result = Vec::with_capacity(replication_factor);
    if replication_factor == 0 {
        return result;
    }

    for rack in racks
        .values()
        .sorted_by(|a, b| by_contribution(registry, a, b))
    {
        let ranked = rack
            .leaves
            .iter()
            .filter_map(|leaf| hosts.get(leaf))
            .sorted_by(|a, b| by_contribution(registry, a, b));
        for host in ranked {
            result.push(strip_port(registry.name(host.node)).to_string());
            if result.len() == replication_factor {
                return result;
            }
        }
    }
    result
}

/// Replaces the placement of every split that crosses a block boundary with
/// the ranked host list. Splits inside one block keep what they have.
pub(crate) fn refine_locality(blocks: &[BlockLocation], splits: &mut [FileSplit]) -> Result<()> {
    for split in splits.iter_mut() {
        if split.length() == 0 {
            continue;
        }
        let start_index = get_block_index(blocks, split.start())?;
        if blocks[start_index].end() - split.start() >= split.length() {
            continue;
        }
        let mut registry = TopologyRegistry::new();
        let hosts = get_split_hosts(blocks, split.start(), split.length(), &mut registry)?;
        split.set_hosts(hosts);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn block(offset: u64, length: u64, hosts: &[&str], topology: &[&str]) -> BlockLocation {
        BlockLocation::new(offset, length, strings(hosts), strings(topology))
    }

    fn hosts_for(blocks: &[BlockLocation], offset: u64, len: u64) -> Vec<String> {
        get_split_hosts(blocks, offset, len, &mut TopologyRegistry::new()).unwrap()
    }

    #[test]
    fn test_block_index_lookup() {
        let blocks = vec![block(0, 10, &[], &[]), block(10, 10, &[], &[])];
        assert_eq!(get_block_index(&blocks, 0).unwrap(), 0);
        assert_eq!(get_block_index(&blocks, 9).unwrap(), 0);
        assert_eq!(get_block_index(&blocks, 10).unwrap(), 1);
        let err = get_block_index(&blocks, 20).unwrap_err();
        assert_eq!(err.to_string(), "Offset 20 is outside of file (0..19)");
        assert!(matches!(
            get_block_index(&[], 0),
            Err(Error::OffsetOutOfRange { offset: 0, last_byte: -1 })
        ));

        let huge = vec![block(0, u64::MAX - 1, &[], &[])];
        assert!(matches!(
            get_block_index(&huge, u64::MAX - 1),
            Err(Error::OffsetOutOfRange { last_byte: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_single_block_keeps_original_order() {
        let blocks = vec![
            block(0, 100, &["h3", "h1", "h2"], &["/r1/h3", "/r1/h1", "/r2/h2"]),
            block(100, 100, &["h4"], &["/r3/h4"]),
        ];
        assert_eq!(hosts_for(&blocks, 10, 90), strings(&["h3", "h1", "h2"]));
        assert_eq!(hosts_for(&blocks, 100, 100), strings(&["h4"]));
    }

    #[test]
    fn test_rack_contribution_wins() {
        let blocks = vec![
            block(0, 100, &["a1", "b1"], &["/r1/a1", "/r2/b1"]),
            block(100, 100, &["a2", "b1"], &["/r1/a2", "/r2/b1"]),
        ];
        let hosts = hosts_for(&blocks, 70, 100);
        // r1: a1=30, a2=70 -> 100; r2: b1=30+70 -> 100. Racks tie, /r1 first.
        assert_eq!(hosts, strings(&["a2", "a1"]));

        let blocks = vec![
            block(0, 100, &["a1", "b1"], &["/r1/a1", "/r2/b1"]),
            block(100, 100, &["a2", "b1"], &["/r1/a2", "/r2/b1"]),
            block(200, 100, &["b2", "b1"], &["/r2/b2", "/r2/b1"]),
        ];
        // r2 now holds every byte of the split.
        let hosts = hosts_for(&blocks, 50, 200);
        assert_eq!(hosts, strings(&["b1", "b2"]));
    }

    #[test]
    fn test_duplicate_topology_paths_count_once() {
        let blocks = vec![
            block(0, 100, &["h1", "h1"], &["/r1/h1", "/r1/h1/"]),
            block(100, 100, &["h2"], &["/r2/h2"]),
        ];
        // h1 holds 60 bytes even though named twice; h2 holds 80.
        let hosts = hosts_for(&blocks, 40, 140);
        assert_eq!(hosts, strings(&["h2"]));

        let mut registry = TopologyRegistry::new();
        let hosts = get_split_hosts(&blocks, 40, 140, &mut registry).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_blocks_without_topology_use_default_rack() {
        let blocks = vec![
            block(0, 10, &["h1", "h2"], &[]),
            block(10, 10, &["h2", "h1"], &[]),
        ];
        let mut registry = TopologyRegistry::new();
        let hosts = get_split_hosts(&blocks, 5, 10, &mut registry).unwrap();
        assert_eq!(hosts, strings(&["h1", "h2"]));
        assert!(registry.get("/default-rack/h1").is_some());
        assert!(registry.get("/default-rack/h2").is_some());
        assert!(registry.get("/default-rack").is_some());
    }

    #[test]
    fn test_equal_contributions_rank_by_name() {
        let blocks = vec![
            block(0, 10, &["zeta", "alpha"], &["/r/zeta", "/r/alpha"]),
            block(10, 10, &["mid", "zeta"], &["/r/mid", "/r/zeta"]),
        ];
        for _ in 0..10 {
            // zeta 10 bytes, alpha 5, mid 5.
            assert_eq!(hosts_for(&blocks, 5, 10), strings(&["zeta", "alpha"]));
        }
    }

    #[test]
    fn test_replication_follows_last_block() {
        let blocks = vec![
            block(0, 10, &["a", "b", "c"], &["/r1/a", "/r1/b", "/r2/c"]),
            block(10, 10, &["a"], &["/r1/a"]),
        ];
        assert_eq!(hosts_for(&blocks, 0, 20), strings(&["a"]));

        let blocks = vec![
            block(0, 10, &["a"], &["/r1/a"]),
            block(10, 10, &["a", "b", "c", "d"], &["/r1/a", "/r1/b", "/r2/c", "/r2/a"]),
        ];
        // /r2/a and /r1/a are different nodes sharing a host name.
        assert_eq!(hosts_for(&blocks, 5, 10), strings(&["a", "b", "a", "c"]));
    }

    #[test]
    fn test_ports_are_stripped() {
        let blocks = vec![
            block(0, 10, &["h1:9866"], &["/r1/h1:9866"]),
            block(10, 10, &["h1:9866"], &["/r1/h1:9866"]),
        ];
        assert_eq!(hosts_for(&blocks, 0, 20), strings(&["h1"]));
    }

    #[test]
    fn test_split_past_last_block() {
        let blocks = vec![block(0, 10, &["h"], &[]), block(10, 10, &["h"], &[])];
        let err = get_split_hosts(&blocks, 5, 100, &mut TopologyRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::SplitBeyondBlocks { offset: 5, length: 100 }));
    }

    #[test]
    fn test_refine_only_touches_spanning_splits() {
        let blocks = vec![
            block(0, 10, &["a"], &["/r1/a"]),
            block(10, 10, &["b"], &["/r2/b"]),
        ];
        let mut splits = vec![
            FileSplit::new("/f", 0, 8, strings(&["a"])),
            FileSplit::new("/f", 8, 12, strings(&["naive"])),
        ];
        refine_locality(&blocks, &mut splits).unwrap();
        assert_eq!(splits[0].hosts(), &strings(&["a"])[..]);
        assert_eq!(splits[1].hosts(), &strings(&["b"])[..]);
    }
}
