//! Cuts one file into splits.
use crate::error::{Error, Result};
use crate::input_format::sizing::exceeds_slop;
use crate::io::{BlockLocation, FileStatus};
use crate::locality::{get_block_index, refine_locality};
use crate::split::FileSplit;

/// Splits `file` into chunks of `split_size` bytes. Each split is placed on
/// the hosts of the block holding its first byte, the trailing remainder on
/// the hosts of the last block. Splits spanning several blocks then get
/// their hosts re-ranked by how many of their bytes each rack and host holds.
///
/// A zero-length file yields a single empty split with no hosts. A file that
/// must not be split yields one split covering all of it.
pub fn generate_file_splits(
    file: &FileStatus,
    blocks: &[BlockLocation],
    split_size: u64,
    splitable: bool,
) -> Result<Vec<FileSplit>> {
    let length = file.len;
    let mut splits = Vec::new();
    if length == 0 {
        splits.push(FileSplit::new(&file.path, 0, 0, Vec::new()));
        return Ok(splits);
    }

    if !splitable {
        let first = get_block_index(blocks, 0)?;
        splits.push(FileSplit::new(&file.path, 0, length, blocks[first].hosts.clone()));
    } else {
        if split_size == 0 {
            return Err(Error::Config(format!(
                "split size for {} must be positive",
                file.path
            )));
        }
        let mut remaining = length;
        while exceeds_slop(remaining, split_size) {
            let offset = length - remaining;
            let index = get_block_index(blocks, offset)?;
            splits.push(FileSplit::new(
                &file.path,
                offset,
                split_size,
                blocks[index].hosts.clone(),
            ));
            remaining -= split_size;
        }
        if remaining != 0 {
            let offset = length - remaining;
            let last = blocks.last().ok_or(Error::OffsetOutOfRange {
                offset,
                last_byte: -1,
            })?;
            splits.push(FileSplit::new(&file.path, offset, remaining, last.hosts.clone()));
        }
    }

    refine_locality(blocks, &mut splits)?;
    Ok(splits)
}
