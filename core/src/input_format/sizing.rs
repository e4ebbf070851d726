/// A split may be up to this many times the split size before it is cut again,
/// which keeps the trailing split from becoming tiny.
pub const SPLIT_SLOP: f64 = 1.1;

/// Bytes per split.
///
/// Callers pass the file's block size as `goal_size` and the job's maximum
/// split size as `block_size`, so both branches come down to
/// `max(min_size, file block size)`: the maximum is not enforced. Existing
/// jobs depend on these sizes, keep it that way.
pub fn compute_split_size(goal_size: u64, min_size: u64, block_size: u64) -> u64 {
    if goal_size > block_size {
        min_size.max(goal_size.max(block_size))
    } else {
        min_size.max(goal_size.min(block_size))
    }
}

/// Size each split would get if `total_size` were spread over `num_splits`.
/// The split planner does not use it.
pub fn compute_goal_size(num_splits: usize, total_size: u64) -> u64 {
    // one split is kept for the remainder
    let parts = if num_splits <= 1 { 1 } else { num_splits - 1 };
    total_size / parts as u64
}

/// Whether `remaining` bytes are still worth cutting into another split of
/// `split_size`.
pub(crate) fn exceeds_slop(remaining: u64, split_size: u64) -> bool {
    (remaining as f64) / (split_size as f64) > SPLIT_SLOP
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_split_size_is_file_block_size() {
        let block = 64 * MIB;
        assert_eq!(compute_split_size(block, 1, u64::MAX), block);
        // a max below the block size does not cap anything
        assert_eq!(compute_split_size(block, 1, 16 * MIB), block);
        assert_eq!(compute_split_size(block, 1, block), block);
    }

    #[test]
    fn test_min_size_raises_split_size() {
        assert_eq!(compute_split_size(64 * MIB, 128 * MIB, u64::MAX), 128 * MIB);
        assert_eq!(compute_split_size(64 * MIB, 128 * MIB, MIB), 128 * MIB);
    }

    #[test]
    fn test_goal_size() {
        assert_eq!(compute_goal_size(0, 100), 100);
        assert_eq!(compute_goal_size(1, 100), 100);
        assert_eq!(compute_goal_size(5, 100), 25);
    }

    #[test]
    fn test_slop_boundary_is_exclusive() {
        assert!(!exceeds_slop(11, 10));
        assert!(exceeds_slop(12, 10));
        assert!(!exceeds_slop(110, 100));
        assert!(exceeds_slop(111, 100));
    }
}
