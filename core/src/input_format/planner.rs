//! Plans files on a pool of scoped threads. Output order always matches
//! input order, whatever the thread count.
use crate::error::{Error, Result};

/// Runs `plan` over `items` on up to `threads` workers and concatenates the
/// results in input order. The first error wins.
pub(crate) fn plan_in_order<T, R, P>(items: &[T], threads: usize, plan: P) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    P: Fn(&T) -> Result<R> + Sync,
{
    if threads <= 1 || items.len() <= 1 {
        return items.iter().map(&plan).collect();
    }
    let workers = threads.min(items.len());
    let chunk_size = items.len().div_ceil(workers);
    log::debug!(
        "planning {} files on {} threads",
        items.len(),
        items.len().div_ceil(chunk_size)
    );

    crossbeam::thread::scope(|scope| -> Result<Vec<R>> {
        let plan = &plan;
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move |_| chunk.iter().map(plan).collect::<Result<Vec<R>>>()))
            .collect();
        let mut planned = Vec::with_capacity(items.len());
        for handle in handles {
            planned.extend(handle.join().map_err(|_| Error::WorkerPanicked)??);
        }
        Ok(planned)
    })
    .map_err(|_| Error::WorkerPanicked)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_kept() {
        let items: Vec<u64> = (0..103).collect();
        for threads in [0, 1, 2, 7, 200] {
            let out = plan_in_order(&items, threads, |i| Ok(i * 2)).unwrap();
            assert_eq!(out, items.iter().map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_thread_count_beyond_items() {
        let items: Vec<u64> = (0..10).collect();
        let out = plan_in_order(&items, usize::MAX, |i| Ok(*i)).unwrap();
        assert_eq!(out, items);
    }

    #[test]
    fn test_error_is_returned() {
        let items: Vec<u64> = (0..10).collect();
        let result = plan_in_order(&items, 4, |i| {
            if *i == 6 {
                Err(Error::NotAFile(i.to_string()))
            } else {
                Ok(*i)
            }
        });
        assert!(matches!(result, Err(Error::NotAFile(path)) if path == "6"));
    }
}
