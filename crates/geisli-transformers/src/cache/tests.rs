use super::reorder_beam_caches;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_swap_origins_swaps_caches() {
    let caches = vec!["cache-a", "cache-b"];
    assert_eq!(reorder_beam_caches(caches, &[1, 0]), vec!["cache-b", "cache-a"]);
}

#[test]
fn test_identity_origins_keep_order() {
    let caches = vec![10, 20, 30];
    assert_eq!(reorder_beam_caches(caches, &[0, 1, 2]), vec![10, 20, 30]);
}

#[test]
fn test_duplicated_origin_and_dropped_beam() {
    let caches = vec![vec![0u32], vec![1], vec![2]];
    let reordered = reorder_beam_caches(caches, &[1, 1, 0]);
    assert_eq!(reordered, vec![vec![1], vec![1], vec![0]]);
}

#[test]
fn test_fewer_slots_than_caches() {
    let caches = vec!['a', 'b', 'c', 'd'];
    assert_eq!(reorder_beam_caches(caches, &[3]), vec!['d']);
}

#[derive(Debug)]
struct CountingCache {
    id: usize,
    clones: Arc<AtomicUsize>,
}

impl Clone for CountingCache {
    fn clone(&self) -> Self {
        self.clones.fetch_add(1, Ordering::SeqCst);
        CountingCache {
            id: self.id,
            clones: self.clones.clone(),
        }
    }
}

#[test]
fn test_only_repeated_origins_are_cloned() {
    let clones = Arc::new(AtomicUsize::new(0));
    let caches: Vec<_> = (0..3)
        .map(|id| CountingCache {
            id,
            clones: clones.clone(),
        })
        .collect();

    let reordered = reorder_beam_caches(caches, &[2, 0, 2, 2]);

    let ids: Vec<_> = reordered.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 0, 2, 2]);
    assert_eq!(clones.load(Ordering::SeqCst), 2);
}
