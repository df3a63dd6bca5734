//! Beam cache bookkeeping
//!
//! Caches belong to the scorer and are opaque to the decoder. After each step
//! the decoder only rearranges the container so that cache `i` belongs to the
//! origin of new beam `i`.
//!
//! ```text
//! caches:  [c0, c1, c2]
//! origins: [1, 1, 0]
//! result:  [c1, c1, c0]   (c1 cloned once, then moved; c2 dropped)
//! ```

/// Reorders `caches` so that slot `i` holds the cache of beam `origins[i]`.
///
/// An origin used several times is cloned for all but its last use, which
/// takes the original. Caches of beams that were not selected are dropped.
///
/// # Panics
///
/// Panics if an origin is not a valid index into `caches`.
pub fn reorder_beam_caches<C: Clone>(caches: Vec<C>, origins: &[usize]) -> Vec<C> {
    let mut last_use = vec![None; caches.len()];
    for (slot, &origin) in origins.iter().enumerate() {
        last_use[origin] = Some(slot);
    }

    let mut caches: Vec<Option<C>> = caches.into_iter().map(Some).collect();

    let mut reordered: Vec<Option<C>> = origins
        .iter()
        .enumerate()
        .map(|(slot, &origin)| {
            if last_use[origin] == Some(slot) {
                None
            } else {
                caches[origin].clone()
            }
        })
        .collect();

    for (slot, &origin) in origins.iter().enumerate() {
        if last_use[origin] == Some(slot) {
            reordered[slot] = caches[origin].take();
        }
    }

    reordered.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests;
