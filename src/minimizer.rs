//! Interior minimizer tags for content-based unitig lookup (`spec.md` §3's
//! `unitig_tag_map`, §9 GLOSSARY "tag"/"minimizer (window minimizer)").
//!
//! Grounded on `examples/original_source/include/boink/minimizers.hh`'s
//! windowed-minimum scan, reduced here to a pure function over an
//! already-computed hash array rather than its own rolling state, since the
//! compactor always has the full per-k-mer hash array in hand already.

use std::collections::BTreeSet;

/// The smallest hash in every non-overlapping `window`-sized chunk of
/// `hashes`, restricted to interior positions (excluding index 0 and the
/// last index, which are the unitig's `left_end`/`right_end` and are
/// tracked by `end_index` instead). Deduplicated and sorted so the result
/// is independent of chunk boundaries and of iteration order.
pub fn interior_tags(hashes: &[u64], window: usize) -> Vec<u64> {
    debug_assert!(window >= 1);
    if hashes.len() < 3 {
        return Vec::new();
    }
    let interior = &hashes[1..hashes.len() - 1];
    let window = window.max(1);

    let mut tags = BTreeSet::new();
    let mut start = 0;
    while start < interior.len() {
        let end = (start + window).min(interior.len());
        if let Some(&min) = interior[start..end].iter().min() {
            tags.insert(min);
        }
        start = end;
    }
    tags.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_for_short_sequences() {
        assert_eq!(interior_tags(&[1, 2], 4), Vec::<u64>::new());
        assert_eq!(interior_tags(&[1], 4), Vec::<u64>::new());
    }

    #[test]
    fn picks_the_minimum_of_each_window() {
        // interior = [5, 3, 9, 1, 7], window 2 -> chunks [5,3], [9,1], [7]
        let hashes = [100, 5, 3, 9, 1, 7, 200];
        let mut tags = interior_tags(&hashes, 2);
        tags.sort_unstable();
        assert_eq!(tags, vec![1, 3, 7]);
    }

    #[test]
    fn deduplicates_repeated_minimums() {
        let hashes = [0, 2, 2, 2, 2, 0];
        let tags = interior_tags(&hashes, 2);
        assert_eq!(tags, vec![2]);
    }

    #[test]
    fn window_larger_than_interior_collapses_to_one_tag() {
        let hashes = [0, 9, 4, 6, 0];
        let tags = interior_tags(&hashes, 100);
        assert_eq!(tags, vec![4]);
    }
}
