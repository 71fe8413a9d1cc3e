//! Exclusive prefix sum over outcome flag arrays.

use rayon::prelude::*;

/// Flags per parallel chunk. Large enough that the sequential pass over
/// chunk totals is negligible next to the per-chunk work.
const CHUNK: usize = 1 << 14;

/// Result of scanning a flag array.
///
/// `offsets[i]` is the compacted position of element `i` **if** it is kept
/// (`flags[i] == 1`); for discarded elements the value is the running kept
/// count at that point and must not be used as a destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanResult {
    /// Exclusive prefix sum of the flag array.
    pub offsets: Vec<u32>,
    /// Total number of kept elements (sum of all flags).
    pub kept: u32,
}

impl ScanResult {
    /// Kept count as a usize length.
    pub fn kept_len(&self) -> usize {
        self.kept as usize
    }
}

/// Compute the exclusive prefix sum of a u32 array.
///
/// Two-pass chunked scan: per-chunk totals are reduced in parallel, the
/// chunk totals are scanned sequentially, then each chunk fills its span
/// of the output in parallel from its base offset. An empty or all-zero
/// input is a valid, non-error outcome (kept count 0); an all-one input
/// exercises the same path (no identity shortcut).
///
/// Inputs are usually 0/1 outcome flags, but arbitrary counts are scanned
/// the same way (the spatial message index scans per-cell counts into
/// bucket offsets). The total must fit `u32`, which holds for populations
/// up to `u32::MAX` agents.
pub fn exclusive_scan(flags: &[u32]) -> ScanResult {
    if flags.is_empty() {
        return ScanResult {
            offsets: Vec::new(),
            kept: 0,
        };
    }

    // Pass 1: per-chunk totals.
    let chunk_totals: Vec<u32> = flags.par_chunks(CHUNK).map(|c| c.iter().sum()).collect();

    // Sequential scan of chunk totals into chunk base offsets.
    let mut bases = Vec::with_capacity(chunk_totals.len());
    let mut running = 0u32;
    for total in &chunk_totals {
        bases.push(running);
        running += total;
    }
    let kept = running;

    // Pass 2: each chunk fills its own span from its base.
    let mut offsets = vec![0u32; flags.len()];
    offsets
        .par_chunks_mut(CHUNK)
        .zip(flags.par_chunks(CHUNK))
        .zip(bases.par_iter())
        .for_each(|((out, src), &base)| {
            let mut acc = base;
            for (o, &f) in out.iter_mut().zip(src) {
                *o = acc;
                acc += f;
            }
        });

    ScanResult { offsets, kept }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input() {
        let s = exclusive_scan(&[]);
        assert_eq!(s.kept, 0);
        assert!(s.offsets.is_empty());
    }

    #[test]
    fn all_zero_is_valid() {
        let s = exclusive_scan(&[0, 0, 0, 0]);
        assert_eq!(s.kept, 0);
        assert_eq!(s.offsets, vec![0, 0, 0, 0]);
    }

    #[test]
    fn all_one_full_identity() {
        let s = exclusive_scan(&[1, 1, 1, 1]);
        assert_eq!(s.kept, 4);
        assert_eq!(s.offsets, vec![0, 1, 2, 3]);
    }

    #[test]
    fn mixed_flags() {
        // The 10-agent death scenario: kept count 7.
        let flags = [1, 0, 1, 1, 0, 1, 1, 1, 0, 1];
        let s = exclusive_scan(&flags);
        assert_eq!(s.kept, 7);
        assert_eq!(s.offsets, vec![0, 1, 1, 2, 3, 3, 4, 5, 6, 6]);
    }

    #[test]
    fn spans_multiple_chunks() {
        // Alternating flags across several chunk boundaries.
        let n = CHUNK * 3 + 17;
        let flags: Vec<u32> = (0..n).map(|i| (i % 2) as u32).collect();
        let s = exclusive_scan(&flags);
        assert_eq!(s.kept as usize, flags.iter().filter(|&&f| f == 1).count());
        // Offset of each kept element equals the number of kept before it.
        let mut expected = 0u32;
        for (i, &f) in flags.iter().enumerate() {
            assert_eq!(s.offsets[i], expected, "offset mismatch at {i}");
            expected += f;
        }
    }

    proptest! {
        #[test]
        fn kept_equals_popcount(flags in prop::collection::vec(0u32..2, 0..2048)) {
            let s = exclusive_scan(&flags);
            prop_assert_eq!(s.kept, flags.iter().sum::<u32>());
        }

        #[test]
        fn offsets_match_sequential_reference(
            flags in prop::collection::vec(0u32..2, 0..2048),
        ) {
            let s = exclusive_scan(&flags);
            let mut acc = 0u32;
            for (i, &f) in flags.iter().enumerate() {
                prop_assert_eq!(s.offsets[i], acc);
                acc += f;
            }
        }
    }
}
