//! Stable compaction of kept elements into dense output buffers.
//!
//! All entry points share the contract: element `i` is kept iff
//! `flags[i] == 1`, and kept elements land at `scan.offsets[i]` in the
//! output — so relative order among kept elements is always preserved.

use rayon::prelude::*;

use crate::scan::ScanResult;

/// Rows per parallel gather chunk.
const CHUNK: usize = 1 << 14;

/// Original indices of the kept elements, in compacted order.
pub fn compact_indices(flags: &[u32], scan: &ScanResult) -> Vec<u32> {
    debug_assert_eq!(flags.len(), scan.offsets.len());
    let mut out = Vec::with_capacity(scan.kept_len());
    for (i, &f) in flags.iter().enumerate() {
        if f == 1 {
            debug_assert_eq!(scan.offsets[i] as usize, out.len());
            out.push(i as u32);
        }
    }
    out
}

/// Compact a slice of copyable elements into a dense output.
///
/// Chunks are gathered in parallel; chunk `k`'s kept elements occupy the
/// contiguous output span starting at `scan.offsets[k * CHUNK]`, so
/// concatenating the chunk results reproduces the scatter the offsets
/// describe.
pub fn compact_slice<T: Copy + Send + Sync>(flags: &[u32], scan: &ScanResult, src: &[T]) -> Vec<T> {
    debug_assert_eq!(flags.len(), src.len());
    let pieces: Vec<Vec<T>> = flags
        .par_chunks(CHUNK)
        .zip(src.par_chunks(CHUNK))
        .map(|(f, s)| {
            f.iter()
                .zip(s)
                .filter(|&(&flag, _)| flag == 1)
                .map(|(_, &v)| v)
                .collect()
        })
        .collect();
    let mut out = Vec::with_capacity(scan.kept_len());
    for p in &pieces {
        out.extend_from_slice(p);
    }
    debug_assert_eq!(out.len(), scan.kept_len());
    out
}

/// Compact row-major records of `width` f32 slots each.
///
/// `src.len()` must equal `flags.len() * width`. Non-kept rows contribute
/// nothing to the output (no zero-valued placeholder records).
pub fn compact_rows(flags: &[u32], scan: &ScanResult, src: &[f32], width: usize) -> Vec<f32> {
    debug_assert_eq!(src.len(), flags.len() * width);
    if width == 0 {
        return Vec::new();
    }
    let pieces: Vec<Vec<f32>> = flags
        .par_chunks(CHUNK)
        .zip(src.par_chunks(CHUNK * width))
        .map(|(f, s)| {
            let mut piece = Vec::with_capacity(f.iter().map(|&x| x as usize).sum::<usize>() * width);
            for (j, &flag) in f.iter().enumerate() {
                if flag == 1 {
                    piece.extend_from_slice(&s[j * width..(j + 1) * width]);
                }
            }
            piece
        })
        .collect();
    let mut out = Vec::with_capacity(scan.kept_len() * width);
    for p in &pieces {
        out.extend_from_slice(p);
    }
    debug_assert_eq!(out.len(), scan.kept_len() * width);
    out
}

/// Compact row-major records in place, truncating to the kept length.
///
/// Kept rows move forward to `scan.offsets[i] * width`; because the
/// destination of row `i` never exceeds `i * width`, a single left-to-right
/// pass is safe. Used for population columns, where reusing the allocation
/// matters.
pub fn compact_in_place(flags: &[u32], scan: &ScanResult, data: &mut Vec<f32>, width: usize) {
    debug_assert_eq!(data.len(), flags.len() * width);
    for (i, &f) in flags.iter().enumerate() {
        if f == 1 {
            let dst = scan.offsets[i] as usize * width;
            let src = i * width;
            if dst != src {
                data.copy_within(src..src + width, dst);
            }
        }
    }
    data.truncate(scan.kept_len() * width);
}
