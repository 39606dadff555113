//! The two ways of grouping entries by bucket id.
//!
//! Both produce a permutation of the input with non-decreasing bucket ids
//! and allocate the output exactly once, sized to the input.

use crate::{Error, Result};
use log::debug;

/// Groups `input` by bucket id with a counting sort over `2^splitter_bits`
/// buckets.
///
/// Entries in the same bucket keep their input order. Needs
/// `O(2^splitter_bits)` extra space. The space is reserved with
/// `try_reserve_exact`, so a refused allocation is returned as an error, but
/// an operating system that overcommits memory may accept the reservation
/// and kill the process once the buckets are zeroed. Keep forced counting
/// sorts well below [`MAX_COUNTING_BITS`](crate::MAX_COUNTING_BITS) unless
/// the memory is really there.
///
/// `bucket_id` must return values below `2^splitter_bits`.
pub fn counting_sort<F>(input: &[u64], splitter_bits: u32, bucket_id: F) -> Result<Vec<u64>>
where
    F: Fn(u64) -> u64,
{
    let universe = 1usize
        .checked_shl(splitter_bits)
        .ok_or(Error::BucketSpaceTooLarge(splitter_bits))?;
    // One extra slot for the sentinel at the end.
    let mut offsets: Vec<usize> = Vec::new();
    offsets.try_reserve_exact(universe + 1)?;
    offsets.resize(universe + 1, 0);

    for &x in input {
        offsets[bucket_id(x) as usize] += 1;
    }

    // Exclusive prefix sums: each slot becomes the start of its bucket.
    let mut sum = 0;
    for offset in offsets.iter_mut() {
        let count = *offset;
        *offset = sum;
        sum += count;
    }
    debug!("counting sort over {} buckets", universe);

    let mut entries: Vec<u64> = Vec::new();
    entries.try_reserve_exact(input.len())?;
    entries.resize(input.len(), 0);
    for &x in input {
        let slot = &mut offsets[bucket_id(x) as usize];
        entries[*slot] = x;
        *slot += 1;
    }
    Ok(entries)
}

/// Groups `input` by bucket id with an unstable comparison sort.
///
/// Needs no space beyond the output copy.
pub fn comparison_sort<F>(input: &[u64], bucket_id: F) -> Result<Vec<u64>>
where
    F: Fn(u64) -> u64,
{
    let mut entries: Vec<u64> = Vec::new();
    entries.try_reserve_exact(input.len())?;
    entries.extend_from_slice(input);
    debug!("start sorting {} entries", entries.len());
    entries.sort_unstable_by_key(|&x| bucket_id(x));
    debug!("end sorting");
    Ok(entries)
}

#[cfg(test)]
mod test {
    use super::*;

    fn top2(x: u64) -> u64 {
        (x >> 2) & 0b11
    }

    #[test]
    fn test_counting_sort_is_stable() {
        let input = [0b1111, 0b0000, 0b0111, 0b1100, 0b0011, 0b0100];
        let entries = counting_sort(&input, 2, top2).unwrap();
        assert_eq!(entries, vec![0b0000, 0b0011, 0b0111, 0b0100, 0b1111, 0b1100]);
    }

    #[test]
    fn test_comparison_sort_groups() {
        let input = [0b1111, 0b0000, 0b0111, 0b1100, 0b0011, 0b0100];
        let entries = comparison_sort(&input, top2).unwrap();
        let buckets = entries.iter().map(|&x| top2(x)).collect::<Vec<_>>();
        assert_eq!(buckets, vec![0, 0, 1, 1, 3, 3]);
        let mut sorted = entries.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0b0000, 0b0011, 0b0100, 0b0111, 0b1100, 0b1111]);
    }

    #[test]
    fn test_empty_input() {
        assert!(counting_sort(&[], 4, |x| x).unwrap().is_empty());
        assert!(comparison_sort(&[], |x| x).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let input = [0b1000, 0b1000, 0b0001, 0b1000];
        let entries = counting_sort(&input, 2, top2).unwrap();
        assert_eq!(entries, vec![0b0001, 0b1000, 0b1000, 0b1000]);
    }
}
