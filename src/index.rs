use crate::{build, BuildStrategy, Permutation, Result, SubIndexConfig};
use either::Either;
use log::{info, trace};
use std::ops::Range;

/// Any two stored words are within this many bits of each other.
const WORD_BITS: u32 = 64;

/// Searches with at least this many errors pre-reserve result space.
const RESERVE_ERRORS: u32 = 6;

/// This determines how much space is reserved for large result sets.
const RESERVE_CAPACITY: usize = 128;

/// One sub-index of a multi-index Hamming search.
///
/// Entries are stored unpermuted, grouped by their bucket id: the top
/// `splitter_bits` bits of the key after the sub-index's permutation. A
/// search binary-searches the query's bucket and then filters it by exact
/// Hamming distance.
///
/// The result of a search is exact for the query's bucket. It is only
/// complete for the whole collection when `errors` is within the budget the
/// permutation family was designed for; asking for more errors than that is
/// allowed, but finding the rest is up to the caller.
///
/// ```
/// # use mih_buckets::{IdentityPermutation, SubIndex, SubIndexConfig};
/// let perm = IdentityPermutation::new(4, 2).unwrap();
/// let index =
///     SubIndex::build(perm, SubIndexConfig::new(1), &[0b0000, 0b0011, 0b1100, 0b1111]).unwrap();
/// let (matches, candidates) = index.search(0b0001, None, false);
/// assert_eq!(matches, vec![0b0000]);
/// assert_eq!(candidates, 2);
/// ```
#[derive(Clone, Debug)]
pub struct SubIndex<P> {
    permutation: P,
    sub_index_id: usize,
    /// Derived once from the permutation's block widths.
    splitter_bits: u32,
    total_bits: u32,
    max_errors: u32,
    strategy: BuildStrategy,
    count: usize,
    /// Unpermuted entries ordered by non-decreasing bucket id.
    entries: Vec<u64>,
}

impl<P> SubIndex<P>
where
    P: Permutation,
{
    /// Makes an empty sub-index, validating the configuration.
    ///
    /// This is the target for [`SubIndex::load`].
    ///
    /// ```
    /// # use mih_buckets::{BlockPermutation, SubIndex, SubIndexConfig};
    /// let perm = BlockPermutation::new(32, 4, 2).unwrap();
    /// let index = SubIndex::new(perm, SubIndexConfig::new(2).sub_index(5)).unwrap();
    /// assert!(index.is_empty());
    /// assert_eq!(index.splitter_bits(), 16);
    /// ```
    pub fn new(permutation: P, config: SubIndexConfig) -> Result<Self> {
        let splitter_bits = permutation.splitter_bits(config.sub_index_id)?;
        let strategy = config.strategy.resolve(splitter_bits)?;
        Ok(Self {
            total_bits: permutation.total_bits(),
            permutation,
            sub_index_id: config.sub_index_id,
            splitter_bits,
            max_errors: config.max_errors,
            strategy,
            count: 0,
            entries: Vec::new(),
        })
    }

    /// Builds a sub-index over `entries`.
    ///
    /// The input may be unsorted and contain duplicates; every entry is kept.
    pub fn build(permutation: P, config: SubIndexConfig, entries: &[u64]) -> Result<Self> {
        let mut index = Self::new(permutation, config)?;
        info!(
            "sub-index({}) splitter bits({}) strategy({:?}) entries({})",
            index.sub_index_id,
            index.splitter_bits,
            index.strategy,
            entries.len()
        );
        let sorted = {
            let bucket_id = |x| index.bucket_id(x);
            match index.strategy {
                BuildStrategy::ComparisonSort => build::comparison_sort(entries, bucket_id)?,
                _ => build::counting_sort(entries, index.splitter_bits, bucket_id)?,
            }
        };
        index.count = sorted.len();
        index.entries = sorted;
        Ok(index)
    }

    /// Gets the number of entries in the sub-index.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Checks if the sub-index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored entries, grouped by bucket id.
    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    /// The permutation family this sub-index takes its permutation from.
    pub fn permutation(&self) -> &P {
        &self.permutation
    }

    /// Which permutation of the family buckets the entries.
    ///
    /// ```
    /// # use mih_buckets::{BlockPermutation, SubIndex, SubIndexConfig};
    /// let perm = BlockPermutation::new(16, 4, 2).unwrap();
    /// let index = SubIndex::new(perm, SubIndexConfig::new(2).sub_index(3)).unwrap();
    /// assert_eq!(index.sub_index_id(), 3);
    /// ```
    pub fn sub_index_id(&self) -> usize {
        self.sub_index_id
    }

    /// The width of the bucket id, derived once from the permutation.
    ///
    /// ```
    /// # use mih_buckets::{BlockPermutation, SubIndex, SubIndexConfig};
    /// // Two leading blocks of 5 bits.
    /// let perm = BlockPermutation::new(20, 4, 2).unwrap();
    /// let index = SubIndex::new(perm, SubIndexConfig::default()).unwrap();
    /// assert_eq!(index.splitter_bits(), 10);
    /// ```
    pub fn splitter_bits(&self) -> u32 {
        self.splitter_bits
    }

    /// The key width of the permutation.
    ///
    /// ```
    /// # use mih_buckets::{IdentityPermutation, SubIndex, SubIndexConfig};
    /// let perm = IdentityPermutation::new(12, 4).unwrap();
    /// let index = SubIndex::new(perm, SubIndexConfig::default()).unwrap();
    /// assert_eq!(index.total_bits(), 12);
    /// ```
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// The default error budget of [`SubIndex::search`].
    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// The strategy used by [`SubIndex::build`], never `Auto`.
    pub fn strategy(&self) -> BuildStrategy {
        self.strategy
    }

    /// Computes the bucket of a key under this sub-index's permutation.
    #[inline]
    pub fn bucket_id(&self, key: u64) -> u64 {
        self.permutation.permute(self.sub_index_id, key) >> (64 - self.splitter_bits)
    }

    /// Finds the range of entries that share a bucket with `query`.
    ///
    /// The range is empty when nothing shares the bucket.
    pub fn locate(&self, query: u64) -> Range<usize> {
        let bucket = self.bucket_id(query);
        let start = self.entries.partition_point(|&e| self.bucket_id(e) < bucket);
        let end = start + self.entries[start..].partition_point(|&e| self.bucket_id(e) <= bucket);
        start..end
    }

    /// All entries that share a bucket with `query`.
    pub fn candidates(&self, query: u64) -> &[u64] {
        &self.entries[self.locate(query)]
    }

    /// Lazily yields the candidates of `query` within `errors` bits.
    ///
    /// Stored keys are not checked against the key width, so the distance is
    /// always verified unless `errors` covers all 64 bits of a word.
    pub fn matches(&self, query: u64, errors: u32) -> impl Iterator<Item = u64> + '_ {
        let candidates = self.candidates(query).iter().cloned();
        if errors >= WORD_BITS {
            Either::Left(candidates)
        } else {
            Either::Right(candidates.filter(move |&e| crate::hamming_distance(query, e) <= errors))
        }
    }

    /// Searches for the entries within `errors` (default `max_errors`) bits of
    /// `query` in the query's bucket.
    ///
    /// Returns the matches and the size of the bucket. With `candidates_only`
    /// only the bucket size is computed and the matches are always empty,
    /// which is useful for estimating how expensive a query is before
    /// running it.
    pub fn search(
        &self,
        query: u64,
        errors: Option<u32>,
        candidates_only: bool,
    ) -> (Vec<u64>, usize) {
        let errors = errors.unwrap_or(self.max_errors);
        let range = self.locate(query);
        let candidates = range.len();
        trace!(
            "search query({:016X}) errors({}) bucket({}) candidates({})",
            query,
            errors,
            self.bucket_id(query),
            candidates
        );
        if candidates_only {
            return (Vec::new(), candidates);
        }

        let mut found = if errors >= RESERVE_ERRORS {
            Vec::with_capacity(RESERVE_CAPACITY)
        } else {
            Vec::new()
        };
        found.extend(self.matches(query, errors));
        (found, candidates)
    }

    /// Counts the entries sharing a bucket with `query`.
    pub fn candidate_count(&self, query: u64) -> usize {
        self.search(query, None, true).1
    }

    /// Replaces the stored state after a successful load.
    pub(crate) fn replace_entries(&mut self, count: usize, entries: Vec<u64>) {
        self.count = count;
        self.entries = entries;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{BlockPermutation, Error, IdentityPermutation};

    fn scenario() -> SubIndex<IdentityPermutation> {
        let perm = IdentityPermutation::new(4, 2).unwrap();
        SubIndex::build(perm, SubIndexConfig::new(1), &[0b1111, 0b0000, 0b1100, 0b0011]).unwrap()
    }

    #[test]
    fn test_small_example() {
        let index = scenario();
        assert_eq!(index.len(), 4);
        assert_eq!(index.strategy(), BuildStrategy::CountingSort);
        assert_eq!(index.entries(), &[0b0000, 0b0011, 0b1111, 0b1100]);
        assert_eq!(index.locate(0b0001), 0..2);
        assert_eq!(index.search(0b0001, Some(1), false), (vec![0b0000], 2));
        assert_eq!(index.search(0b0001, None, true), (vec![], 2));
    }

    #[test]
    fn test_empty_bucket() {
        let index = scenario();
        let range = index.locate(0b0110);
        assert!(range.is_empty());
        assert_eq!(range.start, 2);
        assert_eq!(index.search(0b0110, Some(4), false), (vec![], 0));
    }

    #[test]
    fn test_errors_exceeding_width() {
        let index = scenario();
        let (mut found, candidates) = index.search(0b1101, Some(100), false);
        found.sort_unstable();
        assert_eq!(found, vec![0b1100, 0b1111]);
        assert_eq!(candidates, 2);
    }

    #[test]
    fn test_wide_keys_are_filtered() {
        // 0xFF0 is bucketed by its low 4 bits but differs from 0 in 8 bits.
        let perm = IdentityPermutation::new(4, 2).unwrap();
        let index = SubIndex::build(perm, SubIndexConfig::new(1), &[0x0, 0xFF0]).unwrap();
        assert_eq!(index.candidates(0), &[0x0, 0xFF0]);
        assert_eq!(index.search(0, Some(3), false), (vec![0x0], 2));
        assert_eq!(index.search(0, Some(4), false), (vec![0x0], 2));
        assert_eq!(index.search(0, Some(7), false), (vec![0x0], 2));
        assert_eq!(index.search(0, Some(8), false), (vec![0x0, 0xFF0], 2));
        assert_eq!(index.search(0, Some(64), false), (vec![0x0, 0xFF0], 2));
    }

    #[test]
    fn test_exact_only() {
        let index = scenario();
        assert_eq!(index.search(0b1111, Some(0), false).0, vec![0b1111]);
        assert!(index.search(0b1110, Some(0), false).0.is_empty());
    }

    #[test]
    fn test_empty_index() {
        let perm = BlockPermutation::new(64, 4, 2).unwrap();
        let index = SubIndex::build(perm, SubIndexConfig::default(), &[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.search(0xDEAD_BEEF, None, false), (vec![], 0));
        assert_eq!(index.candidate_count(0), 0);
    }

    #[test]
    fn test_large_universe_uses_comparison_sort() {
        let perm = BlockPermutation::new(64, 2, 1).unwrap();
        let index = SubIndex::build(perm, SubIndexConfig::default(), &[3, 1, 2]).unwrap();
        assert_eq!(index.splitter_bits(), 32);
        assert_eq!(index.strategy(), BuildStrategy::ComparisonSort);
        // Every entry lands in bucket 0.
        let (mut found, candidates) = index.search(1, Some(1), false);
        found.sort_unstable();
        assert_eq!(found, vec![1, 3]);
        assert_eq!(candidates, 3);
    }

    #[test]
    fn test_bad_sub_index() {
        let perm = BlockPermutation::new(16, 4, 2).unwrap();
        match SubIndex::new(perm, SubIndexConfig::default().sub_index(6)) {
            Err(Error::UnknownSubIndex { id: 6, len: 6 }) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_forced_counting_sort_too_large() {
        let perm = BlockPermutation::new(64, 1, 1).unwrap();
        let config = SubIndexConfig::default().strategy(BuildStrategy::CountingSort);
        assert!(SubIndex::new(perm, config).is_err());
    }
}
