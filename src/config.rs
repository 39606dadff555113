use crate::{Error, Result};

/// Bucket spaces up to `2^SMALL_UNIVERSE_BITS` are built with a counting sort.
///
/// Above this the prefix-sum array dominates the cost of the build, so
/// [`BuildStrategy::Auto`] switches to a comparison sort.
pub const SMALL_UNIVERSE_BITS: u32 = 28;

/// The largest bucket space a counting sort may be forced onto.
///
/// At this size the prefix sums alone take `8 * 2^32` bytes (32 GiB on 64-bit
/// targets). This bound only keeps the bucket space addressable; it does not
/// promise the memory is available.
pub const MAX_COUNTING_BITS: u32 = 32;

/// How the entries get grouped by bucket id.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildStrategy {
    /// Counting sort up to [`SMALL_UNIVERSE_BITS`], comparison sort above it.
    Auto,
    /// Stable counting sort over the whole bucket space.
    CountingSort,
    /// Unstable comparison sort keyed on bucket id.
    ComparisonSort,
}

impl BuildStrategy {
    /// Picks the concrete strategy for a bucket space of `2^splitter_bits`.
    ///
    /// Never returns `Auto`.
    pub fn resolve(self, splitter_bits: u32) -> Result<Self> {
        match self {
            BuildStrategy::Auto if splitter_bits <= SMALL_UNIVERSE_BITS => {
                Ok(BuildStrategy::CountingSort)
            }
            BuildStrategy::Auto => Ok(BuildStrategy::ComparisonSort),
            BuildStrategy::CountingSort if splitter_bits > MAX_COUNTING_BITS => {
                Err(Error::BucketSpaceTooLarge(splitter_bits))
            }
            strategy => Ok(strategy),
        }
    }
}

impl Default for BuildStrategy {
    fn default() -> Self {
        BuildStrategy::Auto
    }
}

/// Construction parameters of a sub-index.
///
/// The key width and splitter bits come from the permutation; this only
/// carries what the permutation does not know.
///
/// ```
/// # use mih_buckets::{BuildStrategy, SubIndexConfig};
/// let config = SubIndexConfig::new(4)
///     .sub_index(2)
///     .strategy(BuildStrategy::ComparisonSort);
/// assert_eq!(config.max_errors, 4);
/// assert_eq!(config.sub_index_id, 2);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubIndexConfig {
    /// Default error budget for searches.
    pub max_errors: u32,
    /// Which permutation of the family this sub-index uses.
    pub sub_index_id: usize,
    /// How [`SubIndex::build`](crate::SubIndex::build) groups the entries.
    pub strategy: BuildStrategy,
}

impl SubIndexConfig {
    /// Makes a config for sub-index 0 with the `Auto` strategy.
    ///
    /// ```
    /// # use mih_buckets::{BuildStrategy, SubIndexConfig};
    /// let config = SubIndexConfig::new(2);
    /// assert_eq!(config.sub_index_id, 0);
    /// assert_eq!(config.strategy, BuildStrategy::Auto);
    /// ```
    pub fn new(max_errors: u32) -> Self {
        Self {
            max_errors,
            ..Self::default()
        }
    }

    /// Selects the permutation of the family to use.
    pub fn sub_index(self, sub_index_id: usize) -> Self {
        Self {
            sub_index_id,
            ..self
        }
    }

    /// Overrides how the entries get grouped by bucket id.
    pub fn strategy(self, strategy: BuildStrategy) -> Self {
        Self { strategy, ..self }
    }
}

impl Default for SubIndexConfig {
    fn default() -> Self {
        Self {
            max_errors: 3,
            sub_index_id: 0,
            strategy: BuildStrategy::Auto,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve() {
        use BuildStrategy::*;
        assert_eq!(Auto.resolve(1).unwrap(), CountingSort);
        assert_eq!(Auto.resolve(28).unwrap(), CountingSort);
        assert_eq!(Auto.resolve(29).unwrap(), ComparisonSort);
        assert_eq!(CountingSort.resolve(32).unwrap(), CountingSort);
        assert!(CountingSort.resolve(33).is_err());
        assert_eq!(ComparisonSort.resolve(2).unwrap(), ComparisonSort);
    }
}
