//! # mih-buckets
//!
//! One sub-index of a multi-index hashing scheme for range searches in
//! Hamming space.
//!
//! A [`SubIndex`] stores `u64` keys grouped by a bucket id: the leading bits of
//! the key after a bit permutation chosen by its [`Permutation`]. A search
//! finds the query's bucket with two binary searches and keeps the entries
//! within the requested number of bit errors. Several sub-indexes, one for
//! every permutation of a family, together find every key within the error
//! budget the family was designed for. Combining them is left to the caller.
//!
//! ```
//! use mih_buckets::{BlockPermutation, Permutation, SubIndex, SubIndexConfig};
//!
//! // 16 bit keys split into 4 blocks. Two keys within 2 errors agree on
//! // at least 2 whole blocks, so 6 permutations lead with every pair.
//! let perm = BlockPermutation::new(16, 4, 2).unwrap();
//! let keys = [0x0000, 0x0003, 0xFF00, 0x00F0, 0x8001];
//! let indexes = (0..perm.len())
//!     .map(|id| SubIndex::build(perm.clone(), SubIndexConfig::new(2).sub_index(id), &keys))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! let mut found = indexes
//!     .iter()
//!     .flat_map(|index| index.search(0x0001, None, false).0)
//!     .collect::<Vec<u64>>();
//! found.sort_unstable();
//! found.dedup();
//! assert_eq!(found, vec![0x0000, 0x0003, 0x8001]);
//! ```

pub mod build;
mod config;
mod error;
mod index;
mod perm;
mod persist;

pub use config::*;
pub use error::*;
pub use index::*;
pub use perm::*;

/// The number of bits that differ between `a` and `b`.
///
/// ```
/// assert_eq!(mih_buckets::hamming_distance(0b1010, 0b0110), 2);
/// ```
#[inline(always)]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
