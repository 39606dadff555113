//! Permutation providers.
//!
//! A sub-index never looks at raw key bits directly. It asks a
//! [`Permutation`] to rearrange the key so that the blocks it should bucket
//! on sit at the very top of a 64-bit word, and it asks the same provider how
//! wide those leading blocks are. The sum of those widths is the number of
//! splitter bits.
//!
//! With `blocks` blocks of which `match_blocks` lead each permutation, two keys
//! within `blocks - match_blocks` bit errors of each other agree on at least
//! `match_blocks` whole blocks (pigeonhole). [`BlockPermutation`] enumerates
//! every choice of leading blocks, so at least one of its sub-indexes puts
//! such a pair in the same bucket.

use crate::{Error, Result};
use itertools::Itertools;

/// A family of bit permutations over a fixed key width, one per sub-index.
pub trait Permutation {
    /// Number of sub-indexes (distinct permutations) in this family.
    fn len(&self) -> usize;

    /// Width of the keys in bits.
    fn total_bits(&self) -> u32;

    /// The number of leading blocks in every permutation that form the
    /// bucket id.
    fn match_blocks(&self) -> usize;

    /// Widths of the blocks of sub-index `id`, ordered as they appear in the
    /// permuted word starting from the most significant bit.
    fn block_widths(&self, id: usize) -> &[u8];

    /// Permutes `key` for sub-index `id`.
    ///
    /// The permuted key is left-aligned in the 64-bit word so that the top
    /// bits are the leading blocks. Bits of `key` above `total_bits` are
    /// ignored.
    fn permute(&self, id: usize, key: u64) -> u64;

    /// Checks if the family has no permutations.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Derives the splitter bits of sub-index `id` from the block metadata.
    ///
    /// Fails if `id` is out of range or the leading blocks sum to zero or to
    /// more than the key width.
    fn splitter_bits(&self, id: usize) -> Result<u32> {
        if id >= self.len() {
            return Err(Error::UnknownSubIndex {
                id,
                len: self.len(),
            });
        }
        let total_bits = self.total_bits();
        if total_bits == 0 || total_bits > 64 {
            return Err(Error::InvalidKeyWidth(total_bits));
        }
        let splitter_bits = self
            .block_widths(id)
            .iter()
            .take(self.match_blocks())
            .map(|&w| u32::from(w))
            .sum::<u32>();
        if splitter_bits == 0 || splitter_bits > total_bits {
            return Err(Error::InvalidSplitterBits {
                splitter_bits,
                total_bits,
            });
        }
        Ok(splitter_bits)
    }
}

/// The most permutations a [`BlockPermutation`] will lay out.
pub const MAX_PERMUTATIONS: usize = 1 << 16;

/// Computes `n choose k`, or `None` if it exceeds `limit`.
fn binomial_within(n: usize, k: usize, limit: usize) -> Option<usize> {
    let k = k.min(n - k);
    let mut c: u128 = 1;
    for i in 0..k {
        // Exact at every step: c * (n - i) is divisible by i + 1.
        c = c * (n - i) as u128 / (i + 1) as u128;
        if c > limit as u128 {
            return None;
        }
    }
    Some(c as usize)
}

/// A mask with the low `width` bits set.
fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        !0
    } else {
        (1 << width) - 1
    }
}

/// Moves one block of `mask` bits from `src` (shift from the LSB) to `dst`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Move {
    src: u32,
    dst: u32,
    mask: u64,
}

#[derive(Clone, Debug)]
struct Layout {
    widths: Vec<u8>,
    moves: Vec<Move>,
}

/// Splits keys into contiguous blocks and produces one permutation for every
/// way to choose `match_blocks` of them to lead the word.
///
/// Block 0 holds the most significant key bits. When the width does not divide
/// evenly the leading blocks are one bit wider. Permutations are numbered in
/// lexicographic order of their chosen blocks, and the chosen blocks keep
/// their relative order, followed by the remaining blocks in order.
///
/// ```
/// # use mih_buckets::{BlockPermutation, Permutation};
/// // 8 bit keys, 4 blocks of 2 bits, bucket on 2 blocks.
/// let perm = BlockPermutation::new(8, 4, 2).unwrap();
/// assert_eq!(perm.len(), 6);
/// assert_eq!(perm.splitter_bits(0).unwrap(), 4);
/// // The first permutation keeps the block order.
/// assert_eq!(perm.permute(0, 0b1100_1001), 0b1100_1001 << 56);
/// ```
#[derive(Clone, Debug)]
pub struct BlockPermutation {
    total_bits: u32,
    match_blocks: usize,
    layouts: Vec<Layout>,
}

impl BlockPermutation {
    /// Splits `total_bits` wide keys into `blocks` blocks and lays out every
    /// permutation that leads with `match_blocks` of them.
    ///
    /// Fails if the layout is impossible or has more than
    /// [`MAX_PERMUTATIONS`] permutations.
    ///
    /// ```
    /// # use mih_buckets::{BlockPermutation, Permutation};
    /// let perm = BlockPermutation::new(64, 5, 3).unwrap();
    /// assert_eq!(perm.len(), 10);
    /// assert!(BlockPermutation::new(64, 64, 32).is_err());
    /// ```
    pub fn new(total_bits: u32, blocks: usize, match_blocks: usize) -> Result<Self> {
        if total_bits == 0 || total_bits > 64 {
            return Err(Error::InvalidKeyWidth(total_bits));
        }
        if blocks == 0 || blocks > total_bits as usize {
            return Err(Error::InvalidBlocks(format!(
                "cannot split {} bits into {} blocks",
                total_bits, blocks
            )));
        }
        if match_blocks == 0 || match_blocks > blocks {
            return Err(Error::InvalidBlocks(format!(
                "cannot lead with {} of {} blocks",
                match_blocks, blocks
            )));
        }
        let permutations = binomial_within(blocks, match_blocks, MAX_PERMUTATIONS).ok_or_else(|| {
            Error::InvalidBlocks(format!(
                "choosing {} of {} blocks needs more than {} permutations",
                match_blocks, blocks, MAX_PERMUTATIONS
            ))
        })?;

        let base = total_bits / blocks as u32;
        let extra = total_bits as usize % blocks;
        let widths = (0..blocks)
            .map(|b| if b < extra { base + 1 } else { base })
            .collect::<Vec<u32>>();
        // Shift of each block from the LSB of the unpermuted key.
        let mut srcs = Vec::with_capacity(blocks);
        let mut offset = 0;
        for &w in &widths {
            offset += w;
            srcs.push(total_bits - offset);
        }

        let mut layouts = Vec::with_capacity(permutations);
        layouts.extend((0..blocks)
            .combinations(match_blocks)
            .map(|leading| {
                let order = leading
                    .iter()
                    .cloned()
                    .chain((0..blocks).filter(|b| !leading.contains(b)))
                    .collect::<Vec<usize>>();
                let mut top = 64;
                let moves = order
                    .iter()
                    .map(|&b| {
                        top -= widths[b];
                        Move {
                            src: srcs[b],
                            dst: top,
                            mask: low_mask(widths[b]),
                        }
                    })
                    .collect();
                Layout {
                    widths: order.iter().map(|&b| widths[b] as u8).collect(),
                    moves,
                }
            }));

        Ok(Self {
            total_bits,
            match_blocks,
            layouts,
        })
    }
}

impl Permutation for BlockPermutation {
    fn len(&self) -> usize {
        self.layouts.len()
    }

    fn total_bits(&self) -> u32 {
        self.total_bits
    }

    fn match_blocks(&self) -> usize {
        self.match_blocks
    }

    fn block_widths(&self, id: usize) -> &[u8] {
        &self.layouts[id].widths
    }

    #[inline]
    fn permute(&self, id: usize, key: u64) -> u64 {
        self.layouts[id]
            .moves
            .iter()
            .fold(0, |acc, m| acc | ((key >> m.src) & m.mask) << m.dst)
    }
}

/// A single sub-index that buckets on the top `splitter_bits` of the
/// unpermuted key.
///
/// ```
/// # use mih_buckets::{IdentityPermutation, Permutation};
/// let perm = IdentityPermutation::new(4, 2).unwrap();
/// assert_eq!(perm.permute(0, 0b1100) >> 62, 0b11);
/// ```
#[derive(Clone, Debug)]
pub struct IdentityPermutation {
    total_bits: u32,
    widths: Vec<u8>,
}

impl IdentityPermutation {
    /// Buckets `total_bits` wide keys on their top `splitter_bits` bits.
    ///
    /// ```
    /// # use mih_buckets::{IdentityPermutation, Permutation};
    /// let perm = IdentityPermutation::new(16, 4).unwrap();
    /// assert_eq!(perm.block_widths(0), &[4, 12]);
    /// assert!(IdentityPermutation::new(16, 17).is_err());
    /// ```
    pub fn new(total_bits: u32, splitter_bits: u32) -> Result<Self> {
        if total_bits == 0 || total_bits > 64 {
            return Err(Error::InvalidKeyWidth(total_bits));
        }
        if splitter_bits == 0 || splitter_bits > total_bits {
            return Err(Error::InvalidSplitterBits {
                splitter_bits,
                total_bits,
            });
        }
        let mut widths = vec![splitter_bits as u8];
        if splitter_bits < total_bits {
            widths.push((total_bits - splitter_bits) as u8);
        }
        Ok(Self { total_bits, widths })
    }
}

impl Permutation for IdentityPermutation {
    fn len(&self) -> usize {
        1
    }

    fn total_bits(&self) -> u32 {
        self.total_bits
    }

    fn match_blocks(&self) -> usize {
        1
    }

    fn block_widths(&self, _id: usize) -> &[u8] {
        &self.widths
    }

    #[inline]
    fn permute(&self, _id: usize, key: u64) -> u64 {
        (key & low_mask(self.total_bits)) << (64 - self.total_bits)
    }
}
