//! Binary serialization of a built sub-index.
//!
//! Only the entries are written; the permutation and configuration belong to
//! whoever loads the data and must match the writer's. The layout, all
//! little-endian, is:
//!
//! - `count: u64` - number of entries
//! - `width: u8` - bits per stored word, always 64
//! - `len: u64` - number of stored words, equal to `count`
//! - `len` words of `u64`
//!
//! Loading checks that the stream decodes but trusts that the entries are
//! grouped by bucket id for the loader's permutation.

use crate::{Error, Permutation, Result, SubIndex};
use log::debug;
use std::convert::TryFrom;
use std::io::{self, Read, Write};

const WORD_BITS: u8 = 64;

/// Words are read in chunks of this size so that a corrupt length can't
/// trigger a huge allocation before the stream runs out.
const READ_CHUNK: usize = 1 << 16;

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0; 8];
    read_exact(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::CorruptData("stream ended early"),
        _ => Error::Io(e),
    })
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    usize::try_from(read_u64(reader)?)
        .map_err(|_| Error::CorruptData("length does not fit in memory"))
}

impl<P> SubIndex<P>
where
    P: Permutation,
{
    /// The number of bytes [`SubIndex::serialize`] writes.
    pub fn serialized_size(&self) -> usize {
        8 + 1 + 8 + 8 * self.entries().len()
    }

    /// Writes the entries to `writer`, returning the number of bytes written.
    ///
    /// ```
    /// # use mih_buckets::{IdentityPermutation, SubIndex, SubIndexConfig};
    /// let perm = IdentityPermutation::new(8, 4).unwrap();
    /// let index = SubIndex::build(perm.clone(), SubIndexConfig::new(2), &[1, 2, 3]).unwrap();
    /// let mut bytes = vec![];
    /// let written = index.serialize(&mut bytes).unwrap();
    /// assert_eq!(written, bytes.len());
    ///
    /// let mut loaded = SubIndex::new(perm, SubIndexConfig::new(2)).unwrap();
    /// loaded.load(&mut &bytes[..]).unwrap();
    /// assert_eq!(loaded.entries(), index.entries());
    /// ```
    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<usize> {
        let entries = self.entries();
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        writer.write_all(&[WORD_BITS])?;
        writer.write_all(&(entries.len() as u64).to_le_bytes())?;
        for &entry in entries {
            writer.write_all(&entry.to_le_bytes())?;
        }
        let written = self.serialized_size();
        debug!("serialized sub-index({}) bytes({})", self.sub_index_id(), written);
        Ok(written)
    }

    /// Replaces the entries with those read from `reader`.
    ///
    /// On failure the sub-index is left untouched.
    pub fn load<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let count = read_len(&mut reader)?;
        let mut width = [0];
        read_exact(&mut reader, &mut width)?;
        if width[0] != WORD_BITS {
            return Err(Error::CorruptData("unsupported word width"));
        }
        let len = read_len(&mut reader)?;
        if len != count {
            return Err(Error::CorruptData("entry count does not match stored words"));
        }

        let mut entries = Vec::with_capacity(len.min(READ_CHUNK));
        let mut buf = vec![0; 8 * len.min(READ_CHUNK)];
        let mut remaining = len;
        while remaining != 0 {
            let words = remaining.min(READ_CHUNK);
            let chunk = &mut buf[..8 * words];
            read_exact(&mut reader, chunk)?;
            entries.extend(chunk.chunks_exact(8).map(|word| {
                let mut bytes = [0; 8];
                bytes.copy_from_slice(word);
                u64::from_le_bytes(bytes)
            }));
            remaining -= words;
        }

        debug!("loaded sub-index({}) entries({})", self.sub_index_id(), count);
        self.replace_entries(count, entries);
        Ok(())
    }
}
