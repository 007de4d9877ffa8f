//! Chunk framing: varint length-prefixed binary blocks
//!
//! A posting chunk is the concatenation of `size` frames:
//!
//! ```text
//! frame = block_len (LEB128 varint) ∥ block_bytes
//! ```
//!
//! The iterator reports each block together with its byte range in the
//! chunk and its ordinal, so callers can name the exact offset when a
//! chunk turns out to be damaged. Truncation mid-frame is an error, not
//! an end of iteration — a chunk either decodes completely or the store
//! is corrupt.

use maildex_core::{Result, SearchError};

// ============================================================================
// Varint (LEB128) codec
// ============================================================================

/// Encode a u32 as a variable-length integer (LEB128).
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from a byte slice, returning (value, bytes_consumed).
pub fn decode_varint(data: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
        shift += 7;
        if shift >= 35 {
            return None; // overflow
        }
    }
    None // truncated
}

// ============================================================================
// Frame writer
// ============================================================================

/// Append one length-prefixed block to a chunk buffer.
pub fn append_block(chunk: &mut Vec<u8>, block: &[u8]) {
    encode_varint(block.len() as u32, chunk);
    chunk.extend_from_slice(block);
}

// ============================================================================
// BlockIter
// ============================================================================

/// One framed block and where it sits in the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// The block bytes (without the length prefix)
    pub bytes: &'a [u8],
    /// Byte offset of the block within the chunk
    pub start: usize,
    /// Byte offset one past the block
    pub end: usize,
    /// Ordinal of the block within the chunk
    pub index: usize,
}

/// Iterator over the framed blocks of a chunk.
pub struct BlockIter<'a> {
    data: &'a [u8],
    pos: usize,
    index: usize,
}

impl<'a> BlockIter<'a> {
    /// Iterate the frames of `data` from the start.
    pub fn new(data: &'a [u8]) -> Self {
        BlockIter {
            data,
            pos: 0,
            index: 0,
        }
    }
}

impl<'a> Iterator for BlockIter<'a> {
    type Item = Result<Block<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let (len, consumed) = match decode_varint(&self.data[self.pos..]) {
            Some(v) => v,
            None => {
                self.pos = self.data.len();
                return Some(Err(SearchError::corruption(format!(
                    "unreadable frame length at offset {}",
                    self.pos
                ))));
            }
        };
        let start = self.pos + consumed;
        let end = start + len as usize;
        if end > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(SearchError::corruption(format!(
                "frame at offset {} claims {} bytes but only {} remain",
                start,
                len,
                self.data.len() - start
            ))));
        }
        let block = Block {
            bytes: &self.data[start..end],
            start,
            end,
            index: self.index,
        };
        self.pos = end;
        self.index += 1;
        Some(Ok(block))
    }
}
