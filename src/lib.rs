//! # Huffblock Library
//!
//! Block-level entropy coding with length-limited canonical Huffman codes.
//! One call processes one block of up to 128 KiB:
//! * `block::compress_1x` / `block::compress_4x` encode a block into one or
//!   four independent bitstreams (four streams allow a decoder to work the
//!   payload in parallel)
//! * `block::compress_1x_repeat` / `block::compress_4x_repeat` additionally
//!   weigh reusing the code table of a previous block against emitting a
//!   fresh one
//! * `decode::decompress_1x` / `decode::decompress_4x` restore the block
//!
//! The code table is carried in a compact header, either as entropy-coded
//! weights or as packed nibbles, whichever is smaller.  Codeword lengths are
//! bounded by a caller-supplied table log (at most 12 bits).
//!
//! ## Buffer Example
//!
//! ```rs
//! use huffblock::*;
//! let data = "the rain in spain stays mainly in the plain".as_bytes();
//! let mut dst = vec![0u8; compress_bound(data.len())];
//! let mut ws = Workspace::default();
//! let n = block::compress_4x(&mut dst, data, 0, 0, &mut ws).expect("encode failed");
//! // n == 0 means "store raw", n == 1 means "RLE, dst[0] is the symbol"
//! if n >= 2 {
//!     let back = decode::decompress_4x(&dst[..n], data.len()).expect("decode failed");
//!     assert_eq!(back, data);
//! }
//! ```

pub mod histogram;
pub mod tree;
pub mod header;
pub mod block;
pub mod decode;
mod tools;

pub use tree::{CodeEntry,CodeTable,Workspace};
pub use block::RepeatState;

/// Coding Errors
#[derive(thiserror::Error,Debug,PartialEq,Eq)]
pub enum Error {
    #[error("block exceeds maximum size")]
    SrcSizeWrong,
    #[error("table log exceeds maximum")]
    TableLogTooLarge,
    #[error("max symbol value too large")]
    MaxSymbolValueTooLarge,
    #[error("max symbol value too small")]
    MaxSymbolValueTooSmall,
    #[error("destination buffer too small")]
    DstSizeTooSmall,
    #[error("corrupted header or bitstream")]
    Corruption,
    #[error("unexpected internal state")]
    Generic
}

/// highest symbol value the coder can handle
pub const SYMBOL_MAX: usize = 255;
/// hard ceiling on codeword length
pub const TABLELOG_MAX: u32 = 12;
/// codeword length bound used when the caller passes 0
pub const TABLELOG_DEFAULT: u32 = 11;
/// largest block a single call will encode
pub const BLOCKSIZE_MAX: usize = 128 * 1024;

/// Worst-case compressed size for a block of `src_size` bytes, covering the
/// table header, the stream size fields, and bit-packing overhead.  Sizing
/// `dst` with this guarantees the encoder never reports `DstSizeTooSmall`.
pub fn compress_bound(src_size: usize) -> usize {
    src_size + (src_size >> 8) + 512
}
