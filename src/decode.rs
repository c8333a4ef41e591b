//! Module restoring blocks produced by the block encoder.
//!
//! The header gives back the codeword lengths; a canonical code needs
//! nothing else.  Decoding keeps, per length, the first codeword value and
//! an offset into a symbol list ordered by (length, symbol), and matches
//! the accumulated bits against those ranges one bit at a time.  The caller
//! supplies the decompressed size, which the surrounding block framing
//! always knows; raw and RLE blocks never reach this module.

use crate::{Error,SYMBOL_MAX,TABLELOG_MAX};
use crate::tree::CodeTable;
use crate::header;
use crate::tools::bitstream::BitReader;

struct CanonicalDecoder {
    table_log: u32,
    nb_per_rank: [u16;(TABLELOG_MAX + 1) as usize],
    val_base: [u16;(TABLELOG_MAX + 1) as usize],
    rank_offset: [u16;(TABLELOG_MAX + 1) as usize],
    symbols: Vec<u8>
}

impl CanonicalDecoder {
    fn new(table: &CodeTable,table_log: u32,max_symbol_value: usize) -> Self {
        let mut nb_per_rank = [0u16;(TABLELOG_MAX + 1) as usize];
        for s in 0..=max_symbol_value {
            nb_per_rank[table[s].nb_bits as usize] += 1;
        }
        let mut val_base = [0u16;(TABLELOG_MAX + 1) as usize];
        let mut min: u16 = 0;
        for n in (1..=table_log as usize).rev() {
            val_base[n] = min;
            min += nb_per_rank[n];
            min >>= 1;
        }
        let mut rank_offset = [0u16;(TABLELOG_MAX + 1) as usize];
        let mut symbols = Vec::new();
        for n in 1..=table_log as usize {
            rank_offset[n] = symbols.len() as u16;
            for s in 0..=max_symbol_value {
                if table[s].nb_bits as usize == n {
                    symbols.push(s as u8);
                }
            }
        }
        Self { table_log,nb_per_rank,val_base,rank_offset,symbols }
    }
    fn decode_symbol(&self,reader: &mut BitReader) -> Result<u8,Error> {
        let mut code: u32 = 0;
        for n in 1..=self.table_log as usize {
            code = code << 1 | reader.get_bit().ok_or(Error::Corruption)?;
            let base = self.val_base[n] as u32;
            let width = self.nb_per_rank[n] as u32;
            if width > 0 && code >= base && code < base + width {
                return Ok(self.symbols[(self.rank_offset[n] as u32 + code - base) as usize]);
            }
        }
        Err(Error::Corruption)
    }
}

fn decode_stream(dec: &CanonicalDecoder,src: &[u8],count: usize) -> Result<Vec<u8>,Error> {
    let mut reader = BitReader::from_bytes(src);
    let mut out = Vec::with_capacity(count);
    for _i in 0..count {
        out.push(dec.decode_symbol(&mut reader)?);
    }
    Ok(out)
}

/// Restore a single-stream block of known decompressed size.
pub fn decompress_1x(src: &[u8],dst_size: usize) -> Result<Vec<u8>,Error> {
    let rt = header::read_code_table(src,SYMBOL_MAX)?;
    let dec = CanonicalDecoder::new(&rt.table,rt.table_log,rt.max_symbol_value);
    decode_stream(&dec,&src[rt.consumed..],dst_size)
}

/// Restore a four-stream block of known decompressed size.
pub fn decompress_4x(src: &[u8],dst_size: usize) -> Result<Vec<u8>,Error> {
    let rt = header::read_code_table(src,SYMBOL_MAX)?;
    let dec = CanonicalDecoder::new(&rt.table,rt.table_log,rt.max_symbol_value);
    let rest = &src[rt.consumed..];
    if rest.len() < 6 {
        return Err(Error::Corruption);
    }
    let sizes = [
        u16::from_le_bytes([rest[0],rest[1]]) as usize,
        u16::from_le_bytes([rest[2],rest[3]]) as usize,
        u16::from_le_bytes([rest[4],rest[5]]) as usize
    ];
    let segment = dst_size / 4;
    let mut out = Vec::with_capacity(dst_size);
    let mut ip = 6;
    for i in 0..4 {
        let part = match i {
            3 => &rest[ip..],
            i => {
                if ip + sizes[i] > rest.len() {
                    return Err(Error::Corruption);
                }
                &rest[ip..ip + sizes[i]]
            }
        };
        let count = match i {
            3 => dst_size - 3 * segment,
            _ => segment
        };
        out.extend_from_slice(&decode_stream(&dec,part,count)?);
        ip += part.len();
    }
    Ok(out)
}

#[cfg(test)]
use crate::{block,tree,compress_bound,Workspace};

#[test]
fn single_stream_round_trip() {
    let src: Vec<u8> = (0..2000).map(|i| b"abbcccddddeeeee"[i % 15]).collect();
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    let n = block::compress_1x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decompress_1x(&dst[..n],src.len()).unwrap(),src);
}

#[test]
fn four_stream_round_trip() {
    let src: Vec<u8> = (0..5003).map(|i| b"abbcccddddeeeee"[i % 15]).collect();
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    let n = block::compress_4x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decompress_4x(&dst[..n],src.len()).unwrap(),src);
}

#[test]
fn concatenated_codewords_decode_prefix_free() {
    let mut count = [0u32;256];
    count[10] = 50;
    count[20] = 20;
    count[30] = 9;
    count[40] = 3;
    count[50] = 1;
    let mut ws = Workspace::default();
    let mut table = tree::CodeTable::default();
    let log = tree::build_code_table(&mut table,&count,255,11,&mut ws).unwrap();
    let dec = CanonicalDecoder::new(&table,log,50);
    let msg = [10u8,50,10,40,30,10,20,20,10,50];
    let mut writer = crate::tools::bitstream::BitWriter::new();
    for &s in &msg {
        writer.put_code(table[s as usize].val,table[s as usize].nb_bits as u32);
    }
    let bytes = writer.into_bytes();
    assert_eq!(decode_stream(&dec,&bytes,msg.len()).unwrap(),msg.to_vec());
}

#[test]
fn truncated_payload_is_corrupt() {
    let src: Vec<u8> = (0..500).map(|i| b"aaabbc"[i % 6]).collect();
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    let n = block::compress_1x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2);
    assert_eq!(decompress_1x(&dst[..n - 1],src.len()).err(),Some(Error::Corruption));
}
