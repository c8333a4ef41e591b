//! Module driving whole-block encoding.
//!
//! A block is scanned, a code table is selected (freshly built, or carried
//! over from an earlier block when that is estimated to be cheaper), the
//! table header is written, and the payload is emitted as one bitstream or
//! as four independent ones behind three little-endian `u16` size fields.
//! Returns follow the block contract: `Ok(0)` tells the caller to store the
//! block raw, `Ok(1)` that the block is a single-symbol run whose symbol is
//! in `dst[0]`; a compressed block is always at least 2 bytes.

use crate::{Error,Workspace,CodeTable,BLOCKSIZE_MAX,TABLELOG_MAX,TABLELOG_DEFAULT,SYMBOL_MAX};
use crate::{histogram,tree,header};
use crate::tools::bitstream::BitWriter;

/// Whether a table kept from an earlier block may be reused.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum RepeatState {
    /// no usable previous table
    None,
    /// previous table exists but must be checked against the histogram
    Check,
    /// previous table is known to cover every symbol of this block
    Valid
}

struct RepeatPolicy<'a> {
    table: &'a mut CodeTable,
    state: &'a mut RepeatState
}

/// Encode one block into a single bitstream.
pub fn compress_1x(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,ws: &mut Workspace) -> Result<usize,Error> {
    compress_internal(dst,src,max_symbol_value,table_log,false,ws,None,false)
}

/// Encode one block into four independently decodable bitstreams.
pub fn compress_4x(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,ws: &mut Workspace) -> Result<usize,Error> {
    compress_internal(dst,src,max_symbol_value,table_log,true,ws,None,false)
}

/// Single-stream encode that may reuse `old_table` from a previous block.
/// On return `old_table` holds whichever table the next block should
/// consider and `repeat` says how far it can be trusted.
pub fn compress_1x_repeat(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,ws: &mut Workspace,
                          old_table: &mut CodeTable,repeat: &mut RepeatState,prefer_repeat: bool) -> Result<usize,Error> {
    compress_internal(dst,src,max_symbol_value,table_log,false,ws,Some(RepeatPolicy { table: old_table,state: repeat }),prefer_repeat)
}

/// Four-stream variant of `compress_1x_repeat`.
pub fn compress_4x_repeat(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,ws: &mut Workspace,
                          old_table: &mut CodeTable,repeat: &mut RepeatState,prefer_repeat: bool) -> Result<usize,Error> {
    compress_internal(dst,src,max_symbol_value,table_log,true,ws,Some(RepeatPolicy { table: old_table,state: repeat }),prefer_repeat)
}

fn compress_internal(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,four_streams: bool,ws: &mut Workspace,
                     mut repeat: Option<RepeatPolicy>,prefer_repeat: bool) -> Result<usize,Error> {
    if src.is_empty() || dst.is_empty() {
        return Ok(0);
    }
    if src.len() > BLOCKSIZE_MAX {
        return Err(Error::SrcSizeWrong);
    }
    if table_log > TABLELOG_MAX {
        return Err(Error::TableLogTooLarge);
    }
    if max_symbol_value > SYMBOL_MAX {
        return Err(Error::MaxSymbolValueTooLarge);
    }
    let max_symbol_value = if max_symbol_value == 0 { SYMBOL_MAX } else { max_symbol_value };
    let table_log = if table_log == 0 { TABLELOG_DEFAULT } else { table_log };

    // a caller insisting on reuse skips even the histogram
    if prefer_repeat {
        if let Some(rp) = &mut repeat {
            if *rp.state == RepeatState::Valid {
                return compress_using_table(dst,src,rp.table,four_streams);
            }
        }
    }

    let (largest,max_symbol_value) = histogram::scan(src,max_symbol_value,&mut ws.count)?;
    if largest as usize == src.len() {
        dst[0] = src[0];
        return Ok(1);
    }
    if largest as usize <= (src.len() >> 7) + 1 {
        return Ok(0);   // distribution too flat to pay for a table
    }

    if let Some(rp) = &mut repeat {
        if *rp.state == RepeatState::Check && !rp.table.is_valid_for(&ws.count,max_symbol_value) {
            *rp.state = RepeatState::None;
        }
    }
    if prefer_repeat {
        if let Some(rp) = &mut repeat {
            if *rp.state != RepeatState::None {
                return compress_using_table(dst,src,rp.table,four_streams);
            }
        }
    }

    let res = compress_with_new_table(dst,src,max_symbol_value,table_log,four_streams,ws,&mut repeat);
    if res.is_err() {
        if let Some(rp) = &mut repeat {
            *rp.state = RepeatState::None;
        }
    }
    res
}

fn compress_with_new_table(dst: &mut [u8],src: &[u8],max_symbol_value: usize,table_log: u32,four_streams: bool,
                           ws: &mut Workspace,repeat: &mut Option<RepeatPolicy>) -> Result<usize,Error> {
    let table_log = tree::optimal_table_log(table_log,src.len(),max_symbol_value);
    let Workspace { nodes,count,table } = ws;
    let table_log = tree::build_into(nodes,table,count,max_symbol_value,table_log)?;
    log::debug!("built table: log {} over {} symbols",table_log,max_symbol_value + 1);

    let h_size = header::write_code_table(dst,table,max_symbol_value,table_log)?;

    // is the previous table still the better deal?
    if let Some(rp) = repeat {
        if *rp.state != RepeatState::None {
            let old_size = rp.table.estimated_size(count,max_symbol_value);
            let new_size = table.estimated_size(count,max_symbol_value);
            if old_size <= h_size + new_size || h_size + 12 >= src.len() {
                log::debug!("reusing previous table");
                return compress_using_table(dst,src,rp.table,four_streams);
            }
        }
    }
    if h_size + 12 >= src.len() {
        return Ok(0);
    }
    log::debug!("table header {} bytes",h_size);
    if let Some(rp) = repeat {
        *rp.state = RepeatState::None;
        *rp.table = table.clone();
    }
    let payload = compress_using_table(&mut dst[h_size..],src,table,four_streams)?;
    if payload == 0 {
        return Ok(0);
    }
    let total = h_size + payload;
    if total >= src.len() - 1 {
        return Ok(0);
    }
    Ok(total)
}

fn compress_using_table(dst: &mut [u8],src: &[u8],table: &CodeTable,four_streams: bool) -> Result<usize,Error> {
    let c_size = match four_streams {
        true => encode_4_streams(dst,src,table)?,
        false => encode_stream(dst,src,table)?
    };
    if c_size == 0 || c_size >= src.len() - 1 {
        return Ok(0);
    }
    Ok(c_size)
}

fn encode_stream(dst: &mut [u8],src: &[u8],table: &CodeTable) -> Result<usize,Error> {
    let mut writer = BitWriter::new();
    for &b in src {
        let entry = table[b as usize];
        writer.put_code(entry.val,entry.nb_bits as u32);
    }
    let bytes = writer.into_bytes();
    if bytes.len() > dst.len() {
        return Err(Error::DstSizeTooSmall);
    }
    dst[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

fn encode_4_streams(dst: &mut [u8],src: &[u8],table: &CodeTable) -> Result<usize,Error> {
    if src.len() < 12 {
        return Ok(0);   // no saving possible on inputs this small
    }
    if dst.len() < 6 {
        return Err(Error::DstSizeTooSmall);
    }
    let segment = src.len() / 4;
    let mut op = 6;
    for i in 0..4 {
        let part = match i {
            3 => &src[3 * segment..],
            i => &src[i * segment..(i + 1) * segment]
        };
        let n = encode_stream(&mut dst[op..],part,table)?;
        if i < 3 {
            if n > u16::MAX as usize {
                return Err(Error::Generic);
            }
            dst[2 * i..2 * i + 2].copy_from_slice(&(n as u16).to_le_bytes());
        }
        op += n;
    }
    Ok(op)
}

#[test]
fn empty_and_rle_exits() {
    let mut ws = Workspace::default();
    let mut dst = [0u8;64];
    assert_eq!(compress_1x(&mut dst,&[],0,0,&mut ws),Ok(0));
    assert_eq!(compress_1x(&mut dst,&[0x41],0,0,&mut ws),Ok(1));
    assert_eq!(dst[0],0x41);
    let src = [0x41u8;1000];
    assert_eq!(compress_4x(&mut dst,&src,0,0,&mut ws),Ok(1));
    assert_eq!(dst[0],0x41);
}

#[test]
fn flat_distribution_stores_raw() {
    let src: Vec<u8> = (0..=255u8).collect();
    let mut ws = Workspace::default();
    let mut dst = [0u8;512];
    assert_eq!(compress_1x(&mut dst,&src,0,0,&mut ws),Ok(0));
}

#[test]
fn oversized_block_is_rejected() {
    let src = vec![7u8;BLOCKSIZE_MAX + 1];
    let mut ws = Workspace::default();
    let mut dst = vec![0u8;1024];
    assert_eq!(compress_1x(&mut dst,&src,0,0,&mut ws),Err(Error::SrcSizeWrong));
    assert_eq!(compress_1x(&mut dst,&[1,2,3],0,13,&mut ws),Err(Error::TableLogTooLarge));
}

#[test]
fn tiny_blocks_are_not_worth_a_table() {
    // header plus margin can never beat a 10-byte block
    let src = [1u8,1,1,1,2,2,2,1,1,2];
    let mut ws = Workspace::default();
    let mut dst = [0u8;64];
    assert_eq!(compress_4x(&mut dst,&src,0,0,&mut ws),Ok(0));
}

#[cfg(test)]
use crate::{decode,compress_bound};

#[test]
fn giant_outlier_source_round_trips() {
    // the depth-limiter boundary shape: one symbol repeated 2^20 times
    // plus every other value exactly once.  The source outgrows a single
    // block, so the stages the block path is made of are driven directly.
    let mut src = vec![0u8;1 << 20];
    src.extend(1..=255u8);
    let mut count = [0u32;256];
    let (largest,max_sv) = histogram::scan(&src,255,&mut count).unwrap();
    assert_eq!(largest,1 << 20);
    assert_eq!(max_sv,255);
    let mut ws = Workspace::default();
    let mut table = CodeTable::default();
    let log = tree::build_code_table(&mut table,&count,max_sv,11,&mut ws).unwrap();
    assert!(log <= 11);
    for s in 0..256 {
        assert!(table[s].nb_bits > 0 && table[s].nb_bits as u32 <= 11);
    }
    let mut dst = vec![0u8;compress_bound(src.len())];
    let h = header::write_code_table(&mut dst,&table,max_sv,log).unwrap();
    let p = encode_stream(&mut dst[h..],&src,&table).unwrap();
    assert!(h + p < src.len());
    assert_eq!(decode::decompress_1x(&dst[..h + p],src.len()).unwrap(),src);
}

#[test]
fn checked_repeat_rejects_stale_table() {
    // old table only knows symbols 0 and 1; the new block also uses 2
    let mut old = CodeTable::default();
    old[0].nb_bits = 1;
    old[1].nb_bits = 1;
    old[1].val = 1;
    let mut state = RepeatState::Check;
    let src: Vec<u8> = std::iter::repeat(&[0u8,0,1,2][..]).take(100).flatten().copied().collect();
    let mut ws = Workspace::default();
    let mut dst = vec![0u8;1024];
    let n = compress_1x_repeat(&mut dst,&src,0,0,&mut ws,&mut old,&mut state,false).unwrap();
    assert!(n >= 2);
    // the freshly built table replaced the stale one
    assert_eq!(state,RepeatState::None);
    assert!(old[2].nb_bits > 0);
}
