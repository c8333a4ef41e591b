//! Module serializing code tables into block headers and back.
//!
//! The table travels as "weights": `table_log + 1 - nb_bits` for present
//! symbols, 0 for absent ones.  The weight of the last symbol is never
//! stored; the reader recovers it from the Kraft sum, which also pins down
//! the table log.  Two representations exist and the writer emits the
//! smaller one:
//! * entropy-coded weights behind a length byte below 128
//! * two weights per byte behind a flag byte of `128 + max_symbol_value - 1`

use crate::{Error,TABLELOG_MAX,SYMBOL_MAX};
use crate::tree::CodeTable;
use crate::tools::fse;
use crate::tools::highbit;

/// Everything `read_code_table` recovers from a header.
pub struct ReadTable {
    pub table: CodeTable,
    pub table_log: u32,
    pub max_symbol_value: usize,
    /// header bytes consumed; the payload starts here
    pub consumed: usize
}

/// Serialize `table` into `dst`, returning the number of bytes written.
pub fn write_code_table(dst: &mut [u8],table: &CodeTable,max_symbol_value: usize,table_log: u32) -> Result<usize,Error> {
    if max_symbol_value > SYMBOL_MAX {
        return Err(Error::MaxSymbolValueTooLarge);
    }
    if max_symbol_value == 0 {
        return Err(Error::Generic);
    }
    let mut bits_to_weight = [0u8;(TABLELOG_MAX + 1) as usize];
    for n in 1..=table_log as usize {
        bits_to_weight[n] = (table_log + 1 - n as u32) as u8;
    }
    let mut weights = [0u8;256];
    for n in 0..max_symbol_value {
        weights[n] = bits_to_weight[table[n].nb_bits as usize];
    }

    // entropy-coded branch, flagged by a first byte below 128
    if let Some(blob) = fse::compress(&weights[..max_symbol_value]) {
        if blob.len() > 1 && blob.len() < max_symbol_value / 2 {
            if dst.len() < blob.len() + 1 {
                return Err(Error::DstSizeTooSmall);
            }
            dst[0] = blob.len() as u8;
            dst[1..=blob.len()].copy_from_slice(&blob);
            return Ok(blob.len() + 1);
        }
    }

    // raw nibbles; a large alphabet that did not entropy-code above means
    // the block should not be Huffman coded at all
    if max_symbol_value > 127 {
        return Err(Error::Generic);
    }
    let out_size = (max_symbol_value + 1) / 2 + 1;
    if dst.len() < out_size {
        return Err(Error::DstSizeTooSmall);
    }
    dst[0] = 128 + (max_symbol_value - 1) as u8;
    weights[max_symbol_value] = 0;
    for n in (0..max_symbol_value).step_by(2) {
        dst[n / 2 + 1] = (weights[n] << 4) + weights[n + 1];
    }
    Ok(out_size)
}

/// Rebuild a code table from a header written by `write_code_table`.
/// `max_symbol_value` is the largest symbol the caller can accept; the
/// actual largest symbol comes back in the result.
pub fn read_code_table(src: &[u8],max_symbol_value: usize) -> Result<ReadTable,Error> {
    if src.is_empty() {
        return Err(Error::Corruption);
    }
    let i_size = src[0] as usize;
    let mut weights = [0u8;257];
    let (n_weights,consumed) = if i_size >= 128 {
        // raw nibbles
        let o_size = i_size - 127;
        let in_bytes = (o_size + 1) / 2;
        if src.len() < 1 + in_bytes {
            return Err(Error::Corruption);
        }
        for n in (0..o_size).step_by(2) {
            let b = src[1 + n / 2];
            weights[n] = b >> 4;
            weights[n + 1] = b & 15;
        }
        (o_size,1 + in_bytes)
    } else {
        // entropy coded
        if i_size == 0 || src.len() < 1 + i_size {
            return Err(Error::Corruption);
        }
        let vals = fse::decompress(&src[1..1 + i_size],SYMBOL_MAX)?;
        weights[..vals.len()].copy_from_slice(&vals);
        (vals.len(),1 + i_size)
    };

    // tally ranks and the Kraft sum of the explicit weights
    let mut rank_count = [0u32;(TABLELOG_MAX + 2) as usize];
    let mut weight_total: u32 = 0;
    for n in 0..n_weights {
        if weights[n] as u32 > TABLELOG_MAX {
            return Err(Error::Corruption);
        }
        rank_count[weights[n] as usize] += 1;
        if weights[n] > 0 {
            weight_total += 1 << (weights[n] - 1);
        }
    }
    if weight_total == 0 {
        return Err(Error::Corruption);
    }
    let table_log = highbit(weight_total) + 1;
    if table_log > TABLELOG_MAX {
        return Err(Error::Corruption);
    }
    // the implied last weight must close the sum to a power of two
    let rest = (1u32 << table_log) - weight_total;
    let last_weight = highbit(rest) + 1;
    if 1u32 << (last_weight - 1) != rest {
        return Err(Error::Corruption);
    }
    weights[n_weights] = last_weight as u8;
    rank_count[last_weight as usize] += 1;
    // a complete code carries an even number of maximal-length codewords,
    // and at least two of them
    if rank_count[1] < 2 || rank_count[1] & 1 != 0 {
        return Err(Error::Corruption);
    }
    let nb_symbols = n_weights + 1;
    if nb_symbols > max_symbol_value + 1 {
        return Err(Error::MaxSymbolValueTooSmall);
    }

    // lengths from weights, then canonical values in symbol order
    let mut table = CodeTable::default();
    for n in 0..nb_symbols {
        let w = weights[n];
        table[n].nb_bits = match w {
            0 => 0,
            w => (table_log + 1 - w as u32) as u8
        };
    }
    let mut nb_per_rank = [0u16;(TABLELOG_MAX + 2) as usize];
    for n in 0..nb_symbols {
        nb_per_rank[table[n].nb_bits as usize] += 1;
    }
    let mut val_per_rank = [0u16;(TABLELOG_MAX + 2) as usize];
    let mut min: u16 = 0;
    for n in (1..=table_log as usize).rev() {
        val_per_rank[n] = min;
        min += nb_per_rank[n];
        min >>= 1;
    }
    for n in 0..nb_symbols {
        let bits = table[n].nb_bits as usize;
        if bits > 0 {
            table[n].val = val_per_rank[bits];
            val_per_rank[bits] += 1;
        }
    }
    Ok(ReadTable { table,table_log,max_symbol_value: nb_symbols - 1,consumed })
}

#[cfg(test)]
use crate::tree::{build_code_table,Workspace};

#[test]
fn three_symbols_pick_the_nibble_branch() {
    let mut count = [0u32;256];
    count[0] = 1;
    count[1] = 1;
    count[2] = 2;
    let mut ws = Workspace::default();
    let mut table = CodeTable::default();
    let log = build_code_table(&mut table,&count,255,11,&mut ws).unwrap();
    let mut dst = [0u8;16];
    let n = write_code_table(&mut dst,&table,2,log).unwrap();
    // two header bytes: flag for two explicit weights, then one packed pair
    assert_eq!(n,2);
    assert_eq!(dst[..2].to_vec(),hex::decode("8111").unwrap());
    let rt = read_code_table(&dst[..n],255).unwrap();
    assert_eq!(rt.consumed,2);
    assert_eq!(rt.table_log,2);
    assert_eq!(rt.max_symbol_value,2);
    for s in 0..3 {
        assert_eq!(rt.table[s].nb_bits,table[s].nb_bits);
        assert_eq!(rt.table[s].val,table[s].val);
    }
}

#[test]
fn wide_alphabet_picks_the_compressed_branch() {
    let mut count = [0u32;256];
    for s in 0..180 {
        count[s] = 1 + (s as u32 % 3);
    }
    let mut ws = Workspace::default();
    let mut table = CodeTable::default();
    let log = build_code_table(&mut table,&count,255,11,&mut ws).unwrap();
    let mut dst = [0u8;256];
    let n = write_code_table(&mut dst,&table,179,log).unwrap();
    assert!(dst[0] < 128);
    assert!(n < 90);
    let rt = read_code_table(&dst[..n],255).unwrap();
    assert_eq!(rt.consumed,n);
    assert_eq!(rt.table_log,log);
    assert_eq!(rt.max_symbol_value,179);
    for s in 0..180 {
        assert_eq!(rt.table[s].nb_bits,table[s].nb_bits);
        assert_eq!(rt.table[s].val,table[s].val);
    }
}

#[test]
fn reader_rejects_bad_weights() {
    // three explicit weights of 12 push the Kraft sum past the table-log
    // ceiling
    let bad = [128u8 + 2,0xcc,0xc0];
    assert_eq!(read_code_table(&bad,255).err(),Some(Error::Corruption));
    // truncated nibble section
    assert_eq!(read_code_table(&[200u8,0x11],255).err(),Some(Error::Corruption));
    // empty header
    assert_eq!(read_code_table(&[],255).err(),Some(Error::Corruption));
}

#[test]
fn reader_honors_symbol_bound() {
    let mut count = [0u32;256];
    count[0] = 4;
    count[1] = 2;
    count[2] = 1;
    count[3] = 1;
    let mut ws = Workspace::default();
    let mut table = CodeTable::default();
    let log = build_code_table(&mut table,&count,255,11,&mut ws).unwrap();
    let mut dst = [0u8;16];
    let n = write_code_table(&mut dst,&table,3,log).unwrap();
    assert_eq!(read_code_table(&dst[..n],1).err(),Some(Error::MaxSymbolValueTooSmall));
}
