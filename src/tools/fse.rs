//! Module providing the secondary entropy coder used on code-table weights.
//! This is a small table-based asymmetric-numeral-system codec: counts are
//! normalized to a power-of-two table, symbols are spread over the state
//! table, and encoding walks the input backward through state transitions
//! so the decoder can regenerate it front to back.  The inner table is
//! capped at 6 bits, which is plenty for the dozen-odd distinct values a
//! weight stream can contain.

use crate::Error;
use crate::TABLELOG_MAX;
use crate::tools::highbit;
use crate::tools::bitstream::{BitWriter,BitReader,ReverseBitReader};

/// inner table budget for weight streams
pub const MAX_TABLELOG: u32 = 6;
pub const MIN_TABLELOG: u32 = 5;
/// weight values fit in a nibble, so 16 symbols bounds the alphabet
const MAX_SYMBOLS: usize = 16;

#[derive(Clone,Copy,Default)]
struct SymbolTransform {
    delta_nb_bits: u32,
    delta_find_state: i32
}

/// Shrink `max_table_log` toward the accuracy the input can support.
/// `minus` is the slack subtracted from the source-size ceiling; the block
/// coder uses 1, the weight coder 2.
pub fn optimal_table_log(max_table_log: u32,src_size: usize,max_symbol_value: usize,minus: u32) -> u32 {
    let src_size = src_size.max(2);
    let max_bits_src = highbit((src_size - 1) as u32) as i64 - minus as i64;
    let min_bits_src = highbit((src_size - 1) as u32) as i64 + 1;
    let min_bits_symbols = highbit(max_symbol_value.max(1) as u32) as i64 + 2;
    let mut table_log = max_table_log as i64;
    if max_bits_src < table_log {
        table_log = max_bits_src;
    }
    let min_bits = min_bits_src.min(min_bits_symbols);
    if min_bits > table_log {
        table_log = min_bits;
    }
    table_log.clamp(MIN_TABLELOG as i64,TABLELOG_MAX as i64) as u32
}

/// Scale raw counts to sum to `1 << table_log`.  Every present symbol keeps
/// at least one slot; rounding drift is repaid against the most probable
/// symbols so the result stays a valid distribution.
fn normalize(count: &[u32;MAX_SYMBOLS],total: u32,table_log: u32,max_symbol: usize) -> [u32;MAX_SYMBOLS] {
    let target = 1u32 << table_log;
    let mut norm = [0u32;MAX_SYMBOLS];
    let mut sum = 0;
    for s in 0..=max_symbol {
        if count[s] == 0 {
            continue;
        }
        let scaled = (count[s] as u64 * target as u64 / total as u64) as u32;
        norm[s] = scaled.max(1);
        sum += norm[s];
    }
    while sum > target {
        let s = (0..=max_symbol).max_by_key(|&s| norm[s]).unwrap();
        norm[s] -= 1;
        sum -= 1;
    }
    if sum < target {
        let s = (0..=max_symbol).max_by_key(|&s| norm[s]).unwrap();
        norm[s] += target - sum;
    }
    norm
}

/// Scatter each symbol over `norm[s]` state slots with the usual
/// coprime stepping.
fn spread_symbols(norm: &[u32;MAX_SYMBOLS],table_log: u32,max_symbol: usize) -> [u8;64] {
    let table_size = 1usize << table_log;
    let step = (table_size >> 1) + (table_size >> 3) + 3;
    let mask = table_size - 1;
    let mut symbols = [0u8;64];
    let mut pos = 0;
    for s in 0..=max_symbol {
        for _i in 0..norm[s] {
            symbols[pos] = s as u8;
            pos = (pos + step) & mask;
        }
    }
    debug_assert!(pos == 0);
    symbols
}

fn build_encode_tables(norm: &[u32;MAX_SYMBOLS],table_log: u32,max_symbol: usize) -> ([u16;64],[SymbolTransform;MAX_SYMBOLS]) {
    let table_size = 1u32 << table_log;
    let symbols = spread_symbols(norm,table_log,max_symbol);
    // state table ordered by symbol sub-ranges
    let mut cumul = [0u32;MAX_SYMBOLS + 1];
    for s in 0..=max_symbol {
        cumul[s + 1] = cumul[s] + norm[s];
    }
    let mut state_table = [0u16;64];
    for u in 0..table_size as usize {
        let s = symbols[u] as usize;
        state_table[cumul[s] as usize] = (table_size as usize + u) as u16;
        cumul[s] += 1;
    }
    // per-symbol cost transforms
    let mut transforms = [SymbolTransform::default();MAX_SYMBOLS];
    let mut total: i32 = 0;
    for s in 0..=max_symbol {
        match norm[s] {
            0 => {},
            1 => {
                transforms[s] = SymbolTransform {
                    delta_nb_bits: (table_log << 16) - table_size,
                    delta_find_state: total - 1
                };
                total += 1;
            },
            n => {
                let max_bits_out = table_log - highbit(n - 1);
                transforms[s] = SymbolTransform {
                    delta_nb_bits: (max_bits_out << 16) - (n << max_bits_out),
                    delta_find_state: total - n as i32
                };
                total += n as i32;
            }
        }
    }
    (state_table,transforms)
}

fn encode_states(src: &[u8],state_table: &[u16;64],transforms: &[SymbolTransform;MAX_SYMBOLS],table_log: u32) -> Vec<u8> {
    let mut writer = BitWriter::new();
    let mut rev = src.iter().rev();
    // the first state is seeded from the last value and costs no bits
    let tt = transforms[*rev.next().unwrap() as usize];
    let nb = (tt.delta_nb_bits + (1 << 15)) >> 16;
    let seed = (nb << 16) - tt.delta_nb_bits;
    let mut state = state_table[((seed >> nb) as i32 + tt.delta_find_state) as usize] as u32;
    for &v in rev {
        let tt = transforms[v as usize];
        let nb = (state + tt.delta_nb_bits) >> 16;
        writer.put_code(state & ((1u32 << nb) - 1),nb);
        state = state_table[((state >> nb) as i32 + tt.delta_find_state) as usize] as u32;
    }
    writer.put_code(state & ((1u32 << table_log) - 1),table_log);
    writer.into_marked_bytes()
}

/// Compress a short stream of small values.  `None` means the stream is not
/// worth entropy coding (too short, a single repeated value, every value
/// unique, or no size win) and the caller should fall back to its raw
/// representation.
pub fn compress(src: &[u8]) -> Option<Vec<u8>> {
    if src.len() <= 1 || src.len() > 255 {
        return None;
    }
    let mut count = [0u32;MAX_SYMBOLS];
    let mut max_symbol = 0;
    for &v in src {
        if v as usize >= MAX_SYMBOLS {
            return None;
        }
        count[v as usize] += 1;
        if v as usize > max_symbol {
            max_symbol = v as usize;
        }
    }
    let largest = *count.iter().max().unwrap();
    if largest as usize == src.len() {
        return None;   // single repeated value
    }
    if largest == 1 {
        return None;   // every value unique
    }
    let table_log = optimal_table_log(MAX_TABLELOG,src.len(),max_symbol,2);
    let norm = normalize(&count,src.len() as u32,table_log,max_symbol);
    let (state_table,transforms) = build_encode_tables(&norm,table_log,max_symbol);

    let mut blob = vec![(max_symbol as u8) << 4 | table_log as u8,src.len() as u8];
    let mut header = BitWriter::new();
    for s in 0..=max_symbol {
        header.put_code(norm[s],table_log + 1);
    }
    blob.extend_from_slice(&header.into_bytes());
    blob.extend_from_slice(&encode_states(src,&state_table,&transforms,table_log));
    if blob.len() >= src.len() {
        return None;
    }
    Some(blob)
}

/// Inverse of `compress`.  `max_out` bounds the number of regenerated
/// values; anything inconsistent in the blob surfaces as `Corruption`.
pub fn decompress(src: &[u8],max_out: usize) -> Result<Vec<u8>,Error> {
    if src.len() < 3 {
        return Err(Error::Corruption);
    }
    let table_log = (src[0] & 15) as u32;
    let max_symbol = (src[0] >> 4) as usize;
    if table_log < 1 || table_log > MAX_TABLELOG {
        return Err(Error::Corruption);
    }
    let n_values = src[1] as usize;
    if n_values == 0 || n_values > max_out {
        return Err(Error::Corruption);
    }
    let table_size = 1u32 << table_log;
    let header_bytes = ((max_symbol + 1) * (table_log as usize + 1) + 7) / 8;
    if src.len() < 2 + header_bytes {
        return Err(Error::Corruption);
    }
    let mut norm = [0u32;MAX_SYMBOLS];
    let mut header = BitReader::from_bytes(&src[2..2 + header_bytes]);
    let mut sum = 0;
    for s in 0..=max_symbol {
        let v = header.get_code(table_log + 1).ok_or(Error::Corruption)?;
        if v > table_size {
            return Err(Error::Corruption);
        }
        norm[s] = v;
        sum += v;
    }
    if sum != table_size || norm[max_symbol] == 0 {
        return Err(Error::Corruption);
    }

    // decode table: next state and bit cost per slot
    let symbols = spread_symbols(&norm,table_log,max_symbol);
    let mut next = norm;
    let mut nb_bits = [0u8;64];
    let mut new_state = [0u16;64];
    for u in 0..table_size as usize {
        let s = symbols[u] as usize;
        let x = next[s];
        next[s] += 1;
        nb_bits[u] = (table_log - highbit(x)) as u8;
        new_state[u] = ((x << nb_bits[u]) - table_size) as u16;
    }

    let mut reader = ReverseBitReader::from_marked_bytes(&src[2 + header_bytes..]).ok_or(Error::Corruption)?;
    if reader.available() < table_log as usize {
        return Err(Error::Corruption);
    }
    let mut state = reader.read_back(table_log).unwrap() as usize;
    let mut out = Vec::with_capacity(n_values);
    loop {
        out.push(symbols[state]);
        if out.len() == n_values {
            break;
        }
        let bits = reader.read_back(nb_bits[state] as u32).ok_or(Error::Corruption)?;
        state = new_state[state] as usize + bits as usize;
    }
    if reader.available() != 0 {
        return Err(Error::Corruption);
    }
    Ok(out)
}

#[test]
fn weight_stream_round_trip() {
    // the shape a weight stream typically has: few distinct small values,
    // heavily repeated
    let src: Vec<u8> = (0..180).map(|i| match i % 9 {
        0 | 1 | 2 | 3 => 4u8,
        4 | 5 | 6 => 5,
        7 => 3,
        _ => 6
    }).collect();
    let blob = compress(&src).expect("should be compressible");
    assert!(blob.len() < src.len());
    let back = decompress(&blob,255).expect("decompression failed");
    assert_eq!(back,src);
}

#[test]
fn sparse_values_round_trip() {
    let mut src = vec![1u8;60];
    src[7] = 9;
    src[33] = 12;
    src[34] = 0;
    let blob = compress(&src).expect("should be compressible");
    let back = decompress(&blob,255).expect("decompression failed");
    assert_eq!(back,src);
}

#[test]
fn degenerate_streams_are_refused() {
    assert!(compress(&[]).is_none());
    assert!(compress(&[7]).is_none());
    assert!(compress(&[3;100]).is_none());          // single repeated value
    assert!(compress(&[0,1,2,3,4,5,6,7]).is_none()); // every value unique
}

#[test]
fn truncation_never_reproduces_the_stream() {
    let src = vec![2u8,2,2,2,3,3,3,1,1,2,2,2,3,3,1,2,2,3,2,2,2,3,3,3,1,1,2,2,2,3,3,1,2,2,3,2];
    let blob = compress(&src).expect("should be compressible");
    for cut in 0..blob.len() {
        match decompress(&blob[..cut],255) {
            Ok(other) => assert_ne!(other,src),
            Err(e) => assert_eq!(e,Error::Corruption)
        }
    }
}

#[test]
fn normalization_sums_to_table() {
    let mut count = [0u32;MAX_SYMBOLS];
    count[2] = 100;
    count[3] = 7;
    count[4] = 1;
    count[9] = 1;
    let norm = normalize(&count,109,MIN_TABLELOG,9);
    assert_eq!(norm.iter().sum::<u32>(),1 << MIN_TABLELOG);
    for s in [2,3,4,9] {
        assert!(norm[s] >= 1);
    }
}
