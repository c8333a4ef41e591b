//! Module for packing variable-length codes into byte streams.
//! Codes are appended most-significant-bit first.  Two read orders are
//! provided: `BitReader` walks a stream front to back, `ReverseBitReader`
//! walks it back to front starting from a marker bit, which is how the
//! state stream of the secondary coder is laid out.

use bit_vec::BitVec;
use num_traits::PrimInt;

pub struct BitWriter {
    bits: BitVec
}

impl BitWriter {
    pub fn new() -> Self {
        Self { bits: BitVec::new() }
    }
    /// append the `nb_bits` low bits of `code`, most significant first
    pub fn put_code<T: PrimInt>(&mut self,code: T,nb_bits: u32) {
        let val = code.to_u64().unwrap();
        for i in (0..nb_bits).rev() {
            self.bits.push(val >> i & 1 > 0);
        }
    }
    pub fn len_bits(&self) -> usize {
        self.bits.len()
    }
    /// close the stream, padding the last byte with zero bits
    pub fn into_bytes(self) -> Vec<u8> {
        self.bits.to_bytes()
    }
    /// close the stream with a 1-valued marker bit so a reverse reader
    /// can find the end, then pad with zero bits
    pub fn into_marked_bytes(mut self) -> Vec<u8> {
        self.bits.push(true);
        self.bits.to_bytes()
    }
}

pub struct BitReader {
    bits: BitVec,
    ptr: usize
}

impl BitReader {
    pub fn from_bytes(dat: &[u8]) -> Self {
        Self { bits: BitVec::from_bytes(dat), ptr: 0 }
    }
    /// get the next bit, `None` when the stream is exhausted
    pub fn get_bit(&mut self) -> Option<u32> {
        let bit = self.bits.get(self.ptr)?;
        self.ptr += 1;
        Some(bit as u32)
    }
    /// get the next `nb_bits` as an MSB-first code
    pub fn get_code(&mut self,nb_bits: u32) -> Option<u32> {
        let mut ans: u32 = 0;
        for _i in 0..nb_bits {
            ans = ans << 1 | self.get_bit()?;
        }
        Some(ans)
    }
}

pub struct ReverseBitReader {
    bits: BitVec,
    pos: usize
}

impl ReverseBitReader {
    /// locate the marker bit from the end; `None` if the stream is all zero
    pub fn from_marked_bytes(dat: &[u8]) -> Option<Self> {
        let bits = BitVec::from_bytes(dat);
        for i in (0..bits.len()).rev() {
            if bits.get(i) == Some(true) {
                return Some(Self { bits, pos: i });
            }
        }
        None
    }
    /// payload bits still unread
    pub fn available(&self) -> usize {
        self.pos
    }
    /// step back over the previous `nb_bits`-wide code and return it
    pub fn read_back(&mut self,nb_bits: u32) -> Option<u32> {
        if (nb_bits as usize) > self.pos {
            return None;
        }
        self.pos -= nb_bits as usize;
        let mut ans: u32 = 0;
        for i in 0..nb_bits as usize {
            ans = ans << 1 | self.bits.get(self.pos + i).unwrap() as u32;
        }
        Some(ans)
    }
}

#[test]
fn forward_codes() {
    let mut writer = BitWriter::new();
    writer.put_code(0b101u32,3);
    writer.put_code(0b0110u32,4);
    writer.put_code(0b1u32,1);
    assert_eq!(writer.len_bits(),8);
    let bytes = writer.into_bytes();
    assert_eq!(bytes,vec![0b10101101]);
    let mut reader = BitReader::from_bytes(&bytes);
    assert_eq!(reader.get_code(3),Some(0b101));
    assert_eq!(reader.get_code(4),Some(0b0110));
    assert_eq!(reader.get_code(1),Some(1));
    assert_eq!(reader.get_bit(),None);
}

#[test]
fn reverse_codes() {
    let mut writer = BitWriter::new();
    writer.put_code(0b01u32,2);
    writer.put_code(0b111u32,3);
    writer.put_code(0b0001u32,4);
    let bytes = writer.into_marked_bytes();
    let mut reader = ReverseBitReader::from_marked_bytes(&bytes).unwrap();
    assert_eq!(reader.available(),9);
    assert_eq!(reader.read_back(4),Some(0b0001));
    assert_eq!(reader.read_back(3),Some(0b111));
    assert_eq!(reader.read_back(2),Some(0b01));
    assert_eq!(reader.available(),0);
    assert_eq!(reader.read_back(1),None);
}

#[test]
fn empty_marker_is_rejected() {
    assert!(ReverseBitReader::from_marked_bytes(&[0,0,0]).is_none());
    assert!(ReverseBitReader::from_marked_bytes(&[]).is_none());
}
