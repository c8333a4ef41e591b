pub mod bitstream;
pub mod fse;

/// position of the highest set bit, `v` must be nonzero
pub fn highbit(v: u32) -> u32 {
    31 - v.leading_zeros()
}
