//! Module gathering symbol statistics for one block.
//! The block encoder uses the returned figures to take its fast exits
//! (empty input, single-symbol runs, distributions too flat to pay for
//! a code table) before any tree is built.

use crate::Error;

/// Count symbol occurrences in `src` into `count`, which is fully
/// overwritten.  Returns `(largest, max_symbol_value)` where `largest` is
/// the highest single count and `max_symbol_value` is trimmed down to the
/// highest symbol actually present.  Fails if the input contains a symbol
/// above the caller's `max_symbol_value`.
pub fn scan(src: &[u8],max_symbol_value: usize,count: &mut [u32;256]) -> Result<(u32,usize),Error> {
    *count = [0;256];
    for &b in src {
        count[b as usize] += 1;
    }
    for s in max_symbol_value+1..=255 {
        if count[s] != 0 {
            return Err(Error::MaxSymbolValueTooSmall);
        }
    }
    let mut max_sv = max_symbol_value;
    while max_sv > 0 && count[max_sv] == 0 {
        max_sv -= 1;
    }
    let largest = *count.iter().max().unwrap();
    Ok((largest,max_sv))
}

#[test]
fn counting_and_trimming() {
    let mut count = [0u32;256];
    let (largest,max_sv) = scan(&[1,1,2,3,3,3],255,&mut count).unwrap();
    assert_eq!(largest,3);
    assert_eq!(max_sv,3);
    assert_eq!(count[1],2);
    assert_eq!(count[2],1);
    assert_eq!(count[3],3);
    assert_eq!(count[4],0);
}

#[test]
fn symbol_above_bound_is_rejected() {
    let mut count = [0u32;256];
    assert_eq!(scan(&[1,2,200],100,&mut count),Err(Error::MaxSymbolValueTooSmall));
}

#[test]
fn empty_input() {
    let mut count = [0u32;256];
    let (largest,max_sv) = scan(&[],255,&mut count).unwrap();
    assert_eq!(largest,0);
    assert_eq!(max_sv,0);
}
