use huffblock::*;

fn xorshift(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

fn random_bytes(len: usize,seed: u32,alphabet: &[u8]) -> Vec<u8> {
    let mut state = seed;
    (0..len).map(|_| alphabet[xorshift(&mut state) as usize % alphabet.len()]).collect()
}

fn shuffled_zipf(num_symbols: u32,scale: u32,seed: u32) -> Vec<u8> {
    let mut src = Vec::new();
    for s in 0..num_symbols {
        src.extend(std::iter::repeat(s as u8).take((scale / (s + 1)) as usize));
    }
    let mut state = seed;
    for i in (1..src.len()).rev() {
        let j = xorshift(&mut state) as usize % (i + 1);
        src.swap(i,j);
    }
    src
}

#[test]
fn random_inputs_round_trip() {
    let alphabet: Vec<u8> = (0..16).map(|s| s * 13).collect();
    for (len,seed) in [(100,1u32),(1000,2),(10_000,3),(65_536,4)] {
        let src = random_bytes(len,seed,&alphabet);
        let mut dst = vec![0u8;compress_bound(len)];
        let mut ws = Workspace::default();
        let n = block::compress_1x(&mut dst,&src,0,0,&mut ws).unwrap();
        assert!(n >= 2 && n < len,"len {} gave {}",len,n);
        assert_eq!(decode::decompress_1x(&dst[..n],len).unwrap(),src);
        let n = block::compress_4x(&mut dst,&src,0,0,&mut ws).unwrap();
        if n >= 2 {
            assert!(n < len);
            assert_eq!(decode::decompress_4x(&dst[..n],len).unwrap(),src);
        }
    }
}

#[test]
fn length_bound_is_honored() {
    let alphabet: Vec<u8> = (0..=255u8).step_by(4).collect();
    let src = random_bytes(10_000,7,&alphabet);
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    for requested in [9u32,11,12] {
        let n = block::compress_1x(&mut dst,&src,0,requested,&mut ws).unwrap();
        assert!(n >= 2);
        let rt = header::read_code_table(&dst[..n],255).unwrap();
        assert!(rt.table_log <= requested);
        for s in 0..=rt.max_symbol_value {
            assert!(rt.table[s].nb_bits as u32 <= requested);
        }
        assert_eq!(decode::decompress_1x(&dst[..n],src.len()).unwrap(),src);
    }
}

#[test]
fn zipf_inputs_round_trip() {
    let src = shuffled_zipf(64,3000,0xdead_beef);
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    let n = block::compress_4x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decode::decompress_4x(&dst[..n],src.len()).unwrap(),src);
}

#[test]
fn adversarial_inputs() {
    let mut ws = Workspace::default();
    // all equal with one outlier
    let mut src = vec![7u8;5000];
    src[1234] = 9;
    let mut dst = vec![0u8;compress_bound(src.len())];
    let n = block::compress_1x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decode::decompress_1x(&dst[..n],src.len()).unwrap(),src);
    // two symbols
    let src = random_bytes(4096,99,&[3,200]);
    let n = block::compress_4x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decode::decompress_4x(&dst[..n],src.len()).unwrap(),src);
    // exactly one of each value: too flat, caller stores raw
    let src: Vec<u8> = (0..=255u8).collect();
    assert_eq!(block::compress_1x(&mut dst,&src,0,0,&mut ws).unwrap(),0);
}

#[test]
fn depth_limited_block_round_trips() {
    // doubling counts: seventeen symbols whose unconstrained tree runs 16
    // deep while the block stays inside the size cap, so the limiter has
    // to clamp the code to 11 bits before the payload is written
    let mut src = Vec::new();
    for s in 0..17u8 {
        src.extend(std::iter::repeat(s).take(1usize << (16 - s as u32)));
    }
    assert_eq!(src.len(),(1 << 17) - 1);
    let mut dst = vec![0u8;compress_bound(src.len())];
    let mut ws = Workspace::default();
    let n = block::compress_1x(&mut dst,&src,0,11,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    let rt = header::read_code_table(&dst[..n],255).unwrap();
    assert_eq!(rt.table_log,11);
    assert_eq!(decode::decompress_1x(&dst[..n],src.len()).unwrap(),src);
}

#[test]
fn largest_block_round_trips() {
    let alphabet: Vec<u8> = (0..8).map(|s| s * 31).collect();
    let src = random_bytes(BLOCKSIZE_MAX,42,&alphabet);
    let mut dst = vec![0u8;compress_bound(BLOCKSIZE_MAX)];
    let mut ws = Workspace::default();
    let n = block::compress_4x(&mut dst,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2 && n < src.len());
    assert_eq!(decode::decompress_4x(&dst[..n],src.len()).unwrap(),src);
}

#[test]
fn encoding_is_deterministic() {
    let src = shuffled_zipf(40,2000,0x1234_5678);
    let mut ws = Workspace::default();
    let mut first = vec![0u8;compress_bound(src.len())];
    let mut second = vec![0u8;compress_bound(src.len())];
    let n1 = block::compress_4x(&mut first,&src,0,0,&mut ws).unwrap();
    let n2 = block::compress_4x(&mut second,&src,0,0,&mut ws).unwrap();
    assert_eq!(n1,n2);
    assert_eq!(first[..n1],second[..n2]);
}

#[test]
fn preferred_repeat_reproduces_the_payload() {
    let src = shuffled_zipf(32,1500,0xcafe_f00d);
    let mut ws = Workspace::default();

    // what the ordinary path produces
    let mut full = vec![0u8;compress_bound(src.len())];
    let n = block::compress_1x(&mut full,&src,0,0,&mut ws).unwrap();
    assert!(n >= 2);

    // rebuild the same table by hand to learn where the payload starts
    let mut count = [0u32;256];
    let (_largest,max_sv) = histogram::scan(&src,255,&mut count).unwrap();
    let mut table = CodeTable::default();
    let requested = tree::optimal_table_log(TABLELOG_DEFAULT,src.len(),max_sv);
    let log = tree::build_code_table(&mut table,&count,max_sv,requested,&mut ws).unwrap();
    let mut head = vec![0u8;512];
    let h = header::write_code_table(&mut head,&table,max_sv,log).unwrap();
    assert_eq!(head[..h],full[..h]);

    // a trusted repeat table must reproduce the payload bytes exactly
    let mut old = table.clone();
    let mut state = RepeatState::Valid;
    let mut repeat_dst = vec![0u8;compress_bound(src.len())];
    let m = block::compress_1x_repeat(&mut repeat_dst,&src,0,0,&mut ws,&mut old,&mut state,true).unwrap();
    assert_eq!(state,RepeatState::Valid);
    assert_eq!(repeat_dst[..m],full[h..n]);
}

#[test]
fn stale_repeat_state_resets() {
    let mut ws = Workspace::default();
    let mut dst = vec![0u8;4096];
    // first block establishes a table over symbols 0..4
    let a = shuffled_zipf(4,400,0x1111_2222);
    let mut old = CodeTable::default();
    let mut state = RepeatState::None;
    let n = block::compress_1x_repeat(&mut dst,&a,0,0,&mut ws,&mut old,&mut state,false).unwrap();
    assert!(n >= 2);
    assert_eq!(state,RepeatState::None);
    // second block uses a symbol the stored table does not cover; under
    // Check the table is rejected and a fresh one takes its place
    let mut b = shuffled_zipf(4,400,0x3333_4444);
    for i in (0..b.len()).step_by(3) {
        b[i] = 200;
    }
    state = RepeatState::Check;
    let n = block::compress_1x_repeat(&mut dst,&b,0,0,&mut ws,&mut old,&mut state,false).unwrap();
    assert!(n >= 2);
    assert_eq!(state,RepeatState::None);
    assert!(old[200].nb_bits > 0);
    assert_eq!(decode::decompress_1x(&dst[..n],b.len()).unwrap(),b);
}
