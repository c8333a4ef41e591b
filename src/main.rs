use clap::{arg,crate_version,Command};
use huffblock::{block,decode,compress_bound,Workspace,BLOCKSIZE_MAX};

const RCH: &str = "unreachable was reached";

/// container magic for the demo framing
const MAGIC: [u8;4] = *b"hfb1";
const KIND_RAW: u8 = 0;
const KIND_RLE: u8 = 1;
const KIND_HUFF_1X: u8 = 2;
const KIND_HUFF_4X: u8 = 3;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Compress:      `huffblock compress -i my_file -o my_file.hfb`
Expand:        `huffblock expand -i my_file.hfb -o my_file`";

    let mut main_cmd = Command::new("huffblock")
        .about("Compress and expand files block by block")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(--single "use one bitstream per block instead of four"))
        .about("compress a file"));
    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let single = cmd.get_flag("single");
        let dat = std::fs::read(path_in)?;
        std::fs::write(path_out,compress_file(&dat,single)?)?;
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let dat = std::fs::read(path_in)?;
        std::fs::write(path_out,expand_file(&dat)?)?;
    }

    Ok(())
}

/// Frame each block as kind, raw length, stored length, payload.
fn compress_file(dat: &[u8],single: bool) -> Result<Vec<u8>,huffblock::Error> {
    let mut out: Vec<u8> = MAGIC.to_vec();
    let mut ws = Workspace::default();
    let mut dst = vec![0u8;compress_bound(BLOCKSIZE_MAX)];
    for chunk in dat.chunks(BLOCKSIZE_MAX) {
        let n = match single {
            true => block::compress_1x(&mut dst,chunk,0,0,&mut ws)?,
            false => block::compress_4x(&mut dst,chunk,0,0,&mut ws)?
        };
        let (kind,payload): (u8,&[u8]) = match n {
            0 => (KIND_RAW,chunk),
            1 => (KIND_RLE,&dst[..1]),
            n => (if single { KIND_HUFF_1X } else { KIND_HUFF_4X },&dst[..n])
        };
        out.push(kind);
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
    }
    Ok(out)
}

fn expand_file(dat: &[u8]) -> Result<Vec<u8>,huffblock::Error> {
    if dat.len() < 4 || dat[..4] != MAGIC {
        return Err(huffblock::Error::Corruption);
    }
    let mut out = Vec::new();
    let mut ip = 4;
    while ip < dat.len() {
        if ip + 9 > dat.len() {
            return Err(huffblock::Error::Corruption);
        }
        let kind = dat[ip];
        let raw_len = u32::from_le_bytes(dat[ip + 1..ip + 5].try_into().expect(RCH)) as usize;
        let stored = u32::from_le_bytes(dat[ip + 5..ip + 9].try_into().expect(RCH)) as usize;
        ip += 9;
        if ip + stored > dat.len() || raw_len > BLOCKSIZE_MAX {
            return Err(huffblock::Error::Corruption);
        }
        let payload = &dat[ip..ip + stored];
        ip += stored;
        match kind {
            KIND_RAW => {
                if payload.len() != raw_len {
                    return Err(huffblock::Error::Corruption);
                }
                out.extend_from_slice(payload);
            },
            KIND_RLE => {
                if payload.len() != 1 {
                    return Err(huffblock::Error::Corruption);
                }
                out.extend_from_slice(&vec![payload[0];raw_len]);
            },
            KIND_HUFF_1X => out.extend_from_slice(&decode::decompress_1x(payload,raw_len)?),
            KIND_HUFF_4X => out.extend_from_slice(&decode::decompress_4x(payload,raw_len)?),
            _ => return Err(huffblock::Error::Corruption)
        }
    }
    Ok(out)
}
