use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn write_sample(dir: &tempfile::TempDir,name: &str,dat: &[u8]) -> STDRESULT {
    std::fs::write(dir.path().join(name),dat)?;
    Ok(())
}

fn round_trip(dat: &[u8],extra: &[&str]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    write_sample(&temp_dir,"sample",dat)?;
    let in_path: PathBuf = temp_dir.path().join("sample");
    let comp_path = temp_dir.path().join("sample.hfb");
    let out_path = temp_dir.path().join("sample.out");
    let mut cmd = Command::cargo_bin("huffblock")?;
    cmd.arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&comp_path)
        .args(extra)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("huffblock")?;
    cmd.arg("expand")
        .arg("-i").arg(&comp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    match (std::fs::read(&in_path),std::fs::read(&out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with original")
    }
    Ok(())
}

fn text_sample(len: usize) -> Vec<u8> {
    let phrase = b"the quick brown fox jumps over the lazy dog ";
    (0..len).map(|i| phrase[i % phrase.len()]).collect()
}

#[test]
fn text_compression_round_trips() -> STDRESULT {
    // spans two blocks
    round_trip(&text_sample(200_000),&[])?;
    round_trip(&text_sample(200_000),&["--single"])
}

#[test]
fn text_compression_saves_space() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let dat = text_sample(100_000);
    write_sample(&temp_dir,"sample",&dat)?;
    let comp_path = temp_dir.path().join("sample.hfb");
    let mut cmd = Command::cargo_bin("huffblock")?;
    cmd.arg("compress")
        .arg("-i").arg(temp_dir.path().join("sample"))
        .arg("-o").arg(&comp_path)
        .assert()
        .success();
    assert!(std::fs::metadata(&comp_path)?.len() < dat.len() as u64);
    Ok(())
}

#[test]
fn degenerate_files_round_trip() -> STDRESULT {
    round_trip(&[],&[])?;
    round_trip(&[0x41],&[])?;
    round_trip(&vec![0x41;300_000],&[])?;   // RLE blocks
    // pseudo random bytes over the full alphabet: stored raw
    let mut state: u32 = 0x2468_1357;
    let noise: Vec<u8> = (0..50_000).map(|_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state as u8
    }).collect();
    round_trip(&noise,&[])
}

#[test]
fn help_lists_subcommands() -> STDRESULT {
    let mut cmd = Command::cargo_bin("huffblock")?;
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compress").and(predicate::str::contains("expand")));
    Ok(())
}
