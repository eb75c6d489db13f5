mod common;

use std::fs;

use common::{archive_name, write_archive};
use himawari_arch::{decompress_file, DecompressionPool, HimawariArchError};

#[test]
fn output_name_strips_compression_suffix() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_archive(
        &tmp.path().join("in"),
        &archive_name("20230615", "0310", "03"),
        b"band three",
    );
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    let out = decompress_file(&archive, &out_dir).unwrap();
    assert_eq!(
        out,
        out_dir.join("HS_H09_20230615_0310_B03_FLDK_R10_S0110.DAT")
    );
    assert_eq!(fs::read(&out).unwrap(), b"band three");
}

#[test]
fn second_decompression_reuses_output() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_archive(tmp.path(), &archive_name("20230615", "0310", "13"), b"payload");
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    let first = decompress_file(&archive, &out_dir).unwrap();
    let bytes = fs::read(&first).unwrap();

    // a corrupted archive proves the second call never reads it
    fs::write(&archive, b"not bz2 at all").unwrap();
    let second = decompress_file(&archive, &out_dir).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), bytes);
}

#[test]
fn zero_length_output_is_regenerated() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_archive(tmp.path(), &archive_name("20230615", "0310", "08"), b"fresh");
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();
    fs::write(out_dir.join("HS_H09_20230615_0310_B08_FLDK_R10_S0110.DAT"), b"").unwrap();

    let out = decompress_file(&archive, &out_dir).unwrap();
    assert_eq!(fs::read(out).unwrap(), b"fresh");
}

#[test]
fn leftover_partial_output_is_not_reused() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = write_archive(tmp.path(), &archive_name("20230615", "0310", "04"), b"full band");
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    // what a killed run leaves behind
    let final_path = out_dir.join("HS_H09_20230615_0310_B04_FLDK_R10_S0110.DAT");
    let partial = out_dir.join("HS_H09_20230615_0310_B04_FLDK_R10_S0110.DAT.part");
    fs::write(&partial, b"full ba").unwrap();

    let out = decompress_file(&archive, &out_dir).unwrap();
    assert_eq!(out, final_path);
    assert_eq!(fs::read(&out).unwrap(), b"full band");
    assert!(!partial.exists());
}

#[test]
fn corrupt_archive_leaves_no_output() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join(archive_name("20230615", "0310", "01"));
    fs::write(&archive, b"garbage").unwrap();
    let out_dir = tmp.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    let res = decompress_file(&archive, &out_dir);
    assert!(matches!(res, Err(HimawariArchError::Decompression { .. })));
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
}

#[test]
fn pool_returns_one_entry_per_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let in_dir = tmp.path().join("in");
    let out_dir = tmp.path().join("out");

    let mut archives: Vec<_> = ["01", "02", "03", "04", "07", "08", "13"]
        .iter()
        .map(|band| {
            write_archive(
                &in_dir,
                &archive_name("20230615", "0310", band),
                format!("band {}", band).as_bytes(),
            )
        })
        .collect();

    let broken = in_dir.join(archive_name("20230615", "0310", "05"));
    fs::write(&broken, b"truncated").unwrap();
    archives.push(broken.clone());
    let missing = in_dir.join(archive_name("20230615", "0310", "06"));
    archives.push(missing.clone());

    let result = DecompressionPool::new(3).run(&archives, &out_dir);

    assert_eq!(result.len(), archives.len());
    assert_eq!(result.successes().len(), archives.len() - 2);
    assert_eq!(result.failures().len(), 2);
    assert!(result.get(&broken).unwrap().is_err());
    assert!(result.get(&missing).unwrap().is_err());

    for out in result.successes() {
        assert!(fs::metadata(&out).unwrap().len() > 0);
    }
    // failed entries leave nothing behind
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), archives.len() - 2);
}

#[test]
fn pool_with_single_worker_and_no_input() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = DecompressionPool::new(0);
    assert_eq!(pool.max_workers(), 1);
    assert!(pool.run(&[], tmp.path()).is_empty());
}
