use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bigtools::beddata::BedParserStreamingIterator;
use bigtools::{BigWigWrite, Value};
use pretty_assertions::assert_eq;
use rstest::*;
use tokio::runtime;

use multivec_core::errors::MultivecError;
use multivec_core::models::SignalTrack;
use multivec_io::{BigWigTrack, validate_inputs};

fn write_bigwig(path: &Path, chrom_sizes: &[(&str, u32)], values: &[(&str, u32, u32, f32)]) {
    let chrom_map: HashMap<String, u32> = chrom_sizes
        .iter()
        .map(|(name, size)| (name.to_string(), *size))
        .collect();

    let mut outb = BigWigWrite::create_file(path.to_string_lossy().to_string(), chrom_map)
        .expect("Failed to create bigWig file.");
    outb.options.channel_size = 0;
    let runtime = runtime::Builder::new_current_thread().build().unwrap();

    let vals = values.iter().map(|(chrom, start, end, value)| {
        Ok::<_, std::io::Error>((
            chrom.to_string(),
            Value {
                start: *start,
                end: *end,
                value: *value,
            },
        ))
    });
    let data = BedParserStreamingIterator::wrap_iter(vals, true);
    outb.write(data, runtime).expect("Failed to write bigWig file.");
}

#[fixture]
fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[fixture]
fn small_bigwig(tempdir: tempfile::TempDir) -> (tempfile::TempDir, PathBuf) {
    let path = tempdir.path().join("small.bw");
    write_bigwig(
        &path,
        &[("chr1", 1000), ("chr2", 500)],
        &[
            ("chr1", 0, 10, 1.0),
            ("chr1", 10, 20, 0.0),
            ("chr1", 100, 200, 3.5),
            ("chr2", 50, 60, 2.0),
        ],
    );
    (tempdir, path)
}

#[rstest]
fn test_open_reads_chromosomes(small_bigwig: (tempfile::TempDir, PathBuf)) {
    let (_tempdir, path) = small_bigwig;
    let track = BigWigTrack::open(&path).unwrap();

    assert_eq!(track.source(), path.as_path());
    assert_eq!(track.chrom_length("chr1"), Some(1000));
    assert_eq!(track.chrom_length("chr2"), Some(500));
    assert_eq!(track.chrom_length("chr3"), None);
}

#[rstest]
fn test_intervals_in_order(small_bigwig: (tempfile::TempDir, PathBuf)) {
    let (_tempdir, path) = small_bigwig;
    let mut track = BigWigTrack::open(&path).unwrap();

    let intervals: Vec<(u32, u32, f32)> = track
        .intervals("chr1", 0, 1000)
        .unwrap()
        .map(|i| {
            let i = i.unwrap();
            (i.start, i.end, i.value)
        })
        .collect();
    assert_eq!(
        intervals,
        vec![(0, 10, 1.0), (10, 20, 0.0), (100, 200, 3.5)]
    );
}

#[rstest]
fn test_intervals_overlapping_window(small_bigwig: (tempfile::TempDir, PathBuf)) {
    let (_tempdir, path) = small_bigwig;
    let mut track = BigWigTrack::open(&path).unwrap();

    let starts: Vec<u32> = track
        .intervals("chr1", 15, 150)
        .unwrap()
        .map(|i| i.unwrap().start)
        .collect();
    assert_eq!(starts, vec![10, 100]);
}

#[rstest]
fn test_intervals_of_unknown_chrom(small_bigwig: (tempfile::TempDir, PathBuf)) {
    let (_tempdir, path) = small_bigwig;
    let mut track = BigWigTrack::open(&path).unwrap();
    assert_eq!(track.intervals("chrUn", 0, 100).unwrap().count(), 0);
}

#[rstest]
fn test_validate_inputs(small_bigwig: (tempfile::TempDir, PathBuf)) {
    let (tempdir, path) = small_bigwig;
    assert!(validate_inputs(&[path.clone()]).is_ok());

    let bogus = tempdir.path().join("bogus.bw");
    std::fs::write(&bogus, "chr1\t0\t10\t1.0\n").unwrap();
    let err = validate_inputs(&[path, bogus.clone()]).unwrap_err();
    match err {
        MultivecError::InvalidFormat { path, .. } => assert_eq!(path, bogus),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn test_validate_no_inputs() {
    let inputs: Vec<PathBuf> = vec![];
    assert!(matches!(
        validate_inputs(&inputs),
        Err(MultivecError::EmptyInput)
    ));
}

#[rstest]
fn test_open_missing_file() {
    let err = BigWigTrack::open("does/not/exist.bw").err().unwrap();
    assert!(matches!(err, MultivecError::InvalidFormat { .. }));
}
