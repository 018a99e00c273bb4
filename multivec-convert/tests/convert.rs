use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bigtools::beddata::BedParserStreamingIterator;
use bigtools::{BigWigWrite, Value};
use pretty_assertions::assert_eq;
use rstest::*;
use tokio::runtime;

use multivec_convert::pyramid::dataset_name;
use multivec_convert::staging::STAGING_FILE;
use multivec_convert::{
    ChromosomeCatalog, MultiresBuilder, PyramidBuilder, Reducer, RunContext, bigwig_to_multivec,
    bigwig_to_multivec_with, convert_tracks, reconcile, stage_tracks,
};
use multivec_core::config::ConvertConfig;
use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::{ChromosomeOrder, MemoryTrack, SignalInterval};
use multivec_io::StoreReader;

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

fn same(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
}

///
/// Two tracks: `a.bw` covers chr2 and chrY, `b.bw` covers chr2 and chr10.
///
#[fixture]
fn two_tracks() -> (tempfile::TempDir, Vec<PathBuf>) {
    let tempdir = tempfile::tempdir().unwrap();
    let a = tempdir.path().join("a.bw");
    let b = tempdir.path().join("b.bw");

    write_bigwig(
        &a,
        &[("chrY", 20), ("chr2", 12)],
        &[
            ("chr2", 0, 3, 5.0),
            ("chr2", 3, 5, 0.0),
            ("chrY", 10, 20, 1.0),
        ],
    );
    write_bigwig(
        &b,
        &[("chr2", 12), ("chr10", 8)],
        &[("chr10", 0, 8, 2.0), ("chr2", 6, 12, 4.0)],
    );

    (tempdir, vec![a, b])
}

fn small_config() -> ConvertConfig {
    ConvertConfig::builder()
        .with_tile_size(4)
        .with_chunk_rows(3)
        .with_window_size(5)
        .finish()
        .unwrap()
}

#[rstest]
fn test_end_to_end(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let output = tempdir.path().join("out.multires.mv5");

    let written = bigwig_to_multivec(
        &inputs,
        Some(&output),
        &small_config(),
        &mut RunContext::quiet(),
    )
    .unwrap();
    assert_eq!(written, output);

    let store = StoreReader::open(&output).unwrap();
    assert_eq!(store.columns(), 2);
    assert_eq!(store.attrs()["samples"], serde_json::json!(["a.bw", "b.bw"]));
    assert_eq!(
        store.attrs()["chromosomes"],
        serde_json::json!([["chr2", 12], ["chr10", 8], ["chrY", 20]])
    );
    // 20 bases / 4 cells per tile
    assert_eq!(store.attrs()["resolutions"], serde_json::json!([1, 2, 4, 8]));

    let chr2 = store.read_dataset(&dataset_name(1, "chr2")).unwrap();
    let nan = f32::NAN;
    assert!(same(
        &chr2.column(0).to_vec(),
        &[5.0, 5.0, 5.0, 0.0, 0.0, nan, nan, nan, nan, nan, nan, nan]
    ));
    assert!(same(
        &chr2.column(1).to_vec(),
        &[nan, nan, nan, nan, nan, nan, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0]
    ));

    // a.bw has no chr10
    let chr10 = store.read_dataset(&dataset_name(1, "chr10")).unwrap();
    assert!(chr10.column(0).iter().all(|v| v.is_nan()));
    assert_eq!(chr10.column(1).to_vec(), vec![2.0; 8]);

    let chr2_coarse = store.read_dataset(&dataset_name(2, "chr2")).unwrap();
    assert_eq!(
        chr2_coarse.column(0).to_vec(),
        vec![10.0, 5.0, 0.0, 0.0, 0.0, 0.0]
    );

    // the coarsest level fits in one tile
    for chrom in ["chr2", "chr10", "chrY"] {
        assert!(store.dataset(&dataset_name(8, chrom)).unwrap().rows <= 4);
    }
}

#[rstest]
fn test_row_order_follows_inputs(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let reversed: Vec<PathBuf> = inputs.iter().rev().cloned().collect();
    let output = tempdir.path().join("reversed.mv5");

    bigwig_to_multivec(&reversed, Some(&output), &small_config(), &mut RunContext::quiet())
        .unwrap();

    let store = StoreReader::open(&output).unwrap();
    assert_eq!(store.attrs()["samples"], serde_json::json!(["b.bw", "a.bw"]));
    let chr10 = store.read_dataset(&dataset_name(1, "chr10")).unwrap();
    assert_eq!(chr10.column(0).to_vec(), vec![2.0; 8]);
    assert!(chr10.column(1).iter().all(|v| v.is_nan()));
}

#[rstest]
fn test_default_output_path(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let written =
        bigwig_to_multivec(&inputs, None, &small_config(), &mut RunContext::quiet()).unwrap();
    assert_eq!(written, tempdir.path().join("a.multires.mv5"));
    assert!(written.exists());
}

#[rstest]
fn test_existing_output_is_replaced(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let output = tempdir.path().join("out.mv5");
    fs::write(&output, "stale").unwrap();
    let mut previous = fs::File::open(&output).unwrap();

    bigwig_to_multivec(&inputs, Some(&output), &small_config(), &mut RunContext::quiet()).unwrap();
    assert!(StoreReader::open(&output).is_ok());

    // the old file was swapped out, not rewritten in place
    let mut stale = String::new();
    std::io::Read::read_to_string(&mut previous, &mut stale).unwrap();
    assert_eq!(stale, "stale");

    let names: Vec<String> = fs::read_dir(tempdir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("out") || name.ends_with(".partial"))
        .collect();
    assert_eq!(names, vec!["out.mv5".to_string()]);
}

#[rstest]
fn test_restrict_and_coarse_resolution(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let output = tempdir.path().join("chr2.mv5");
    let config = ConvertConfig::builder()
        .with_starting_resolution(4)
        .with_tile_size(2)
        .with_window_size(8)
        .with_chromosomes(vec!["chr2".to_string()])
        .finish()
        .unwrap();

    bigwig_to_multivec(&inputs, Some(&output), &config, &mut RunContext::quiet()).unwrap();

    let store = StoreReader::open(&output).unwrap();
    assert_eq!(store.attrs()["chromosomes"], serde_json::json!([["chr2", 12]]));
    assert!(store.dataset(&dataset_name(4, "chr10")).is_none());

    let chr2 = store.read_dataset(&dataset_name(4, "chr2")).unwrap();
    // cell 0: 3 bases at 5.0 and one at 0.0; cell 1: one base at 0.0
    assert!(same(&chr2.column(0).to_vec(), &[15.0, 0.0, f32::NAN]));
    assert!(same(&chr2.column(1).to_vec(), &[f32::NAN, 8.0, 16.0]));
}

#[rstest]
fn test_invalid_input_leaves_nothing(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, mut inputs) = two_tracks;
    let bogus = tempdir.path().join("bogus.bw");
    fs::write(&bogus, "not a bigwig").unwrap();
    inputs.push(bogus.clone());

    let output = tempdir.path().join("out.mv5");
    let err = bigwig_to_multivec(&inputs, Some(&output), &small_config(), &mut RunContext::quiet())
        .unwrap_err();

    match err {
        MultivecError::InvalidFormat { path, .. } => assert_eq!(path, bogus),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[rstest]
fn test_no_inputs() {
    let inputs: Vec<PathBuf> = vec![];
    let result = bigwig_to_multivec(
        &inputs,
        Some(Path::new("out.mv5")),
        &ConvertConfig::default(),
        &mut RunContext::quiet(),
    );
    assert!(matches!(result, Err(MultivecError::EmptyInput)));
}

struct FailingBuilder;

impl PyramidBuilder for FailingBuilder {
    fn build(
        &self,
        _input: &StoreReader,
        _catalog: &ChromosomeCatalog,
        _reducer: Reducer,
        _starting_resolution: u32,
        _tile_size: u32,
        output: &Path,
    ) -> Result<()> {
        fs::write(output, "half written")?;
        Err(MultivecError::storage("output", "disk full"))
    }
}

#[rstest]
fn test_failed_build_keeps_existing_output(two_tracks: (tempfile::TempDir, Vec<PathBuf>)) {
    let (tempdir, inputs) = two_tracks;
    let output = tempdir.path().join("out.mv5");
    fs::write(&output, "previous run").unwrap();

    let scratch = tempdir.path().join("scratch");
    fs::create_dir(&scratch).unwrap();
    let config = ConvertConfig::builder()
        .with_temp_dir(scratch.clone())
        .finish()
        .unwrap();

    let result = bigwig_to_multivec_with(
        &inputs,
        Some(&output),
        &config,
        &mut RunContext::quiet(),
        &FailingBuilder,
    );
    assert!(matches!(result, Err(MultivecError::StorageWrite { .. })));

    assert_eq!(fs::read_to_string(&output).unwrap(), "previous run");
    assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);

    let leftovers: Vec<_> = fs::read_dir(tempdir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty());
}

#[rstest]
#[case(90, 120)]
#[case(100, 110)]
#[case(105, 120)]
fn test_overflow_aborts_without_output(#[case] start: u32, #[case] end: u32) {
    let tempdir = tempfile::tempdir().unwrap();
    let output = tempdir.path().join("out.mv5");
    let mut tracks = vec![
        MemoryTrack::new("ok.bw")
            .with_chromosome("chr1", 100)
            .with_intervals("chr1", vec![SignalInterval::new(0, 100, 1.0)]),
        MemoryTrack::new("bad.bw")
            .with_chromosome("chr1", 100)
            .with_intervals(
                "chr1",
                vec![SignalInterval::new(0, 10, 2.0), SignalInterval::new(start, end, 1.0)],
            ),
    ];

    let err = convert_tracks(
        &mut tracks,
        &output,
        &ConvertConfig::default(),
        &mut RunContext::quiet(),
        &MultiresBuilder::new(vec!["ok.bw".to_string(), "bad.bw".to_string()]),
    )
    .unwrap_err();

    match err {
        MultivecError::ChromosomeOverflow {
            path,
            start: found_start,
            end: found_end,
            size,
            ..
        } => {
            assert_eq!(path, PathBuf::from("bad.bw"));
            assert_eq!((found_start, found_end, size), (start, end, 100));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
}

#[rstest]
fn test_staging_is_deterministic() {
    let tracks = vec![
        MemoryTrack::new("a.bw")
            .with_chromosome("chrUn", 30)
            .with_chromosome("chr1", 50)
            .with_intervals("chr1", vec![SignalInterval::new(3, 40, 1.25)])
            .with_intervals("chrUn", vec![SignalInterval::new(0, 30, 0.0)]),
        MemoryTrack::new("b.bw")
            .with_chromosome("chr1", 60)
            .with_intervals("chr1", vec![SignalInterval::new(50, 60, 7.0)]),
    ];
    let config = small_config();

    let stage = || {
        let dir = tempfile::tempdir().unwrap();
        let mut tracks = tracks.clone();
        let catalog = reconcile(&tracks, &ChromosomeOrder::default()).unwrap();
        stage_tracks(&mut tracks, &catalog, &config, &RunContext::quiet(), dir.path()).unwrap();
        fs::read(dir.path().join(STAGING_FILE)).unwrap()
    };

    assert_eq!(stage(), stage());
}
