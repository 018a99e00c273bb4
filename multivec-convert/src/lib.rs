//! # Conversion of bigWig tracks into multi-resolution multivec files
//!
//! The pipeline reconciles the chromosomes of every input into one catalog,
//! materializes each chromosome window by window into a dense `samples x cells`
//! matrix, stages the matrices in a chunked store inside a temporary directory, and
//! finally hands the staged data to a [`PyramidBuilder`] that writes every
//! resolution level.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use multivec_convert::{RunContext, bigwig_to_multivec};
//! use multivec_core::config::ConvertConfig;
//!
//! let inputs = vec![PathBuf::from("1_treat.bw"), PathBuf::from("2_treat.bw")];
//! let config = ConvertConfig::default();
//! let mut ctx = RunContext::quiet();
//!
//! let output = bigwig_to_multivec(&inputs, None, &config, &mut ctx).unwrap();
//! println!("wrote {}", output.display());
//! ```
pub mod catalog;
pub mod context;
pub mod matrix;
pub mod pyramid;
pub mod staging;

use std::fs;
use std::path::{Path, PathBuf};

use multivec_core::config::ConvertConfig;
use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::SignalTrack;
use multivec_core::utils::{default_output_path, sample_name};
use multivec_io::{BigWigTrack, StoreReader, validate_inputs};

pub use catalog::{ChromosomeCatalog, reconcile};
pub use context::RunContext;
pub use matrix::{SignalMatrix, fill_window, materialize_track};
pub use pyramid::{MultiresBuilder, PyramidBuilder, Reducer, nansum_pairs};
pub use staging::StagingStore;

///
/// Convert bigWig files into one multi-resolution multivec file.
///
/// # Arguments
/// - inputs: bigWig paths; their order is the row order of the output
/// - output: destination, or `None` for the first input with a `.multires.mv5` extension
/// - config: conversion parameters
/// - ctx: diagnostics and progress settings
///
/// # Returns
/// The path that was written. An existing file there is replaced.
pub fn bigwig_to_multivec<P: AsRef<Path>>(
    inputs: &[P],
    output: Option<&Path>,
    config: &ConvertConfig,
    ctx: &mut RunContext,
) -> Result<PathBuf> {
    let samples: Vec<String> = inputs.iter().map(|p| sample_name(p.as_ref())).collect();
    let builder = MultiresBuilder::new(samples)
        .with_chunk_rows(config.chunk_rows)
        .with_progress(ctx.show_progress());

    bigwig_to_multivec_with(inputs, output, config, ctx, &builder)
}

///
/// Same as [`bigwig_to_multivec`] but with a caller supplied pyramid builder.
///
pub fn bigwig_to_multivec_with<P: AsRef<Path>, B: PyramidBuilder + ?Sized>(
    inputs: &[P],
    output: Option<&Path>,
    config: &ConvertConfig,
    ctx: &mut RunContext,
    builder: &B,
) -> Result<PathBuf> {
    config.validate()?;
    let first = inputs.first().ok_or(MultivecError::EmptyInput)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(first.as_ref()));

    log::info!("Validating {} input files", inputs.len());
    validate_inputs(inputs)?;
    ctx.lap("validation");

    let mut tracks = inputs
        .iter()
        .map(BigWigTrack::open)
        .collect::<Result<Vec<_>>>()?;

    convert_tracks(&mut tracks, &output, config, ctx, builder)?;
    Ok(output)
}

///
/// Run the pipeline over already opened tracks and write `output`.
///
/// Nothing is left at `output` unless the whole run succeeds. The temporary
/// directory is removed on every path.
///
pub fn convert_tracks<T: SignalTrack, B: PyramidBuilder + ?Sized>(
    tracks: &mut [T],
    output: &Path,
    config: &ConvertConfig,
    ctx: &mut RunContext,
    builder: &B,
) -> Result<()> {
    config.validate()?;

    let catalog = reconcile(tracks, &config.chromosome_order)?;
    let catalog = match &config.chromosomes {
        Some(names) => catalog.restrict(names)?,
        None => catalog,
    };
    log::info!(
        "Reconciled {} chromosomes ({} bases) across {} tracks",
        catalog.len(),
        catalog.total_size(),
        tracks.len()
    );
    ctx.lap("chromosome reconciliation");

    let tempdir = match &config.temp_dir {
        Some(dir) => tempfile::Builder::new().prefix("multivec").tempdir_in(dir)?,
        None => tempfile::Builder::new().prefix("multivec").tempdir()?,
    };

    let staged = stage_tracks(tracks, &catalog, config, ctx, tempdir.path())?;
    ctx.lap("materialization");

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let partial = tempfile::Builder::new()
        .prefix(".multivec")
        .suffix(".partial")
        .tempfile_in(&parent)?;

    log::info!("Building pyramid into {}", output.display());
    builder.build(
        &staged,
        &catalog,
        nansum_pairs,
        config.starting_resolution,
        config.tile_size,
        partial.path(),
    )?;
    drop(staged);

    // persist renames over an existing output in one step
    if output.exists() {
        log::debug!("Replacing existing {}", output.display());
    }
    partial.persist(output).map_err(|e| MultivecError::Io(e.error))?;
    ctx.lap("pyramid");

    log::info!("Wrote {}", output.display());
    Ok(())
}

///
/// Materialize every track window by window and write the result to a staging
/// store in `dir`. Rows follow track order.
///
pub fn stage_tracks<T: SignalTrack>(
    tracks: &mut [T],
    catalog: &ChromosomeCatalog,
    config: &ConvertConfig,
    ctx: &RunContext,
    dir: &Path,
) -> Result<StoreReader> {
    let samples: Vec<String> = tracks.iter().map(|t| sample_name(t.source())).collect();
    let resolution = config.starting_resolution;
    let mut staging = StagingStore::create(dir, samples, resolution, config.chunk_rows)?;

    let bar = ctx.progress_bar(catalog.len() as u64, "Materializing");
    for chrom in catalog {
        staging.create_chromosome(chrom)?;
        for (start, end) in matrix::windows(chrom, config.window_bases()) {
            let mut window = SignalMatrix::window(chrom, tracks.len(), resolution, start, end);
            for (sample, track) in tracks.iter_mut().enumerate() {
                fill_window(track, sample, &mut window)?;
            }
            staging.write(&window)?;
        }
        log::debug!("Staged {} ({} bases)", chrom.name, chrom.size);
        bar.inc(1);
    }
    bar.finish_and_clear();

    staging.finalize()
}
