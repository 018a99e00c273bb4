use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ArgMatches;

use multivec_convert::{RunContext, bigwig_to_multivec};
use multivec_core::config::{ConvertConfig, ConvertConfigBuilder};
use multivec_core::utils::read_input_list;

/// Collect positional inputs and the input list, positional first, order kept.
fn collect_inputs(matches: &ArgMatches) -> Result<Vec<PathBuf>> {
    let mut inputs: Vec<PathBuf> = matches
        .get_many::<String>("inputs")
        .unwrap_or_default()
        .map(PathBuf::from)
        .collect();

    if let Some(list) = matches.get_one::<String>("input-list") {
        inputs.extend(read_input_list(list)?);
    }

    if inputs.is_empty() {
        bail!("No input files given. Pass bigWig paths or --input-list.");
    }
    Ok(inputs)
}

/// Config file first, then command line flags on top.
fn build_config(matches: &ArgMatches) -> Result<ConvertConfig> {
    let base = match matches.get_one::<String>("config") {
        Some(path) => ConvertConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => ConvertConfig::default(),
    };

    let mut builder = ConvertConfigBuilder::from_config(base);
    if let Some(tile_size) = matches.get_one::<u32>("tile-size") {
        builder = builder.with_tile_size(*tile_size);
    }
    if let Some(resolution) = matches.get_one::<u32>("starting-resolution") {
        builder = builder.with_starting_resolution(*resolution);
    }
    if let Some(chroms) = matches.get_many::<String>("chrom") {
        builder = builder.with_chromosomes(chroms.cloned().collect());
    }
    if let Some(dir) = matches.get_one::<String>("temp-dir") {
        builder = builder.with_temp_dir(PathBuf::from(dir));
    }

    Ok(builder.finish()?)
}

pub fn run_convert(matches: &ArgMatches) -> Result<()> {
    let inputs = collect_inputs(matches)?;
    let config = build_config(matches)?;
    let output = matches.get_one::<String>("output").map(Path::new);

    let mut ctx = RunContext::new(matches.get_flag("debug"), !matches.get_flag("no-progress"));

    let written = bigwig_to_multivec(&inputs, output, &config, &mut ctx)
        .with_context(|| format!("Failed to convert {} bigWig files", inputs.len()))?;

    log::info!(
        "Converted {} tracks into {} in {:.2?}",
        inputs.len(),
        written.display(),
        ctx.elapsed()
    );

    Ok(())
}
