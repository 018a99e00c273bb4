use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

use crate::consts::OUTPUT_SUFFIX;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Read a list of input files, one path per line. Blank lines and lines
/// starting with `#` are skipped; the order of the file is kept.
///
pub fn read_input_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let reader = get_dynamic_reader(path.as_ref())?;

    let mut inputs = Vec::new();
    for line in reader.lines() {
        let line = line.with_context(|| {
            format!("Failed to read input list {}", path.as_ref().display())
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        inputs.push(PathBuf::from(line));
    }

    Ok(inputs)
}

///
/// Output path used when none is given: the first input with its extension
/// replaced by [`OUTPUT_SUFFIX`], e.g. `data/a.bw` -> `data/a.multires.mv5`.
///
pub fn default_output_path(first_input: &Path) -> PathBuf {
    first_input.with_extension(OUTPUT_SUFFIX)
}

///
/// File name of a track, used to label samples in the output.
///
pub fn sample_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
