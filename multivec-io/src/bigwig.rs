use std::path::{Path, PathBuf};

use bigtools::BigWigRead;
use bigtools::utils::reopen::ReopenableFile;

use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::{Chromosome, IntervalIter, SignalInterval, SignalTrack};

///
/// A bigWig file opened for reading. The file is closed when the track is dropped.
///
pub struct BigWigTrack {
    path: PathBuf,
    chromosomes: Vec<Chromosome>,
    reader: BigWigRead<ReopenableFile>,
}

fn open_bigwig(path: &Path) -> Result<BigWigRead<ReopenableFile>> {
    let path_str = path.to_str().ok_or_else(|| MultivecError::InvalidFormat {
        path: path.to_path_buf(),
        reason: "path is not valid UTF-8".to_string(),
    })?;

    BigWigRead::open_file(path_str).map_err(|e| MultivecError::InvalidFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl BigWigTrack {
    ///
    /// Open a bigWig file and read its chromosome list.
    ///
    /// # Arguments
    /// - path: the path to the bigWig file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_bigwig(path)?;

        let chromosomes = reader
            .chroms()
            .iter()
            .map(|c| Chromosome::new(c.name.clone(), c.length))
            .collect();

        Ok(BigWigTrack {
            path: path.to_path_buf(),
            chromosomes,
            reader,
        })
    }
}

impl SignalTrack for BigWigTrack {
    fn source(&self) -> &Path {
        &self.path
    }

    fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    fn intervals(&mut self, chrom: &str, start: u32, end: u32) -> Result<IntervalIter<'_>> {
        // the reader rejects names it does not know; for us that just means no data
        let Some(length) = self.chrom_length(chrom) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let end = end.min(length);
        if start >= end {
            return Ok(Box::new(std::iter::empty()));
        }

        let path = self.path.clone();
        let chrom_name = chrom.to_string();
        let values = self
            .reader
            .get_interval(chrom, start, end)
            .map_err(|e| MultivecError::TrackRead {
                path: path.clone(),
                chrom: chrom_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(values.map(move |value| {
            value
                .map(|v| SignalInterval::new(v.start, v.end, v.value))
                .map_err(|e| MultivecError::TrackRead {
                    path: path.clone(),
                    chrom: chrom_name.clone(),
                    reason: e.to_string(),
                })
        })))
    }
}

///
/// Check that every input is a readable bigWig file before any data is processed.
/// Each file is opened and closed again right away; the first bad file aborts.
///
pub fn validate_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<()> {
    if inputs.is_empty() {
        return Err(MultivecError::EmptyInput);
    }

    for input in inputs {
        let input = input.as_ref();
        let reader = open_bigwig(input)?;
        log::debug!(
            "{} is a bigWig with {} chromosomes",
            input.display(),
            reader.chroms().len()
        );
    }

    Ok(())
}
