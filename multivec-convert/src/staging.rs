//! Staging store for the finest resolution.
//!
//! Materialized windows are written here, transposed to `cells x samples`, one dataset
//! per chromosome. The pyramid is built from this file afterwards.

use std::path::{Path, PathBuf};

use ndarray::s;
use serde_json::json;

use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::Chromosome;
use multivec_io::{DatasetId, StoreReader, StoreWriter};

use crate::matrix::SignalMatrix;

pub const STAGING_FILE: &str = "staging.mvst";

struct OpenChromosome {
    name: String,
    id: DatasetId,
    next_cell: u64,
}

pub struct StagingStore {
    writer: StoreWriter,
    samples: Vec<String>,
    resolution: u32,
    current: Option<OpenChromosome>,
}

impl StagingStore {
    ///
    /// Create an empty staging store inside `dir`.
    ///
    /// # Arguments
    /// - dir: directory owned by this run
    /// - samples: sample names, one per matrix row
    /// - resolution: bases per cell
    /// - chunk_rows: maximum rows per stored chunk
    pub fn create(dir: &Path, samples: Vec<String>, resolution: u32, chunk_rows: usize) -> Result<Self> {
        let path = dir.join(STAGING_FILE);
        let writer = StoreWriter::create(&path, samples.len(), chunk_rows)
            .map_err(|e| MultivecError::storage("staging", e))?;

        log::debug!("Staging to {}", path.display());

        Ok(StagingStore {
            writer,
            samples,
            resolution,
            current: None,
        })
    }

    ///
    /// Open the dataset of a chromosome: `bins x samples`, initially missing.
    /// The previous chromosome, if any, is sealed.
    ///
    pub fn create_chromosome(&mut self, chrom: &Chromosome) -> Result<()> {
        self.seal_current()?;

        let rows = chrom.bins(self.resolution);
        let id = self
            .writer
            .add_dataset(&chrom.name, rows)
            .map_err(|e| MultivecError::storage(&chrom.name, e))?;

        self.current = Some(OpenChromosome {
            name: chrom.name.clone(),
            id,
            next_cell: 0,
        });
        Ok(())
    }

    ///
    /// Write one materialized window. Windows of a chromosome must arrive in order
    /// and without gaps, and the chromosome must be the one last created.
    ///
    pub fn write(&mut self, matrix: &SignalMatrix) -> Result<()> {
        let chunk_rows = self.writer.chunk_rows();
        let current = match self.current.as_mut() {
            Some(current) if current.name == matrix.chrom() => current,
            _ => {
                return Err(MultivecError::storage(
                    matrix.chrom(),
                    "chromosome was not created in the staging store",
                ));
            }
        };

        if matrix.first_cell() != current.next_cell {
            return Err(MultivecError::storage(
                matrix.chrom(),
                format!(
                    "expected a window starting at cell {}, got {}",
                    current.next_cell,
                    matrix.first_cell()
                ),
            ));
        }

        // cells x samples
        let transposed = matrix.values().t();
        let cells = transposed.nrows();
        for start in (0..cells).step_by(chunk_rows) {
            let end = (start + chunk_rows).min(cells);
            self.writer
                .append(current.id, transposed.slice(s![start..end, ..]))
                .map_err(|e| MultivecError::storage(&current.name, e))?;
        }
        current.next_cell += cells as u64;

        Ok(())
    }

    fn seal_current(&mut self) -> Result<()> {
        if let Some(current) = self.current.take() {
            self.writer
                .seal(current.id)
                .map_err(|e| MultivecError::storage(&current.name, e))?;
        }
        Ok(())
    }

    ///
    /// Flush everything and reopen the store for reading.
    ///
    pub fn finalize(mut self) -> Result<StoreReader> {
        self.seal_current()?;

        let attrs = json!({
            "kind": "staging",
            "resolution": self.resolution,
            "samples": self.samples,
        });
        let path: PathBuf = self
            .writer
            .finish(&attrs)
            .map_err(|e| MultivecError::storage("staging", e))?;

        StoreReader::open(&path).map_err(|e| MultivecError::storage("staging", e))
    }
}
