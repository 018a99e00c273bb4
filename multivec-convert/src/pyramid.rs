//! Multi-resolution pyramid.
//!
//! The finest level is copied from the staging store. Each coarser level halves the
//! number of cells by combining adjacent pairs with a [`Reducer`], until every
//! chromosome fits in a single tile.

use std::path::Path;

use indicatif::ProgressBar;
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use serde_json::json;

use multivec_core::consts::MISSING;
use multivec_core::errors::{MultivecError, Result};
use multivec_io::{DatasetId, StoreReader, StoreWriter};

use crate::catalog::ChromosomeCatalog;

/// Output format version written to the attributes.
pub const MULTIRES_VERSION: u32 = 1;

///
/// Combines adjacent column pairs of a `samples x cells` block into
/// `samples x ceil(cells / 2)`.
///
pub type Reducer = fn(ArrayView2<f32>) -> Array2<f32>;

///
/// Sum each pair of adjacent columns, ignoring missing values. A pair where both
/// values are missing sums to 0, and a trailing odd column is paired with a missing value.
///
pub fn nansum_pairs(block: ArrayView2<f32>) -> Array2<f32> {
    let (rows, cols) = block.dim();
    Array2::from_shape_fn((rows, cols.div_ceil(2)), |(r, c)| {
        let left = block[[r, 2 * c]];
        let right = if 2 * c + 1 < cols {
            block[[r, 2 * c + 1]]
        } else {
            MISSING
        };
        [left, right].iter().filter(|v| !v.is_nan()).sum()
    })
}

///
/// Builds the final multi-resolution output from the staging store.
///
pub trait PyramidBuilder {
    ///
    /// # Arguments
    /// - input: the staging store, one `bins x samples` dataset per chromosome
    /// - catalog: chromosomes to include, in output order
    /// - reducer: pair aggregation used between levels
    /// - starting_resolution: bases per cell of the staged data
    /// - tile_size: cells per tile
    /// - output: destination file
    fn build(
        &self,
        input: &StoreReader,
        catalog: &ChromosomeCatalog,
        reducer: Reducer,
        starting_resolution: u32,
        tile_size: u32,
        output: &Path,
    ) -> Result<()>;
}

///
/// Resolutions of every level, finest first. Levels are added until the largest
/// chromosome fits in one tile.
///
pub fn pyramid_resolutions(max_size: u32, starting_resolution: u32, tile_size: u32) -> Vec<u64> {
    let tile_size = tile_size.max(1) as u64;
    let mut resolution = starting_resolution.max(1) as u64;
    let mut resolutions = vec![resolution];
    while (max_size as u64).div_ceil(resolution) > tile_size {
        resolution *= 2;
        resolutions.push(resolution);
    }
    resolutions
}

/// Dataset name of a chromosome at one level.
pub fn dataset_name(resolution: u64, chrom: &str) -> String {
    format!("resolutions/{resolution}/{chrom}")
}

///
/// Default builder: writes every level into one chunked store, with datasets
/// named `resolutions/<bases per cell>/<chromosome>`, each `cells x samples`.
///
pub struct MultiresBuilder {
    samples: Vec<String>,
    chunk_rows: usize,
    show_progress: bool,
}

impl MultiresBuilder {
    pub fn new(samples: Vec<String>) -> Self {
        MultiresBuilder {
            samples,
            chunk_rows: multivec_core::consts::DEFAULT_CHUNK_ROWS,
            show_progress: false,
        }
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

///
/// Per-level state while streaming one chromosome: the dataset of each level and
/// the unpaired row left over from the previous block, if any.
///
struct Cascade<'a> {
    chrom: &'a str,
    ids: Vec<DatasetId>,
    carries: Vec<Option<Array2<f32>>>,
    reducer: Reducer,
}

impl Cascade<'_> {
    /// Write `block` (`rows x samples`) at `level` and feed the levels above it.
    fn push(&mut self, writer: &mut StoreWriter, level: usize, block: Array2<f32>) -> Result<()> {
        let mut level = level;
        let mut block = block;

        loop {
            writer
                .append(self.ids[level], block.view())
                .map_err(|e| MultivecError::storage(self.chrom, e))?;

            if level + 1 == self.ids.len() {
                return Ok(());
            }

            if let Some(carry) = self.carries[level].take() {
                block = concatenate(Axis(0), &[carry.view(), block.view()])
                    .map_err(|e| MultivecError::storage(self.chrom, e))?;
            }
            if block.nrows() % 2 == 1 {
                let last = block.nrows() - 1;
                self.carries[level] = Some(block.slice(s![last.., ..]).to_owned());
                block = block.slice(s![..last, ..]).to_owned();
            }
            if block.nrows() == 0 {
                return Ok(());
            }

            block = self.reduce(block.view())?;
            level += 1;
        }
    }

    /// Flush leftover rows upwards, pairing each with a missing value.
    fn finish(&mut self, writer: &mut StoreWriter) -> Result<()> {
        for level in 0..self.ids.len().saturating_sub(1) {
            if let Some(carry) = self.carries[level].take() {
                let reduced = self.reduce(carry.view())?;
                self.push(writer, level + 1, reduced)?;
            }
        }
        Ok(())
    }

    fn reduce(&self, rows: ArrayView2<f32>) -> Result<Array2<f32>> {
        let reduced = (self.reducer)(rows.t()).reversed_axes();
        let expected = (rows.nrows().div_ceil(2), rows.ncols());
        if reduced.dim() != expected {
            return Err(MultivecError::storage(
                self.chrom,
                format!(
                    "reducer returned {:?} cells x samples, expected {:?}",
                    reduced.dim(),
                    expected
                ),
            ));
        }
        Ok(reduced)
    }
}

impl PyramidBuilder for MultiresBuilder {
    fn build(
        &self,
        input: &StoreReader,
        catalog: &ChromosomeCatalog,
        reducer: Reducer,
        starting_resolution: u32,
        tile_size: u32,
        output: &Path,
    ) -> Result<()> {
        let resolutions = pyramid_resolutions(catalog.max_size(), starting_resolution, tile_size);
        log::info!(
            "Building {} levels from {} to {} bases per cell",
            resolutions.len(),
            resolutions[0],
            resolutions[resolutions.len() - 1]
        );

        let mut writer = StoreWriter::create(output, input.columns(), self.chunk_rows)
            .map_err(|e| MultivecError::storage("output", e))?;

        let bar = match self.show_progress {
            true => ProgressBar::new(catalog.len() as u64),
            false => ProgressBar::hidden(),
        };

        for chrom in catalog {
            let rows = input
                .dataset(&chrom.name)
                .map(|d| d.rows)
                .ok_or_else(|| MultivecError::storage(&chrom.name, "missing from the staging store"))?;

            let mut ids = Vec::with_capacity(resolutions.len());
            for resolution in &resolutions {
                let name = dataset_name(*resolution, &chrom.name);
                let id = writer
                    .add_dataset(&name, (chrom.size as u64).div_ceil(*resolution))
                    .map_err(|e| MultivecError::storage(&chrom.name, e))?;
                ids.push(id);
            }

            let mut cascade = Cascade {
                chrom: &chrom.name,
                carries: vec![None; ids.len()],
                ids,
                reducer,
            };

            let step = self.chunk_rows as u64;
            let mut start = 0;
            while start < rows {
                let end = (start + step).min(rows);
                let block = input
                    .read_rows(&chrom.name, start, end)
                    .map_err(|e| MultivecError::storage(&chrom.name, e))?;
                cascade.push(&mut writer, 0, block)?;
                start = end;
            }
            cascade.finish(&mut writer)?;

            for id in &cascade.ids {
                writer
                    .seal(*id)
                    .map_err(|e| MultivecError::storage(&chrom.name, e))?;
            }

            log::debug!("Wrote {} levels of {}", resolutions.len(), chrom.name);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let chromosomes: Vec<(&str, u32)> = catalog.iter().map(|c| (c.name.as_str(), c.size)).collect();
        let attrs = json!({
            "format": "multivec",
            "version": MULTIRES_VERSION,
            "tile_size": tile_size,
            "starting_resolution": starting_resolution,
            "resolutions": resolutions,
            "chromosomes": chromosomes,
            "samples": self.samples,
        });
        writer
            .finish(&attrs)
            .map_err(|e| MultivecError::storage("output", e))?;

        Ok(())
    }
}
