//! Dense per-chromosome signal matrices.
//!
//! A [`SignalMatrix`] holds one window of one chromosome for every sample: shape
//! `samples x cells`, where a cell covers `resolution` bases. Cells start out missing and
//! are painted from the intervals each track reports.

use std::path::Path;

use ndarray::{Array2, ArrayView1, s};

use multivec_core::consts::MISSING;
use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::{Chromosome, SignalTrack};

use crate::catalog::ChromosomeCatalog;

#[derive(Debug, Clone)]
pub struct SignalMatrix {
    chrom: String,
    chrom_size: u32,
    resolution: u32,
    start: u32,
    end: u32,
    values: Array2<f32>,
}

impl SignalMatrix {
    ///
    /// A missing-filled matrix covering the whole chromosome.
    ///
    pub fn new(chrom: &Chromosome, samples: usize, resolution: u32) -> Self {
        SignalMatrix::window(chrom, samples, resolution, 0, chrom.size)
    }

    ///
    /// A missing-filled matrix covering bases [start, end) of the chromosome.
    ///
    /// # Arguments
    /// - chrom: reconciled chromosome
    /// - samples: number of rows
    /// - resolution: bases per cell
    /// - start: first base, a multiple of `resolution`
    /// - end: one past the last base, clamped to the chromosome size
    pub fn window(chrom: &Chromosome, samples: usize, resolution: u32, start: u32, end: u32) -> Self {
        let resolution = resolution.max(1);
        let end = end.min(chrom.size);
        let start = (start.min(end) / resolution) * resolution;
        let cells = (end as u64).div_ceil(resolution as u64) - (start / resolution) as u64;

        SignalMatrix {
            chrom: chrom.name.clone(),
            chrom_size: chrom.size,
            resolution,
            start,
            end,
            values: Array2::from_elem((samples, cells as usize), MISSING),
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Base range covered by this matrix.
    pub fn base_range(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    /// Index of the first cell within the whole chromosome.
    pub fn first_cell(&self) -> u64 {
        (self.start / self.resolution) as u64
    }

    pub fn samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn cells(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn row(&self, sample: usize) -> ArrayView1<'_, f32> {
        self.values.row(sample)
    }
}

///
/// Split a chromosome into consecutive base windows of at most `window` bases.
///
pub fn windows(chrom: &Chromosome, window: u32) -> impl Iterator<Item = (u32, u32)> {
    let size = chrom.size;
    let window = window.max(1);
    (0..size)
        .step_by(window as usize)
        .map(move |start| (start, start.saturating_add(window).min(size)))
}

///
/// Paint the intervals a track reports for the matrix's window into row `sample`.
///
/// At resolution 1 every covered base takes the interval value. At coarser
/// resolutions a cell holds the sum of value times overlap over every interval
/// touching it, and stays missing if none does. Zero is a value like any other.
///
pub fn fill_window<T: SignalTrack + ?Sized>(track: &mut T, sample: usize, matrix: &mut SignalMatrix) -> Result<()> {
    if sample >= matrix.samples() {
        return Err(MultivecError::InvalidConfig(format!(
            "sample {} is out of range for a matrix of {} samples",
            sample,
            matrix.samples()
        )));
    }

    let source = track.source().to_path_buf();
    let (lo, hi) = matrix.base_range();
    let (size, resolution) = (matrix.chrom_size, matrix.resolution);
    let first_cell = matrix.first_cell();
    let chrom = matrix.chrom.as_str();
    let mut row = matrix.values.row_mut(sample);

    for interval in track.intervals(chrom, lo, hi)? {
        let interval = interval?;
        if interval.end > size {
            return Err(overflow(&source, chrom, interval.start, interval.end, size));
        }
        let Some(clipped) = interval.clip(lo, hi) else {
            continue;
        };

        if resolution == 1 {
            row.slice_mut(s![(clipped.start - lo) as usize..(clipped.end - lo) as usize])
                .fill(clipped.value);
            continue;
        }

        let res = resolution as u64;
        let (from, to) = (clipped.start as u64, clipped.end as u64);
        for cell in (from / res)..=((to - 1) / res) {
            let overlap = to.min((cell + 1) * res) - from.max(cell * res);
            let contribution = clipped.value * overlap as f32;
            let slot = &mut row[(cell - first_cell) as usize];
            *slot = if slot.is_nan() {
                contribution
            } else {
                *slot + contribution
            };
        }
    }

    // the last window also owns whatever the track reports past the chromosome end
    if hi == size && size < u32::MAX {
        if let Some(interval) = track.intervals(chrom, size, u32::MAX)?.next() {
            let interval = interval?;
            return Err(overflow(&source, chrom, interval.start, interval.end, size));
        }
    }

    Ok(())
}

fn overflow(source: &Path, chrom: &str, start: u32, end: u32, size: u32) -> MultivecError {
    MultivecError::ChromosomeOverflow {
        path: source.to_path_buf(),
        chrom: chrom.to_string(),
        start,
        end,
        size,
    }
}

///
/// Fill row `sample` of every chromosome matrix from one track.
///
/// `matrices` must line up with the catalog, one matrix per chromosome in catalog
/// order. Chromosomes the track does not declare stay missing.
///
pub fn materialize_track<T: SignalTrack + ?Sized>(
    track: &mut T,
    catalog: &ChromosomeCatalog,
    sample: usize,
    matrices: &mut [SignalMatrix],
) -> Result<()> {
    if matrices.len() != catalog.len() {
        return Err(MultivecError::InvalidConfig(format!(
            "expected {} chromosome matrices, got {}",
            catalog.len(),
            matrices.len()
        )));
    }

    for (chrom, matrix) in catalog.iter().zip(matrices.iter_mut()) {
        if matrix.chrom() != chrom.name || matrix.base_range() != (0, chrom.size) {
            return Err(MultivecError::InvalidConfig(format!(
                "matrix for {} does not cover catalog entry {} (0-{})",
                matrix.chrom(),
                chrom.name,
                chrom.size
            )));
        }
        if track.chrom_length(&chrom.name).is_none() {
            log::debug!(
                "{} has no {}; leaving it missing",
                track.source().display(),
                chrom.name
            );
            continue;
        }
        fill_window(track, sample, matrix)?;
    }

    Ok(())
}

///
/// Materialize whole-chromosome matrices for every track at once.
/// Memory grows with the genome size; the pipeline works window by window instead.
///
pub fn materialize_catalog<T: SignalTrack>(
    tracks: &mut [T],
    catalog: &ChromosomeCatalog,
    resolution: u32,
) -> Result<Vec<SignalMatrix>> {
    let mut matrices: Vec<SignalMatrix> = catalog
        .iter()
        .map(|chrom| SignalMatrix::new(chrom, tracks.len(), resolution))
        .collect();

    for (sample, track) in tracks.iter_mut().enumerate() {
        materialize_track(track, catalog, sample, &mut matrices)?;
    }

    Ok(matrices)
}
