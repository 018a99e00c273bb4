use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Chromosome, SignalInterval};
use crate::errors::Result;

pub type IntervalIter<'a> = Box<dyn Iterator<Item = Result<SignalInterval>> + 'a>;

///
/// An open input track: a set of declared chromosomes and, per chromosome, a
/// sequence of non-overlapping intervals in ascending start order.
///
/// Implementors hold whatever file handles they need and release them on drop,
/// so a track goes out of scope cleanly on every exit path.
///
pub trait SignalTrack {
    /// Where the track came from. Used to name the culprit in error messages.
    fn source(&self) -> &Path;

    /// Chromosomes declared by the track, in the track's own order.
    fn chromosomes(&self) -> &[Chromosome];

    /// Declared length of `name`, if the track knows about it.
    fn chrom_length(&self, name: &str) -> Option<u32> {
        self.chromosomes()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.size)
    }

    ///
    /// Intervals of `chrom` overlapping [start, end), unclipped, in ascending start order.
    /// A chromosome the track does not declare yields no intervals.
    ///
    fn intervals(&mut self, chrom: &str, start: u32, end: u32) -> Result<IntervalIter<'_>>;
}

///
/// A track whose intervals are already in memory.
///
#[derive(Debug, Clone, Default)]
pub struct MemoryTrack {
    source: PathBuf,
    chromosomes: Vec<Chromosome>,
    intervals: HashMap<String, Vec<SignalInterval>>,
}

impl MemoryTrack {
    pub fn new<P: Into<PathBuf>>(source: P) -> Self {
        MemoryTrack {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Declare a chromosome. Re-declaring a name replaces its length.
    pub fn with_chromosome<S: Into<String>>(mut self, name: S, size: u32) -> Self {
        let name = name.into();
        match self.chromosomes.iter_mut().find(|c| c.name == name) {
            Some(chrom) => chrom.size = size,
            None => self.chromosomes.push(Chromosome::new(name, size)),
        }
        self
    }

    /// Set the intervals of `chrom`. They are expected sorted and non-overlapping.
    pub fn with_intervals<S: Into<String>>(mut self, chrom: S, intervals: Vec<SignalInterval>) -> Self {
        self.intervals.insert(chrom.into(), intervals);
        self
    }
}

impl SignalTrack for MemoryTrack {
    fn source(&self) -> &Path {
        &self.source
    }

    fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    fn intervals(&mut self, chrom: &str, start: u32, end: u32) -> Result<IntervalIter<'_>> {
        let Some(intervals) = self.intervals.get(chrom) else {
            return Ok(Box::new(std::iter::empty()));
        };

        // ends are ascending too since the intervals do not overlap
        let first = intervals.partition_point(|i| i.end <= start);
        Ok(Box::new(
            intervals[first..]
                .iter()
                .take_while(move |i| i.start < end)
                .map(|i| Ok(*i)),
        ))
    }
}
