//! Chromosome catalog reconciliation.
//!
//! Input tracks may disagree on which chromosomes exist and on how long they are. The
//! catalog is the single, ordered answer every later stage works from: the union of all
//! declared names, each sized to the largest length any track reports, sorted by the
//! canonical [`ChromosomeOrder`].

use std::collections::HashMap;

use multivec_core::errors::{MultivecError, Result};
use multivec_core::models::{Chromosome, ChromosomeOrder, SignalTrack};

/// Ordered, reconciled list of chromosomes shared by all samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeCatalog {
    chromosomes: Vec<Chromosome>,
}

impl ChromosomeCatalog {
    /// Build a catalog from entries that are already reconciled and ordered.
    pub fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        ChromosomeCatalog { chromosomes }
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chromosome> {
        self.chromosomes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.chromosomes.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn max_size(&self) -> u32 {
        self.chromosomes.iter().map(|c| c.size).max().unwrap_or(0)
    }

    pub fn total_size(&self) -> u64 {
        self.chromosomes.iter().map(|c| c.size as u64).sum()
    }

    ///
    /// Keep only the listed chromosomes, in catalog order.
    /// Naming a chromosome the catalog does not have is an error.
    ///
    pub fn restrict<S: AsRef<str>>(&self, names: &[S]) -> Result<ChromosomeCatalog> {
        if let Some(unknown) = names.iter().find(|n| self.get(n.as_ref()).is_none()) {
            return Err(MultivecError::InvalidConfig(format!(
                "chromosome {} is not present in any input",
                unknown.as_ref()
            )));
        }

        let chromosomes = self
            .chromosomes
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name))
            .cloned()
            .collect();
        Ok(ChromosomeCatalog { chromosomes })
    }
}

impl<'a> IntoIterator for &'a ChromosomeCatalog {
    type Item = &'a Chromosome;
    type IntoIter = std::slice::Iter<'a, Chromosome>;

    fn into_iter(self) -> Self::IntoIter {
        self.chromosomes.iter()
    }
}

///
/// Reconcile the chromosome lists of all tracks into one catalog.
///
/// # Arguments
/// - tracks: open tracks, in caller order
/// - order: canonical chromosome order; unknown names go last, in encounter order
pub fn reconcile<T: SignalTrack>(tracks: &[T], order: &ChromosomeOrder) -> Result<ChromosomeCatalog> {
    if tracks.is_empty() {
        return Err(MultivecError::EmptyInput);
    }

    let mut chromosomes: Vec<Chromosome> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for track in tracks {
        for chrom in track.chromosomes() {
            match seen.get(&chrom.name) {
                Some(&index) => {
                    let known = &mut chromosomes[index];
                    if known.size != chrom.size {
                        log::warn!(
                            "{} is {} bases long in {} but {} elsewhere; using the larger",
                            chrom.name,
                            chrom.size,
                            track.source().display(),
                            known.size
                        );
                        known.size = known.size.max(chrom.size);
                    }
                }
                None => {
                    seen.insert(chrom.name.clone(), chromosomes.len());
                    chromosomes.push(chrom.clone());
                }
            }
        }
    }

    // stable, so unknown names keep their encounter order
    chromosomes.sort_by_key(|c| order.sort_key(&c.name));

    log::debug!(
        "Reconciled {} chromosomes from {} tracks",
        chromosomes.len(),
        tracks.len()
    );

    Ok(ChromosomeCatalog { chromosomes })
}
