use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::Deserialize;

use crate::consts::DEFAULT_CHROMOSOME_ORDER;

///
/// A chromosome name together with its length in bases.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Chromosome {
    pub name: String,
    pub size: u32,
}

impl Chromosome {
    pub fn new<S: Into<String>>(name: S, size: u32) -> Self {
        Chromosome {
            name: name.into(),
            size,
        }
    }

    ///
    /// Number of cells needed to hold this chromosome at `resolution` bases per cell
    ///
    pub fn bins(&self, resolution: u32) -> u64 {
        (self.size as u64).div_ceil(resolution.max(1) as u64)
    }
}

impl Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.name, self.size)
    }
}

///
/// Fixed priority list used to order chromosomes. Names that are not in
/// the list have no rank and sort after every ranked name.
///
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct ChromosomeOrder {
    names: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl ChromosomeOrder {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut ranks = HashMap::with_capacity(names.len());
        for (rank, name) in names.iter().enumerate() {
            // first occurrence wins if a name is listed twice
            ranks.entry(name.clone()).or_insert(rank);
        }
        ChromosomeOrder { names, ranks }
    }

    pub fn rank(&self, name: &str) -> Option<usize> {
        self.ranks.get(name).copied()
    }

    /// Sort key: ranked names first by rank, everything else after.
    pub fn sort_key(&self, name: &str) -> usize {
        self.rank(name).unwrap_or(usize::MAX)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ChromosomeOrder {
    fn default() -> Self {
        ChromosomeOrder::from_names(DEFAULT_CHROMOSOME_ORDER)
    }
}

impl From<Vec<String>> for ChromosomeOrder {
    fn from(names: Vec<String>) -> Self {
        ChromosomeOrder::from_names(names)
    }
}
