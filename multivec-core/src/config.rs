//! Run configuration for a conversion.
//!
//! A [`ConvertConfig`] is built once, either with [`ConvertConfigBuilder`] or from a TOML
//! file, and then passed by reference through every stage of the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::consts::{
    DEFAULT_CHUNK_ROWS, DEFAULT_STARTING_RESOLUTION, DEFAULT_TILE_SIZE, DEFAULT_WINDOW_SIZE,
};
use crate::errors::{MultivecError, Result};
use crate::models::ChromosomeOrder;

/// Parameters of one conversion run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Bases per cell at the finest level.
    pub starting_resolution: u32,
    /// Cells per tile of the output pyramid.
    pub tile_size: u32,
    /// Maximum rows per staging chunk.
    pub chunk_rows: usize,
    /// Bases materialized in memory at once.
    pub window_size: u32,
    /// Canonical order of chromosome names.
    pub chromosome_order: ChromosomeOrder,
    /// Only convert these chromosomes, if set.
    pub chromosomes: Option<Vec<String>>,
    /// Parent directory of the run's temporary directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            starting_resolution: DEFAULT_STARTING_RESOLUTION,
            tile_size: DEFAULT_TILE_SIZE,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            window_size: DEFAULT_WINDOW_SIZE,
            chromosome_order: ChromosomeOrder::default(),
            chromosomes: None,
            temp_dir: None,
        }
    }
}

impl ConvertConfig {
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder::new()
    }

    ///
    /// Read a configuration from a TOML file. Keys that are not present keep their defaults.
    ///
    /// # Arguments
    /// - path: path to the TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config: ConvertConfig = toml::from_str(&raw).map_err(|e| {
            MultivecError::InvalidConfig(format!("{}: {}", path.display(), e.message()))
        })?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the numeric parameters for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.starting_resolution == 0 {
            return Err(MultivecError::InvalidConfig(
                "starting resolution must be at least 1".to_string(),
            ));
        }
        if self.tile_size < 2 || !self.tile_size.is_power_of_two() {
            return Err(MultivecError::InvalidConfig(format!(
                "tile size must be a power of two of at least 2, got {}",
                self.tile_size
            )));
        }
        if self.chunk_rows == 0 {
            return Err(MultivecError::InvalidConfig(
                "chunk rows must be at least 1".to_string(),
            ));
        }
        if self.window_size < self.starting_resolution {
            return Err(MultivecError::InvalidConfig(format!(
                "window size ({}) must hold at least one cell of {} bases",
                self.window_size, self.starting_resolution
            )));
        }
        Ok(())
    }

    /// Window size rounded down to whole cells, so windows never split a cell.
    pub fn window_bases(&self) -> u32 {
        let resolution = self.starting_resolution.max(1);
        (self.window_size / resolution).max(1) * resolution
    }
}

/// Builder for constructing a [`ConvertConfig`] with custom values.
#[derive(Default)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one read from a file.
    pub fn from_config(config: ConvertConfig) -> Self {
        ConvertConfigBuilder { config }
    }

    pub fn with_starting_resolution(mut self, resolution: u32) -> Self {
        self.config.starting_resolution = resolution;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.config.tile_size = tile_size;
        self
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.config.chunk_rows = chunk_rows;
        self
    }

    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.config.window_size = window_size;
        self
    }

    pub fn with_chromosome_order(mut self, order: ChromosomeOrder) -> Self {
        self.config.chromosome_order = order;
        self
    }

    pub fn with_chromosomes(mut self, chromosomes: Vec<String>) -> Self {
        self.config.chromosomes = Some(chromosomes);
        self
    }

    pub fn with_temp_dir(mut self, path: PathBuf) -> Self {
        self.config.temp_dir = Some(path);
        self
    }

    /// Consumes the builder and validates the configuration.
    pub fn finish(self) -> Result<ConvertConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
