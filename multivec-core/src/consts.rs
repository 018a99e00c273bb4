/// Placeholder for "no data reported at this position". A quiet NaN, never equal to `0.0`,
/// which is a legitimate signal value.
pub const MISSING: f32 = f32::NAN;

/// Bases per cell at the finest level of the output.
pub const DEFAULT_STARTING_RESOLUTION: u32 = 1;

/// Number of cells per tile in the output pyramid.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Maximum number of rows committed to the staging store in one chunk.
pub const DEFAULT_CHUNK_ROWS: usize = 65_536;

/// Number of bases materialized in memory at once for one chromosome.
pub const DEFAULT_WINDOW_SIZE: u32 = 4_194_304;

/// Extension given to the output when no explicit path is provided.
///
/// The name follows the multivec convention, but the file is this workspace's own chunked
/// store (see `multivec_io::store`), not HDF5. HiGlass and h5py cannot open it; read it
/// with `multivec info` or `StoreReader`.
pub const OUTPUT_SUFFIX: &str = "multires.mv5";

/// Default canonical ordering of chromosome names.
pub const DEFAULT_CHROMOSOME_ORDER: [&str; 24] = [
    "chr1", "chr2", "chr3", "chr4", "chr5", "chr6", "chr7", "chr8", "chr9", "chr10", "chr11",
    "chr12", "chr13", "chr14", "chr15", "chr16", "chr17", "chr18", "chr19", "chr20", "chr21",
    "chr22", "chrX", "chrY",
];

pub const CONVERT_CMD: &str = "convert";
pub const INFO_CMD: &str = "info";
