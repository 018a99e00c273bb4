//! Chunked, compressed, on-disk 2-D `f32` matrices.
//!
//! A store file holds any number of named datasets that share a column count. Rows are
//! appended and cut into chunks of at most `chunk_rows` rows; every chunk is gzip
//! compressed on its own. A chunk whose values are all [`MISSING`] is recorded in the index
//! without any bytes, so untouched regions cost nothing on disk and read back as `MISSING`.
//!
//! Layout (all integers little endian):
//!
//! ```text
//! header  : "MVST" | version u8 | columns u32 | chunk_rows u32
//! chunks  : gzip(f32 * rows * columns), row major
//! footer  : attrs len u32 | attrs json
//!           dataset count u32
//!           per dataset: name len u16 | name | rows u64 | chunk count u32
//!                        per chunk: offset u64 | length u64 (0 = all missing)
//! trailer : footer offset u64 | "MVST"
//! ```
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::{Array2, ArrayView2};

use multivec_core::consts::MISSING;

use crate::error::{Result, StoreError};

pub const STORE_MAGIC: &[u8; 4] = b"MVST";
pub const STORE_VERSION: u8 = 1;

const HEADER_LEN: u64 = 4 + 1 + 4 + 4;
const TRAILER_LEN: u64 = 8 + 4;

/// Handle to a dataset of an open [`StoreWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetId(usize);

/// Location of one compressed chunk. A zero length marks an all-missing chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef {
    pub offset: u64,
    pub length: u64,
}

impl ChunkRef {
    pub fn is_fill(&self) -> bool {
        self.length == 0
    }
}

/// Name, shape and chunk index of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub name: String,
    pub rows: u64,
    pub chunks: Vec<ChunkRef>,
}

impl DatasetInfo {
    /// Number of chunks holding real data.
    pub fn stored_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| !c.is_fill()).count()
    }
}

struct OpenDataset {
    info: DatasetInfo,
    written: u64,
    pending: Vec<f32>,
}

///
/// Append-only writer for a store file.
///
/// Several datasets may be open at the same time; their chunks interleave in the
/// file and the index keeps them apart. Nothing is readable until [`StoreWriter::finish`].
///
pub struct StoreWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    position: u64,
    columns: usize,
    chunk_rows: usize,
    datasets: Vec<OpenDataset>,
}

impl StoreWriter {
    ///
    /// Create a new store, truncating any existing file.
    ///
    /// # Arguments
    /// - path: file to create
    /// - columns: number of columns shared by every dataset
    /// - chunk_rows: maximum number of rows per compressed chunk
    pub fn create<P: AsRef<Path>>(path: P, columns: usize, chunk_rows: usize) -> Result<Self> {
        if columns == 0 || chunk_rows == 0 {
            return Err(StoreError::InvalidStore(format!(
                "a store needs at least one column and one row per chunk (got {columns} x {chunk_rows})"
            )));
        }

        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);

        writer.write_all(STORE_MAGIC)?;
        writer.write_u8(STORE_VERSION)?;
        writer.write_u32::<LittleEndian>(columns as u32)?;
        writer.write_u32::<LittleEndian>(chunk_rows as u32)?;

        Ok(StoreWriter {
            path,
            writer,
            position: HEADER_LEN,
            columns,
            chunk_rows,
            datasets: Vec::new(),
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    /// Declare a dataset of `rows` rows. Rows never appended read back as missing.
    pub fn add_dataset(&mut self, name: &str, rows: u64) -> Result<DatasetId> {
        if self.datasets.iter().any(|d| d.info.name == name) {
            return Err(StoreError::DuplicateDataset(name.to_string()));
        }
        if name.len() > u16::MAX as usize {
            return Err(StoreError::InvalidStore(format!(
                "dataset name is too long ({} bytes)",
                name.len()
            )));
        }

        self.datasets.push(OpenDataset {
            info: DatasetInfo {
                name: name.to_string(),
                rows,
                chunks: Vec::new(),
            },
            written: 0,
            pending: Vec::new(),
        });
        Ok(DatasetId(self.datasets.len() - 1))
    }

    ///
    /// Append a block of rows (shape `rows x columns`) to the end of a dataset.
    /// Full chunks are compressed and written as soon as they are complete.
    ///
    pub fn append(&mut self, id: DatasetId, block: ArrayView2<f32>) -> Result<()> {
        if block.ncols() != self.columns {
            return Err(StoreError::ShapeMismatch {
                expected: self.columns,
                found: block.ncols(),
            });
        }

        let dataset = &mut self.datasets[id.0];
        let rows = block.nrows() as u64;
        if dataset.written + rows > dataset.info.rows {
            return Err(StoreError::Overfull {
                name: dataset.info.name.clone(),
                rows,
                capacity: dataset.info.rows - dataset.written,
            });
        }

        dataset.pending.reserve(block.len());
        for row in block.rows() {
            dataset.pending.extend(row.iter().copied());
        }
        dataset.written += rows;

        self.flush_complete_chunks(id)
    }

    /// Rows the next chunk of a dataset should hold.
    fn next_chunk_rows(&self, dataset: &OpenDataset) -> usize {
        let first_row = (dataset.info.chunks.len() * self.chunk_rows) as u64;
        dataset.info.rows.saturating_sub(first_row).min(self.chunk_rows as u64) as usize
    }

    fn flush_complete_chunks(&mut self, id: DatasetId) -> Result<()> {
        loop {
            let needed = self.next_chunk_rows(&self.datasets[id.0]);
            let pending_rows = self.datasets[id.0].pending.len() / self.columns;
            if needed == 0 || pending_rows < needed {
                return Ok(());
            }

            let values: Vec<f32> = self.datasets[id.0]
                .pending
                .drain(..needed * self.columns)
                .collect();
            let chunk = self.write_chunk(&values)?;
            self.datasets[id.0].info.chunks.push(chunk);
        }
    }

    fn write_chunk(&mut self, values: &[f32]) -> Result<ChunkRef> {
        if values.iter().all(|v| v.is_nan()) {
            return Ok(ChunkRef {
                offset: self.position,
                length: 0,
            });
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for value in values {
            encoder.write_f32::<LittleEndian>(*value)?;
        }
        let bytes = encoder.finish()?;

        self.writer.write_all(&bytes)?;
        let chunk = ChunkRef {
            offset: self.position,
            length: bytes.len() as u64,
        };
        self.position += bytes.len() as u64;
        Ok(chunk)
    }

    ///
    /// Close a dataset for writing. Rows that were never appended are filled with
    /// missing values. Sealing twice is harmless.
    ///
    pub fn seal(&mut self, id: DatasetId) -> Result<()> {
        let remaining = {
            let dataset = &self.datasets[id.0];
            dataset.info.rows - dataset.written
        };

        // pad the partially filled chunk, if any, and write it
        let pending_rows = self.datasets[id.0].pending.len() / self.columns;
        if pending_rows > 0 {
            let needed = self.next_chunk_rows(&self.datasets[id.0]);
            let pad = (needed - pending_rows) * self.columns;
            let dataset = &mut self.datasets[id.0];
            dataset.pending.extend(std::iter::repeat_n(MISSING, pad));
            dataset.written += (needed - pending_rows) as u64;
            self.flush_complete_chunks(id)?;
        }

        // the rest are whole chunks of missing values
        let position = self.position;
        let chunk_rows = self.chunk_rows as u64;
        let dataset = &mut self.datasets[id.0];
        let total_chunks = dataset.info.rows.div_ceil(chunk_rows) as usize;
        while dataset.info.chunks.len() < total_chunks {
            dataset.info.chunks.push(ChunkRef {
                offset: position,
                length: 0,
            });
        }
        dataset.written = dataset.info.rows;

        if remaining > 0 {
            log::debug!(
                "Sealed {} with {} unwritten rows",
                dataset.info.name,
                remaining
            );
        }
        Ok(())
    }

    ///
    /// Seal every dataset, write the index and the attributes, and flush.
    ///
    /// # Arguments
    /// - attrs: free form metadata stored alongside the datasets
    pub fn finish(mut self, attrs: &serde_json::Value) -> Result<PathBuf> {
        for index in 0..self.datasets.len() {
            self.seal(DatasetId(index))?;
        }

        let footer_offset = self.position;
        let attrs = serde_json::to_vec(attrs)?;
        self.writer.write_u32::<LittleEndian>(attrs.len() as u32)?;
        self.writer.write_all(&attrs)?;

        self.writer
            .write_u32::<LittleEndian>(self.datasets.len() as u32)?;
        for dataset in &self.datasets {
            let info = &dataset.info;
            self.writer.write_u16::<LittleEndian>(info.name.len() as u16)?;
            self.writer.write_all(info.name.as_bytes())?;
            self.writer.write_u64::<LittleEndian>(info.rows)?;
            self.writer
                .write_u32::<LittleEndian>(info.chunks.len() as u32)?;
            for chunk in &info.chunks {
                self.writer.write_u64::<LittleEndian>(chunk.offset)?;
                self.writer.write_u64::<LittleEndian>(chunk.length)?;
            }
        }

        self.writer.write_u64::<LittleEndian>(footer_offset)?;
        self.writer.write_all(STORE_MAGIC)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        Ok(self.path)
    }
}

///
/// Read-only view of a finished store file.
///
pub struct StoreReader {
    path: PathBuf,
    file: File,
    columns: usize,
    chunk_rows: usize,
    attrs: serde_json::Value,
    datasets: Vec<DatasetInfo>,
}

impl StoreReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        if file_len < HEADER_LEN + TRAILER_LEN {
            return Err(StoreError::InvalidStore(format!(
                "{} is too short",
                path.display()
            )));
        }

        let mut reader = BufReader::new(&file);

        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(StoreError::InvalidStore(format!(
                "{} has no store header",
                path.display()
            )));
        }
        let version = reader.read_u8()?;
        if version != STORE_VERSION {
            return Err(StoreError::InvalidStore(format!(
                "unsupported store version {version}"
            )));
        }
        let columns = reader.read_u32::<LittleEndian>()? as usize;
        let chunk_rows = reader.read_u32::<LittleEndian>()? as usize;

        reader.seek(SeekFrom::Start(file_len - TRAILER_LEN))?;
        let footer_offset = reader.read_u64::<LittleEndian>()?;
        reader.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC || footer_offset > file_len - TRAILER_LEN {
            return Err(StoreError::InvalidStore(format!(
                "{} has no index (was the store finished?)",
                path.display()
            )));
        }

        let footer_end = file_len - TRAILER_LEN;
        let corrupt = |what: &str| {
            StoreError::InvalidStore(format!("{} has a corrupt {}", path.display(), what))
        };

        reader.seek(SeekFrom::Start(footer_offset))?;
        let attrs_len = reader.read_u32::<LittleEndian>()? as u64;
        if attrs_len > footer_end.saturating_sub(footer_offset + 4) {
            return Err(corrupt("attribute length"));
        }
        let mut attrs = vec![0; attrs_len as usize];
        reader.read_exact(&mut attrs)?;
        let attrs: serde_json::Value = serde_json::from_slice(&attrs)?;

        let dataset_count = reader.read_u32::<LittleEndian>()?;
        let mut datasets = Vec::with_capacity((dataset_count as u64).min(footer_end / 16) as usize);
        for _ in 0..dataset_count {
            let name_len = reader.read_u16::<LittleEndian>()? as usize;
            let mut name = vec![0; name_len];
            reader.read_exact(&mut name)?;
            let name = String::from_utf8(name)
                .map_err(|_| StoreError::InvalidStore("dataset name is not UTF-8".to_string()))?;
            let rows = reader.read_u64::<LittleEndian>()?;
            let chunk_count = reader.read_u32::<LittleEndian>()?;
            // every chunk entry takes 16 bytes of the footer
            let mut chunks = Vec::with_capacity((chunk_count as u64).min(footer_end / 16) as usize);
            for _ in 0..chunk_count {
                let offset = reader.read_u64::<LittleEndian>()?;
                let length = reader.read_u64::<LittleEndian>()?;
                if offset < HEADER_LEN
                    || offset
                        .checked_add(length)
                        .is_none_or(|chunk_end| chunk_end > footer_offset)
                {
                    return Err(corrupt("chunk index"));
                }
                chunks.push(ChunkRef { offset, length });
            }
            datasets.push(DatasetInfo { name, rows, chunks });
        }
        drop(reader);

        Ok(StoreReader {
            path,
            file,
            columns,
            chunk_rows,
            attrs,
            datasets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    pub fn attrs(&self) -> &serde_json::Value {
        &self.attrs
    }

    pub fn datasets(&self) -> &[DatasetInfo] {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetInfo> {
        self.datasets.iter().find(|d| d.name == name)
    }

    ///
    /// Read rows [start, end) of a dataset as a `(end - start) x columns` matrix.
    /// Only the chunks overlapping the range are decompressed.
    ///
    pub fn read_rows(&self, name: &str, start: u64, end: u64) -> Result<Array2<f32>> {
        let dataset = self
            .dataset(name)
            .ok_or_else(|| StoreError::UnknownDataset(name.to_string()))?;
        if start > end || end > dataset.rows {
            return Err(StoreError::OutOfRange {
                name: name.to_string(),
                start,
                end,
                rows: dataset.rows,
            });
        }

        let mut out = Array2::from_elem(((end - start) as usize, self.columns), MISSING);
        if start == end {
            return Ok(out);
        }

        let chunk_rows = self.chunk_rows as u64;
        let first_chunk = (start / chunk_rows) as usize;
        let last_chunk = ((end - 1) / chunk_rows) as usize;

        for index in first_chunk..=last_chunk {
            let chunk = dataset.chunks.get(index).ok_or_else(|| {
                StoreError::InvalidStore(format!("{} is missing chunk {}", name, index))
            })?;
            if chunk.is_fill() {
                continue;
            }

            let chunk_start = index as u64 * chunk_rows;
            let chunk_len = (dataset.rows - chunk_start).min(chunk_rows) as usize;
            let values = self.read_chunk(chunk, chunk_len)?;

            let lo = start.max(chunk_start);
            let hi = end.min(chunk_start + chunk_len as u64);
            for row in lo..hi {
                let src = (row - chunk_start) as usize * self.columns;
                let dst = (row - start) as usize;
                out.row_mut(dst)
                    .iter_mut()
                    .zip(&values[src..src + self.columns])
                    .for_each(|(o, v)| *o = *v);
            }
        }

        Ok(out)
    }

    /// Read a whole dataset.
    pub fn read_dataset(&self, name: &str) -> Result<Array2<f32>> {
        let rows = self
            .dataset(name)
            .ok_or_else(|| StoreError::UnknownDataset(name.to_string()))?
            .rows;
        self.read_rows(name, 0, rows)
    }

    fn read_chunk(&self, chunk: &ChunkRef, rows: usize) -> Result<Vec<f32>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(chunk.offset))?;
        let mut compressed = vec![0; chunk.length as usize];
        file.read_exact(&mut compressed)?;

        let mut values = vec![0.0; rows * self.columns];
        GzDecoder::new(&compressed[..]).read_f32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }
}
