//! Chunked driver: reads row groups in order, classifies each, and either
//! collects the results or streams them into a Parquet writer.
//!
//! [`HolesValidator::write_to`] streams into a hidden `.partial` sibling of the
//! output and renames it into place only after the last row group, so a failed
//! run never leaves an output file behind.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use crate::classifier::{ChunkStats, classify_batch, output_schema};
use crate::common::{ValidatorConfig, ValidatorError};
use crate::reader::ChunkedReader;

/// Totals for one run over an input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub row_groups: usize,
    pub rows: usize,
    pub malformed_payloads: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl ProcessSummary {
    fn add_chunk(&mut self, chunk: &ChunkStats) {
        self.row_groups += 1;
        self.rows += chunk.rows;
        self.malformed_payloads += chunk.malformed_payloads;
        self.warnings += chunk.warnings;
        self.errors += chunk.errors;
    }
}

/// Hidden sibling of `output` used while a run is in progress.
pub fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{name}.partial"))
}

pub struct HolesValidator {
    path: PathBuf,
    config: ValidatorConfig,
}

impl HolesValidator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(path, ValidatorConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, config: ValidatorConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Open the input and return its reader together with the classified output schema.
    pub fn open(&self) -> Result<(ChunkedReader, SchemaRef), ValidatorError> {
        let reader = ChunkedReader::open(&self.path, &self.config)?;
        let schema = output_schema(reader.schema());
        Ok((reader, schema))
    }

    /// Classify the whole file and return it as one batch, in input row order.
    ///
    /// Every classified row group is held until the final concatenation. Use
    /// [`HolesValidator::process_into`] to keep only one row group in memory.
    pub fn process(&self) -> Result<(RecordBatch, ProcessSummary), ValidatorError> {
        let (reader, schema) = self.open()?;
        let mut chunks = Vec::with_capacity(reader.num_row_groups());
        let summary = self.for_each_chunk(reader, &schema, |chunk, _| {
            chunks.push(chunk);
            Ok(())
        })?;

        let combined = concat_batches(&schema, &chunks)?;
        Ok((combined, summary))
    }

    /// Classify the file, writing each row group to `writer` as soon as it is done.
    ///
    /// `writer` must have been created with the schema returned by
    /// [`HolesValidator::open`]. It is flushed but not closed.
    pub fn process_into<W: Write + Send>(
        &self,
        writer: &mut ArrowWriter<W>,
    ) -> Result<ProcessSummary, ValidatorError> {
        let (reader, schema) = self.open()?;
        self.process_reader_into(reader, &schema, writer, |_| {})
    }

    /// Like [`HolesValidator::process_into`], for a reader already obtained from
    /// [`HolesValidator::open`]. `on_chunk` runs after each row group is written
    /// and receives the totals so far.
    pub fn process_reader_into<W: Write + Send>(
        &self,
        reader: ChunkedReader,
        schema: &SchemaRef,
        writer: &mut ArrowWriter<W>,
        mut on_chunk: impl FnMut(&ProcessSummary),
    ) -> Result<ProcessSummary, ValidatorError> {
        self.for_each_chunk(reader, schema, |chunk, summary| {
            writer.write(&chunk)?;
            // One input row group per output row group.
            writer.flush()?;
            on_chunk(summary);
            Ok(())
        })
    }

    /// Classify the file into a Snappy-compressed Parquet file at `output`.
    ///
    /// On failure neither `output` nor its [`partial_path`] exists afterwards
    /// (unless `output` existed before the run).
    pub fn write_to(&self, output: &Path) -> Result<ProcessSummary, ValidatorError> {
        let (reader, schema) = self.open()?;
        self.write_reader_to(reader, &schema, output, |_| {})
    }

    /// Like [`HolesValidator::write_to`], for a reader already obtained from
    /// [`HolesValidator::open`], with `on_chunk` as in
    /// [`HolesValidator::process_reader_into`].
    pub fn write_reader_to(
        &self,
        reader: ChunkedReader,
        schema: &SchemaRef,
        output: &Path,
        on_chunk: impl FnMut(&ProcessSummary),
    ) -> Result<ProcessSummary, ValidatorError> {
        let partial = partial_path(output);
        let result = self
            .write_partial(reader, schema, &partial, on_chunk)
            .and_then(|summary| {
                fs::rename(&partial, output)?;
                Ok(summary)
            });

        if result.is_err() {
            match fs::remove_file(&partial) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => {
                    warn!("Could not remove {}: {e}", partial.display());
                }
                _ => {}
            }
        }
        result
    }

    fn write_partial(
        &self,
        reader: ChunkedReader,
        schema: &SchemaRef,
        partial: &Path,
        on_chunk: impl FnMut(&ProcessSummary),
    ) -> Result<ProcessSummary, ValidatorError> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(File::create(partial)?, schema.clone(), Some(props))?;
        let summary = self.process_reader_into(reader, schema, &mut writer, on_chunk)?;
        writer.close()?;
        Ok(summary)
    }

    /// Classify each row group in order and hand it to `sink` with the running totals.
    fn for_each_chunk(
        &self,
        reader: ChunkedReader,
        schema: &SchemaRef,
        mut sink: impl FnMut(RecordBatch, &ProcessSummary) -> Result<(), ValidatorError>,
    ) -> Result<ProcessSummary, ValidatorError> {
        let mut summary = ProcessSummary::default();
        for (index, batch) in reader.enumerate() {
            let batch = batch?;
            let (classified, stats) = classify_batch(&batch, schema, &self.config)?;
            debug!(
                "Row group {index}: {} rows, {} warnings, {} errors, {} malformed",
                stats.rows, stats.warnings, stats.errors, stats.malformed_payloads
            );
            summary.add_chunk(&stats);
            sink(classified, &summary)?;
        }
        Ok(summary)
    }
}
