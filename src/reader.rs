//! Row-group-at-a-time reading of the two input columns.
//!
//! The file footer is read once when the reader is opened. Every subsequent
//! read decodes a single row group, restricted to the identifier and holes
//! columns, so peak memory is bounded by the largest row group rather than the
//! whole file.

use std::fs::File;
use std::path::Path;

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder};
use tracing::debug;

use crate::common::{ValidatorConfig, ValidatorError};

pub struct ChunkedReader {
    file: File,
    metadata: ArrowReaderMetadata,
    projection: ProjectionMask,
    /// Schema of the projected batches (the two columns, in file order).
    schema: SchemaRef,
    next_row_group: usize,
}

impl ChunkedReader {
    /// Open the Parquet file at `path`.
    pub fn open(path: impl AsRef<Path>, config: &ValidatorConfig) -> Result<Self, ValidatorError> {
        let file = File::open(path.as_ref())?;
        Self::new(file, config)
    }

    /// Read the footer of an already-open file and resolve the required columns.
    ///
    /// Fails with [`ValidatorError::MissingColumn`] if either configured column
    /// is absent from the file schema.
    pub fn new(file: File, config: &ValidatorConfig) -> Result<Self, ValidatorError> {
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::new())?;

        let file_schema = metadata.schema();
        let mut indices = Vec::with_capacity(2);
        for name in [&config.id_column, &config.holes_column] {
            let index = file_schema
                .index_of(name)
                .map_err(|_| ValidatorError::MissingColumn { name: name.clone() })?;
            indices.push(index);
        }
        // Projected batches always come back in file order.
        indices.sort_unstable();
        indices.dedup();

        let projection = ProjectionMask::roots(metadata.parquet_schema(), indices.iter().copied());
        let schema = SchemaRef::new(file_schema.project(&indices)?);

        Ok(Self {
            file,
            metadata,
            projection,
            schema,
            next_row_group: 0,
        })
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.metadata().num_row_groups()
    }

    /// Total row count across all row groups, from the footer.
    pub fn num_rows(&self) -> usize {
        self.metadata.metadata().file_metadata().num_rows() as usize
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Decode row group `index` as a single batch of the projected columns.
    pub fn read_row_group(&self, index: usize) -> Result<RecordBatch, ValidatorError> {
        let group_rows = self.metadata.metadata().row_group(index).num_rows() as usize;

        let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(self.file.try_clone()?, self.metadata.clone())
            .with_row_groups(vec![index])
            .with_projection(self.projection.clone())
            .with_batch_size(group_rows.max(1))
            .build()?;

        let mut batches: Vec<RecordBatch> = reader.collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Row group {index}: {group_rows} rows in {} batch(es)",
            batches.len()
        );

        let batch = match batches.len() {
            0 => RecordBatch::new_empty(self.schema.clone()),
            1 => batches.swap_remove(0),
            _ => concat_batches(&self.schema, &batches)?,
        };
        Ok(batch)
    }
}

/// Yields the row groups in file order.
impl Iterator for ChunkedReader {
    type Item = Result<RecordBatch, ValidatorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row_group >= self.num_row_groups() {
            return None;
        }
        let index = self.next_row_group;
        self.next_row_group += 1;
        Some(self.read_row_group(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_row_groups().saturating_sub(self.next_row_group);
        (remaining, Some(remaining))
    }
}
