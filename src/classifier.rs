//! Per-record hole classification and the per-batch column augmentation built on it.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::common::*;
use crate::payload::parse_holes;

/// Placeholder used in diagnostics for rows whose identifier is null.
const NULL_ID: &str = "<null>";

/// Compute the warning/error flags for one record's holes.
///
/// A hole is over the warning (error) limit when its length exceeds its radius
/// times the warning (error) factor, so a zero-radius hole of any positive
/// length is flagged. An error-level hole always counts as a warning-level hole,
/// even for degenerate negative radii where the two products swap order.
pub fn classify(holes: &[HoleDescriptor], thresholds: &Thresholds) -> HoleFlags {
    let mut flags = HoleFlags::default();
    for hole in holes {
        if !flags.error && hole.length > hole.radius * thresholds.error_factor() {
            flags.error = true;
            flags.warning = true;
        }
        if !flags.warning && hole.length > hole.radius * thresholds.warn_factor() {
            flags.warning = true;
        }
        if flags.warning && flags.error {
            break;
        }
    }
    flags
}

/// Per-batch counters reported back to the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub rows: usize,
    pub malformed_payloads: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Schema of a classified batch: the input fields followed by the two flag columns.
pub fn output_schema(input: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = input.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(WARNING_COLUMN, DataType::Boolean, false));
    fields.push(Field::new(ERROR_COLUMN, DataType::Boolean, false));
    Arc::new(Schema::new(fields))
}

/// Classify every row of `batch` and append the two flag columns.
///
/// `schema` must be [`output_schema`] of the batch's schema. Malformed payloads
/// are logged and counted, never returned as errors.
pub fn classify_batch(
    batch: &RecordBatch,
    schema: &SchemaRef,
    config: &ValidatorConfig,
) -> Result<(RecordBatch, ChunkStats), ValidatorError> {
    let ids = column_as_utf8(batch, &config.id_column, |_| true)?;
    let holes = column_as_utf8(batch, &config.holes_column, is_text)?;
    let ids = ids.as_string::<i32>();
    let holes = holes.as_string::<i32>();

    let num_rows = batch.num_rows();
    let mut stats = ChunkStats {
        rows: num_rows,
        ..Default::default()
    };
    let mut warnings = Vec::with_capacity(num_rows);
    let mut errors = Vec::with_capacity(num_rows);

    for row in 0..num_rows {
        let id = if ids.is_null(row) { NULL_ID } else { ids.value(row) };
        let raw = holes.is_valid(row).then(|| holes.value(row));

        let (parsed, malformed) = parse_holes(raw, id);
        let flags = classify(&parsed, &config.thresholds);

        stats.malformed_payloads += malformed as usize;
        stats.warnings += flags.warning as usize;
        stats.errors += flags.error as usize;
        warnings.push(flags.warning);
        errors.push(flags.error);
    }

    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(BooleanArray::from(warnings)));
    columns.push(Arc::new(BooleanArray::from(errors)));
    let classified = RecordBatch::try_new(schema.clone(), columns)?;

    Ok((classified, stats))
}

fn is_text(data_type: &DataType) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, values) => is_text(values),
        _ => false,
    }
}

/// Look up `name` in `batch` and view it as a `Utf8` array.
fn column_as_utf8(
    batch: &RecordBatch,
    name: &str,
    accept: impl Fn(&DataType) -> bool,
) -> Result<ArrayRef, ValidatorError> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| ValidatorError::MissingColumn {
            name: name.to_string(),
        })?;

    let data_type = column.data_type();
    if *data_type == DataType::Utf8 {
        return Ok(column.clone());
    }
    if !accept(data_type) {
        return Err(ValidatorError::UnsupportedColumnType {
            name: name.to_string(),
            data_type: data_type.clone(),
        });
    }
    Ok(cast(column.as_ref(), &DataType::Utf8)?)
}
