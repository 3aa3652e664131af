//! Test helpers shared across module tests.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use parquet::file::properties::WriterProperties;

use crate::common::{HOLES_COLUMN, ID_COLUMN};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its result together with
/// everything logged at `WARN` or above, one event per line.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (result, logs)
}

/// Write a two-column `uuid`/`holes` Parquet file, splitting row groups every
/// `max_row_group_size` rows when given.
pub fn write_parquet(path: &Path, ids: &[String], holes: &[Option<String>], max_row_group_size: Option<usize>) {
    let schema = Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(HOLES_COLUMN, DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(ids)),
            Arc::new(StringArray::from_iter(holes.iter().map(|h| h.as_deref()))),
        ],
    )
    .unwrap();

    let mut props = WriterProperties::builder();
    if let Some(rows) = max_row_group_size {
        props = props.set_max_row_group_size(rows);
    }
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props.build())).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Write a file whose required columns are surrounded by unrelated ones.
pub fn write_parquet_with_extra_column(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("weight_kg", DataType::Float64, false),
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new("material", DataType::Utf8, false),
        Field::new(HOLES_COLUMN, DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(vec![1.5, 2.25])),
            Arc::new(StringArray::from(vec!["p1", "p2"])),
            Arc::new(StringArray::from(vec!["steel", "aluminium"])),
            Arc::new(StringArray::from(vec![Some(r#"[{"length": 90, "radius": 1}]"#), None])),
        ],
    )
    .unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Write a file whose `holes` column holds integers instead of JSON text.
pub fn write_parquet_with_numeric_holes(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(HOLES_COLUMN, DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["p1", "p2", "p3"])),
            Arc::new(Int64Array::from(vec![1, 2, 3])),
        ],
    )
    .unwrap();

    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Overwrite the bytes of one column chunk with `0xFF`, leaving the footer intact.
pub fn corrupt_column_chunk(path: &Path, row_group: usize, column: &str) {
    let metadata = ArrowReaderMetadata::load(&File::open(path).unwrap(), ArrowReaderOptions::new()).unwrap();
    let index = metadata.schema().index_of(column).unwrap();
    let (start, len) = metadata.metadata().row_group(row_group).column(index).byte_range();

    let mut bytes = std::fs::read(path).unwrap();
    let range = start as usize..(start + len) as usize;
    bytes[range].fill(0xFF);
    std::fs::write(path, bytes).unwrap();
}
