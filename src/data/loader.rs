use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array,
    Int64Array, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, TableMeta, Value};
use crate::error::TableError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Table formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
    Parquet,
}

impl Format {
    /// Supported extensions:
    /// * `.parquet` / `.pq` – flat scalar columns
    /// * `.json`    – `[{ "ID": 1, "z": 0.4, ... }, ...]` or `{ "meta": {...}, "rows": [...] }`
    /// * `.csv`     – header row, `#` lines are header cards
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => Ok(Format::Parquet),
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            other => Err(TableError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Load a table from a file. Dispatch by extension.
pub fn load_table(path: &Path) -> Result<Dataset, TableError> {
    let format = Format::from_path(path)?;
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    let dataset = match format {
        Format::Parquet => load_parquet(path),
        Format::Json => load_json(path),
        Format::Csv => load_csv(path),
    }
    .map_err(|source| TableError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        dataset.len(),
        dataset.columns,
        path.display()
    );
    Ok(dataset)
}

/// Read only the header entries stored alongside a table.
pub fn read_table_meta(path: &Path) -> Result<TableMeta, TableError> {
    let format = Format::from_path(path)?;
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    match format {
        Format::Parquet => parquet_meta(path),
        Format::Json => json_meta(path),
        Format::Csv => csv_meta(path),
    }
    .map_err(|source| TableError::Format {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "ID": 1, "z": 0.41, "type": "ELG" },
///   ...
/// ]
/// ```
///
/// The writer wraps the records as
/// `{ "meta": {...}, "columns": [...], "rows": [...] }`; both shapes are
/// accepted. A `columns` list fixes the column order (and keeps the columns of
/// an empty table); other keys follow in order of first appearance.
fn load_json(path: &Path) -> Result<Dataset> {
    let root = read_json(path)?;

    let (records, mut columns) = match &root {
        JsonValue::Array(records) => (records, Vec::new()),
        JsonValue::Object(obj) => {
            let records = obj
                .get("rows")
                .and_then(|r| r.as_array())
                .context("Expected a 'rows' array")?;
            let columns = match obj.get("columns") {
                None => Vec::new(),
                Some(cols) => cols
                    .as_array()
                    .context("Expected 'columns' to be an array")?
                    .iter()
                    .map(|c| c.as_str().map(String::from))
                    .collect::<Option<Vec<String>>>()
                    .context("Expected 'columns' to hold strings")?,
            };
            (records, columns)
        }
        _ => bail!("Expected top-level JSON array or object"),
    };

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Value>> = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn json_meta(path: &Path) -> Result<TableMeta> {
    let root = read_json(path)?;
    let mut meta = TableMeta::new();
    if let Some(entries) = root.get("meta").and_then(|m| m.as_object()) {
        for (key, val) in entries {
            meta.insert(key.clone(), json_to_value(val));
        }
    }
    Ok(meta)
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    serde_json::from_str(&text).context("parsing JSON")
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one object per line.
/// Lines starting with `#` carry header cards and are skipped as data.
fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_path(path)
        .context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != columns.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                columns.len(),
                record.len()
            );
        }
        rows.push(record.iter().map(|cell| Value::guess(cell.trim())).collect());
    }

    Ok(Dataset::new(columns, rows))
}

/// Parse the `# key = value` / `# HIERARCH key = value` lines of a CSV file.
fn csv_meta(path: &Path) -> Result<TableMeta> {
    let text = std::fs::read_to_string(path).context("reading CSV file")?;
    let mut meta = TableMeta::new();
    for line in text.lines() {
        let Some(card) = line.strip_prefix('#') else {
            continue;
        };
        if let Some((key, value)) = super::writer::parse_card(card) {
            meta.insert(key, Value::guess(value));
        }
    }
    Ok(meta)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Works with files written by **Pandas** (`df.to_parquet()`), **Polars**
/// (`df.write_parquet()`) and by [`write_table`](super::writer::write_table).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_columns())
                .map(|col| extract_value(batch.column(col), row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(values);
        }
    }

    Ok(Dataset::new(columns, rows))
}

fn parquet_meta(path: &Path) -> Result<TableMeta> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let mut meta = TableMeta::new();
    if let Some(kvs) = builder.metadata().file_metadata().key_value_metadata() {
        for kv in kvs {
            // Arrow stores its own schema under this key.
            if kv.key == "ARROW:schema" {
                continue;
            }
            let value = kv.value.as_deref().map(Value::guess).unwrap_or(Value::Null);
            meta.insert(kv.key.clone(), value);
        }
    }
    Ok(meta)
}

// -- Parquet / Arrow helpers --

macro_rules! downcast {
    ($col:expr, $ty:ty) => {
        $col.as_any()
            .downcast_ref::<$ty>()
            .with_context(|| format!("expected {}", stringify!($ty)))?
    };
}

/// Extract a single scalar from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(downcast!(col, StringArray).value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Value::Integer(downcast!(col, Int8Array).value(row).into()),
        DataType::Int16 => Value::Integer(downcast!(col, Int16Array).value(row).into()),
        DataType::Int32 => Value::Integer(downcast!(col, Int32Array).value(row).into()),
        DataType::Int64 => Value::Integer(downcast!(col, Int64Array).value(row)),
        DataType::UInt8 => Value::Integer(downcast!(col, UInt8Array).value(row).into()),
        DataType::UInt16 => Value::Integer(downcast!(col, UInt16Array).value(row).into()),
        DataType::UInt32 => Value::Integer(downcast!(col, UInt32Array).value(row).into()),
        DataType::UInt64 => {
            let v = downcast!(col, UInt64Array).value(row);
            Value::Integer(i64::try_from(v).with_context(|| format!("{v} overflows i64"))?)
        }
        DataType::Float32 => Value::Float(downcast!(col, Float32Array).value(row).into()),
        DataType::Float64 => Value::Float(downcast!(col, Float64Array).value(row)),
        DataType::Boolean => Value::Bool(downcast!(col, BooleanArray).value(row)),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use tempfile::{Builder, NamedTempFile};

    fn temp_with(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn csv_cells_are_typed_and_cards_skipped() {
        let file = temp_with(
            ".csv",
            "# purity = 0.75\nID,z,type,flag\n1,0.4,ELG,true\n2,,LRG,false\n",
        );
        let ds = load_table(file.path()).expect("load csv");
        assert_eq!(ds.columns, vec!["ID", "z", "type", "flag"]);
        assert_eq!(
            ds.rows[0],
            vec![
                Value::Integer(1),
                Value::Float(0.4),
                Value::from("ELG"),
                Value::Bool(true)
            ]
        );
        assert_eq!(ds.rows[1][1], Value::Null);
    }

    #[test]
    fn csv_meta_reads_short_and_long_cards() {
        let file = temp_with(
            ".csv",
            "# purity = 0.75\n# HIERARCH Haflux_sel = Haflux_gt_8e-16\nID\n1\n",
        );
        let meta = read_table_meta(file.path()).expect("read meta");
        assert_eq!(meta.get("purity"), Some(&Value::Float(0.75)));
        assert_eq!(meta.get("Haflux_sel"), Some(&Value::from("Haflux_gt_8e-16")));
    }

    #[test]
    fn json_records_fill_missing_keys_with_null() {
        let file = temp_with(".json", r#"[{"ID": 1, "z": 0.5}, {"ID": 2, "type": "ELG"}]"#);
        let ds = load_table(file.path()).expect("load json");
        assert_eq!(ds.columns, vec!["ID", "z", "type"]);
        assert_eq!(ds.rows[0][2], Value::Null);
        assert_eq!(ds.rows[1][2], Value::from("ELG"));
    }

    #[test]
    fn json_accepts_wrapped_rows() {
        let file = temp_with(
            ".json",
            r#"{"meta": {"purity": 0.5}, "rows": [{"ID": 7}]}"#,
        );
        let ds = load_table(file.path()).expect("load json");
        assert_eq!(ds.rows, vec![vec![Value::Integer(7)]]);
        let meta = read_table_meta(file.path()).expect("read meta");
        assert_eq!(meta.get("purity"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_table(Path::new("definitely/missing.csv")).unwrap_err();
        assert!(matches!(err, TableError::NotFound(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_table(Path::new("catalogue.fits")).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(ref ext) if ext == "fits"));
    }

    #[test]
    fn ragged_csv_is_a_format_error() {
        let file = temp_with(".csv", "ID,z\n1,0.2,extra\n");
        let err = load_table(file.path()).unwrap_err();
        assert!(matches!(err, TableError::Format { .. }));
    }
}
