use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value as JsonValue, json};

use super::loader::Format;
use super::model::{Dataset, TableMeta, Value};
use crate::error::TableError;

/// Longest key written as a plain header card; longer keys get the
/// `HIERARCH` prefix.
pub const SHORT_KEY_LEN: usize = 8;
const HIERARCH: &str = "HIERARCH ";

/// Write `dataset` with its header entries to `path`. Dispatch by extension.
///
/// Never overwrites: an existing `path` yields [`TableError::AlreadyExists`].
pub fn write_table(dataset: &Dataset, meta: &TableMeta, path: &Path) -> Result<(), TableError> {
    let format = Format::from_path(path)?;
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(TableError::AlreadyExists(path.to_path_buf()));
        }
        Err(e) => {
            return Err(TableError::Format {
                path: path.to_path_buf(),
                source: anyhow::Error::new(e).context("creating output file"),
            });
        }
    };

    let written = match format {
        Format::Parquet => write_parquet(dataset, meta, file),
        Format::Json => write_json(dataset, meta, file),
        Format::Csv => write_csv(dataset, meta, file),
    };
    if let Err(source) = written {
        // Leave no truncated output behind.
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Could not remove partial output {}: {e}", path.display());
        }
        return Err(TableError::Format {
            path: path.to_path_buf(),
            source,
        });
    }

    log::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Header cards (CSV)
// ---------------------------------------------------------------------------

/// Render one header entry as `key = value`, or `HIERARCH key = value` when
/// the key is longer than [`SHORT_KEY_LEN`].
pub fn format_card(key: &str, value: &Value) -> String {
    if key.chars().count() > SHORT_KEY_LEN {
        format!("{HIERARCH}{key} = {value}")
    } else {
        format!("{key} = {value}")
    }
}

/// Inverse of [`format_card`]. Splits at the first `=`.
pub fn parse_card(card: &str) -> Option<(&str, &str)> {
    let card = card.trim();
    let card = card.strip_prefix(HIERARCH).unwrap_or(card);
    let (key, value) = card.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn write_csv(dataset: &Dataset, meta: &TableMeta, file: File) -> Result<()> {
    let mut out = BufWriter::new(file);
    for (key, value) in meta.iter() {
        writeln!(out, "# {}", format_card(key, value)).context("writing header card")?;
    }

    // Text fields are quoted so a leading `#` is not read back as a header card.
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(out);
    writer
        .write_record(&dataset.columns)
        .context("writing CSV header")?;
    for (row_no, row) in dataset.rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON writer
// ---------------------------------------------------------------------------

fn write_json(dataset: &Dataset, meta: &TableMeta, file: File) -> Result<()> {
    let meta: Map<String, JsonValue> = meta
        .iter()
        .map(|(k, v)| (k.to_string(), value_to_json(v)))
        .collect();
    let rows: Vec<JsonValue> = dataset
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, JsonValue> = dataset
                .columns
                .iter()
                .zip(row)
                .map(|(col, v)| (col.clone(), value_to_json(v)))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();

    let mut out = BufWriter::new(file);
    let doc = json!({ "meta": meta, "columns": dataset.columns, "rows": rows });
    serde_json::to_writer_pretty(&mut out, &doc)
        .context("serialising JSON")?;
    out.flush().context("flushing JSON")?;
    Ok(())
}

/// Non-finite floats have no JSON representation and become `null`.
fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => json!(i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Null => JsonValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

fn write_parquet(dataset: &Dataset, meta: &TableMeta, file: File) -> Result<()> {
    let mut fields = Vec::with_capacity(dataset.columns.len());
    let mut arrays = Vec::with_capacity(dataset.columns.len());
    for (idx, name) in dataset.columns.iter().enumerate() {
        let (data_type, array) = build_column(dataset.rows.iter().map(|row| &row[idx]));
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }
    let schema = Arc::new(Schema::new(fields));

    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)
        .context("building record batch")?;

    let kvs = meta
        .iter()
        .map(|(k, v)| KeyValue::new(k.to_string(), v.to_string()))
        .collect();
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(kvs))
        .build();

    let mut writer =
        ArrowWriter::try_new(file, schema, Some(props)).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Pick the narrowest Arrow type holding every non-null cell of a column and
/// build the array. Mixed columns fall back to strings.
fn build_column<'a>(cells: impl Iterator<Item = &'a Value> + Clone) -> (DataType, ArrayRef) {
    let mut ints = true;
    let mut floats = true;
    let mut bools = true;
    for cell in cells.clone() {
        match cell {
            Value::Null => {}
            Value::Integer(_) => bools = false,
            Value::Float(_) => {
                ints = false;
                bools = false;
            }
            Value::Bool(_) => {
                ints = false;
                floats = false;
            }
            Value::String(_) => {
                ints = false;
                floats = false;
                bools = false;
            }
        }
    }

    let all_null = cells.clone().all(Value::is_null);
    if ints && !all_null {
        let mut b = Int64Builder::new();
        for cell in cells {
            match cell {
                Value::Integer(i) => b.append_value(*i),
                _ => b.append_null(),
            }
        }
        (DataType::Int64, Arc::new(b.finish()))
    } else if floats && !all_null {
        let mut b = Float64Builder::new();
        for cell in cells {
            match cell.as_f64() {
                Some(v) => b.append_value(v),
                None => b.append_null(),
            }
        }
        (DataType::Float64, Arc::new(b.finish()))
    } else if bools && !all_null {
        let mut b = BooleanBuilder::new();
        for cell in cells {
            match cell {
                Value::Bool(v) => b.append_value(*v),
                _ => b.append_null(),
            }
        }
        (DataType::Boolean, Arc::new(b.finish()))
    } else {
        let mut b = StringBuilder::new();
        for cell in cells {
            match cell {
                Value::Null => b.append_null(),
                other => b.append_value(other.to_string()),
            }
        }
        (DataType::Utf8, Arc::new(b.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_table, read_table_meta};

    fn sample() -> (Dataset, TableMeta) {
        let ds = Dataset::new(
            vec!["ID".into(), "z".into(), "type".into(), "Haflux".into()],
            vec![
                vec![Value::Integer(1), Value::Float(0.5), "ELG".into(), Value::Float(1e-16)],
                vec![Value::Integer(2), Value::Float(0.75), "ELG".into(), Value::Null],
            ],
        );
        let mut meta = TableMeta::new();
        meta.insert("type_sel", "type=ELG");
        meta.insert("Haflux_sel", "Haflux_gt_8e-17");
        meta.insert("purity", 0.75);
        meta.insert("complete", 0.5);
        (ds, meta)
    }

    #[test]
    fn long_keys_use_hierarch_cards() {
        assert_eq!(format_card("purity", &Value::Float(0.75)), "purity = 0.75");
        assert_eq!(
            format_card("Haflux_sel", &Value::from("Haflux_gt_8e-17")),
            "HIERARCH Haflux_sel = Haflux_gt_8e-17"
        );
        assert_eq!(
            parse_card(" HIERARCH type_sel = type=ELG"),
            Some(("type_sel", "type=ELG"))
        );
        assert_eq!(parse_card(" just a comment"), None);
    }

    #[test]
    fn every_format_round_trips_rows_and_meta() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (ds, meta) = sample();
        for name in ["out.csv", "out.json", "out.parquet"] {
            let path = dir.path().join(name);
            write_table(&ds, &meta, &path).expect("write table");
            let back = load_table(&path).expect("load table");
            assert_eq!(back, ds, "rows differ for {name}");
            let back_meta = read_table_meta(&path).expect("read meta");
            assert_eq!(back_meta.get("purity"), Some(&Value::Float(0.75)), "{name}");
            assert_eq!(
                back_meta.get("Haflux_sel"),
                Some(&Value::from("Haflux_gt_8e-17")),
                "{name}"
            );
        }
    }

    #[test]
    fn csv_text_starting_with_hash_is_not_a_comment() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hash.csv");
        let ds = Dataset::new(
            vec!["#name".into(), "z".into()],
            vec![
                vec!["#obj1".into(), Value::Float(0.4)],
                vec!["obj2".into(), Value::Float(0.5)],
            ],
        );
        let mut meta = TableMeta::new();
        meta.insert("purity", 0.75);
        write_table(&ds, &meta, &path).expect("write table");

        let back = load_table(&path).expect("load table");
        assert_eq!(back.len(), 2);
        assert_eq!(back, ds);
        let back_meta = read_table_meta(&path).expect("read meta");
        assert_eq!(back_meta.iter().count(), 1);
    }

    #[test]
    fn empty_json_keeps_its_columns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.json");
        let (ds, meta) = sample();
        let empty = ds.retain_mask(&[false, false]);
        write_table(&empty, &meta, &path).expect("write table");

        let back = load_table(&path).expect("load table");
        assert!(back.is_empty());
        assert_eq!(back.columns, ds.columns);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "keep me").expect("seed file");
        let (ds, meta) = sample();
        let err = write_table(&ds, &meta, &path).unwrap_err();
        assert!(matches!(err, TableError::AlreadyExists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}
