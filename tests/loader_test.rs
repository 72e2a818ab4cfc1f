use std::fs;
use std::sync::Arc;

use arrow::array::{BooleanArray, Date32Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

use rusty_events::data::loader::load_file;
use rusty_events::{Dataset, Events, EventsError, Selection, Value};

fn dataset() -> Dataset {
    Dataset::new()
        .with_coord("channel", vec!["a".into(), "b".into()])
        .unwrap()
}

#[test]
fn test_load_csv_infers_types() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.csv");
    fs::write(
        &path,
        "time,label,amplitude,valid\n0.5,spike,3,true\n1.5, burst ,,false\n",
    )
    .unwrap();

    let table = load_file(&path).unwrap();
    assert_eq!(table.column_names(), &["time", "label", "amplitude", "valid"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0, "time"), Some(&Value::Float(0.5)));
    assert_eq!(table.get(0, "amplitude"), Some(&Value::Integer(3)));
    assert_eq!(table.get(1, "label"), Some(&Value::from("burst")));
    assert_eq!(table.get(1, "amplitude"), Some(&Value::Null));
    assert_eq!(table.get(1, "valid"), Some(&Value::Bool(false)));
}

#[test]
fn test_load_csv_ragged_row_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.csv");
    fs::write(&path, "a,b\n1,2\n3\n").unwrap();
    match load_file(&path) {
        Err(EventsError::Load { source, .. }) => {
            assert_eq!(source.to_string(), "CSV row 1: 1 fields but 2 columns")
        }
        other => panic!("Expected Load error, got {other:?}"),
    }
}

#[test]
fn test_load_json_from_path_string() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.JSON");
    fs::write(
        &path,
        r#"[{"label": "spike", "channel": "a"}, {"label": "noise", "channel": "b"}]"#,
    )
    .unwrap();

    let mut events = Events::new(dataset());
    events
        .load(path.to_string_lossy().into_owned())
        .unwrap()
        .sel(Selection::new().with("label", "noise"))
        .unwrap();
    let table = events.events().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.event_ids(), &[1]);
}

#[test]
fn test_load_parquet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.parquet");

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("time", DataType::Float64, false),
        Field::new("label", DataType::Utf8, true),
        Field::new("valid", DataType::Boolean, false),
        Field::new("day", DataType::Date32, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![0.1, 0.2, 0.3])),
            Arc::new(StringArray::from(vec![Some("spike"), None, Some("burst")])),
            Arc::new(BooleanArray::from(vec![true, false, true])),
            Arc::new(Date32Array::from(vec![0, 1, 19723])),
        ],
    )
    .unwrap();
    let file = fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = load_file(&path).unwrap();
    assert_eq!(table.column_names(), &["id", "time", "label", "valid", "day"]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(2, "id"), Some(&Value::Integer(3)));
    assert_eq!(table.get(1, "label"), Some(&Value::Null));
    assert_eq!(table.get(0, "valid"), Some(&Value::Bool(true)));
    assert_eq!(table.get(0, "day"), Some(&Value::Date("1970-01-01".into())));
    assert_eq!(table.get(2, "day"), Some(&Value::Date("2024-01-01".into())));
}

#[test]
fn test_unsupported_format_names_extension() {
    let mut events = Events::new(dataset());
    let err = events.load("events.feather").unwrap_err();
    assert!(matches!(err, EventsError::UnsupportedFileFormat { .. }));
    assert!(err.to_string().contains(".feather"));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let result = load_file(&dir.path().join("absent.csv"));
    assert!(matches!(result, Err(EventsError::Load { .. })));
}

#[test]
fn test_dataset_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ds.json");
    fs::write(
        &path,
        r#"{
            "coords": [
                {"name": "time", "labels": [0, 1, 2]},
                {"name": "channel", "labels": ["a", "b"]}
            ],
            "data_vars": {
                "signal": {"dims": ["time", "channel"], "data": [0, 1, 2, 3, 4, 5]}
            }
        }"#,
    )
    .unwrap();

    let ds = Dataset::from_path(&path).unwrap();
    assert_eq!(ds.sizes(), vec![("time", 3), ("channel", 2)]);
    assert_eq!(ds.variable("signal").unwrap().data[5], 5.0);
}
