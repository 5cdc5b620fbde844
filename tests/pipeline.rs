use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Value, json};

use wormbait::domain::EntityKind;
use wormbait::error::WormbaitError;
use wormbait::pipeline::{CancelToken, Pipeline, ProgressEvent, ProgressSink, RunRequest};
use wormbait::table::OUTPUT_HEADERS;
use wormbait::wormbase::WormbaseClient;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.lines.lock().unwrap().push(event.message);
    }
}

/// Answers `sequence_name` with `abc-1` and fails everything else.
#[derive(Default)]
struct SequenceOnlyWormbase {
    calls: Mutex<Vec<String>>,
}

impl WormbaseClient for SequenceOnlyWormbase {
    fn fetch_field(&self, kind: EntityKind, id: &str, field: &str) -> Result<Value, WormbaitError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{kind}/{id}/{field}"));
        if kind == EntityKind::Gene && field == "sequence_name" {
            Ok(json!("abc-1"))
        } else {
            Err(WormbaitError::RemoteDecode("expected value at line 1".to_string()))
        }
    }
}

struct Workspace {
    _dir: tempfile::TempDir,
    database: Utf8PathBuf,
    output: Utf8PathBuf,
}

fn workspace(table: &str) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let database = root.join("deg.csv");
    fs::write(database.as_std_path(), table).unwrap();
    Workspace {
        _dir: dir,
        database,
        output: root.join("out").join("wormbait.csv"),
    }
}

fn read_output(path: &Utf8PathBuf) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path.as_std_path())
        .unwrap();
    reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn single_gene_row_with_sparse_remote_data() {
    let ws = workspace("id,gene,log2(fold_change)\nXLOC_1,WBGene001,2.3\n");
    let client = SequenceOnlyWormbase::default();
    let pipeline = Pipeline::new(&client);
    let request = RunRequest {
        identifiers: "XLOC_1".to_string(),
        database: Some(ws.database.clone()),
        output: Some(ws.output.clone()),
    };

    let summary = pipeline
        .run(&request, &RecordingSink::default(), &CancelToken::new())
        .unwrap();
    assert_eq!(summary.records, 1);

    let rows = read_output(&ws.output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], OUTPUT_HEADERS.to_vec());
    assert_eq!(
        rows[1],
        vec!["XLOC_1", "WBGene001", "2.3", "abc-1", "", "", "", "", "", "", ""]
    );
}

#[test]
fn two_genes_share_one_xloc_id() {
    let ws = workspace("id,gene,log2(fold_change)\nXLOC_1,\"WBGene001,WBGene002\",-0.7\n");
    let client = SequenceOnlyWormbase::default();
    let request = RunRequest {
        identifiers: "XLOC_1".to_string(),
        database: Some(ws.database.clone()),
        output: Some(ws.output.clone()),
    };

    Pipeline::new(&client)
        .run(&request, &RecordingSink::default(), &CancelToken::new())
        .unwrap();

    let rows = read_output(&ws.output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][0], "XLOC_1");
    assert_eq!(rows[1][1], "WBGene001");
    assert_eq!(rows[2][0], "XLOC_1");
    assert_eq!(rows[2][1], "WBGene002");
}

#[test]
fn unknown_identifier_is_reported_and_skipped() {
    let ws = workspace(
        "id,gene,log2(fold_change)\nXLOC_1,WBGene001,2.3\nXLOC_3,WBGene003,1.1\n",
    );
    let client = SequenceOnlyWormbase::default();
    let sink = RecordingSink::default();
    let request = RunRequest {
        identifiers: "XLOC_1, XLOC_2\nXLOC_3".to_string(),
        database: Some(ws.database.clone()),
        output: Some(ws.output.clone()),
    };

    let summary = Pipeline::new(&client)
        .run(&request, &sink, &CancelToken::new())
        .unwrap();

    assert_eq!(summary.identifiers, vec!["XLOC_1", "XLOC_2", "XLOC_3"]);
    assert_eq!(summary.missing, vec!["XLOC_2"]);
    let rows = read_output(&ws.output);
    let ids = rows[1..].iter().map(|row| row[0].as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["XLOC_1", "XLOC_3"]);

    let lines = sink.lines.lock().unwrap();
    assert!(lines.iter().any(|line| line.starts_with("XLOC_2") && line.contains("not found")));
    assert_eq!(lines.last().map(String::as_str), Some("Run complete!"));
}

#[test]
fn placeholder_gene_gets_local_fields_only() {
    let ws = workspace("id,gene,log2(fold_change)\nXLOC_1,-,0.5\n");
    let client = SequenceOnlyWormbase::default();
    let request = RunRequest {
        identifiers: "XLOC_1".to_string(),
        database: Some(ws.database.clone()),
        output: Some(ws.output.clone()),
    };

    Pipeline::new(&client)
        .run(&request, &RecordingSink::default(), &CancelToken::new())
        .unwrap();

    let rows = read_output(&ws.output);
    assert_eq!(
        rows[1],
        vec!["XLOC_1", "-", "0.5", "", "", "", "", "", "", "", ""]
    );
    assert!(client.calls.lock().unwrap().is_empty());
}

#[test]
fn malformed_table_aborts_without_output() {
    let ws = workspace("id,gene,log2(fold_change)\nXLOC_1,WBGene001\n");
    let client = SequenceOnlyWormbase::default();
    let request = RunRequest {
        identifiers: "XLOC_1".to_string(),
        database: Some(ws.database.clone()),
        output: Some(ws.output.clone()),
    };

    let err = Pipeline::new(&client)
        .run(&request, &RecordingSink::default(), &CancelToken::new())
        .unwrap_err();

    assert_matches!(err, WormbaitError::MalformedTable { .. });
    assert!(!ws.output.as_std_path().exists());
    assert!(client.calls.lock().unwrap().is_empty());
}

#[test]
fn missing_database_file_is_reported() {
    let ws = workspace("id,gene\n");
    let client = SequenceOnlyWormbase::default();
    let request = RunRequest {
        identifiers: "XLOC_1".to_string(),
        database: Some(ws.database.with_file_name("absent.csv")),
        output: Some(ws.output.clone()),
    };

    let err = Pipeline::new(&client)
        .run(&request, &RecordingSink::default(), &CancelToken::new())
        .unwrap_err();
    assert_matches!(err, WormbaitError::DatabaseRead { .. });
}
