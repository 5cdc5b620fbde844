use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use camino::Utf8Path;
use csv::{ErrorKind, ReaderBuilder, Trim};
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::WormbaitError;

pub const GENE_COLUMN: &str = "gene";
pub const FOLD_CHANGE_COLUMN: &str = "log2(fold_change)";

/// One data row of the local table, addressed by column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRow {
    columns: Arc<Vec<String>>,
    values: Vec<String>,
}

impl LocalRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        // a repeated header resolves to its last cell
        self.columns
            .iter()
            .rposition(|name| name == column)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
    }

    pub fn key(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }

    pub fn gene_cell(&self) -> Option<&str> {
        self.get(GENE_COLUMN)
    }

    pub fn fold_change(&self) -> Option<&str> {
        self.get(FOLD_CHANGE_COLUMN)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Cuffdiff-style differential expression table keyed by its first column.
///
/// Loaded once per run and read-only afterwards. When a key appears on more
/// than one row the last row wins and a warning is logged.
#[derive(Debug, Clone, Default)]
pub struct CuffdiffDatabase {
    columns: Arc<Vec<String>>,
    rows: HashMap<String, LocalRow>,
}

impl CuffdiffDatabase {
    pub fn load(path: &Utf8Path) -> Result<Self, WormbaitError> {
        let file = File::open(path.as_std_path()).map_err(|err| WormbaitError::DatabaseRead {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
        if path.extension() == Some("gz") {
            debug!(path = %path, "reading gzip-compressed database");
            Self::from_reader(GzDecoder::new(file))
        } else {
            Self::from_reader(file)
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, WormbaitError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .has_headers(true)
            .flexible(false)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(map_csv_error)?.clone();
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(WormbaitError::MalformedHeader(
                "missing header row".to_string(),
            ));
        }
        let columns = Arc::new(headers.iter().map(str::to_string).collect::<Vec<_>>());

        let mut rows = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(map_csv_error)?;
            let row = LocalRow {
                columns: Arc::clone(&columns),
                values: record.iter().map(str::to_string).collect(),
            };
            let key = row.key().to_string();
            if let Some(previous) = rows.insert(key.clone(), row) {
                warn!(key = %key, previous = ?previous.values, "duplicate key in database, keeping last row");
            }
        }
        debug!(rows = rows.len(), columns = columns.len(), "loaded database");

        Ok(Self { columns, rows })
    }

    pub fn get(&self, key: &str) -> Option<&LocalRow> {
        self.rows.get(key)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn map_csv_error(err: csv::Error) -> WormbaitError {
    match err.kind() {
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => WormbaitError::MalformedTable {
            line: pos.as_ref().map(|pos| pos.line()).unwrap_or_default(),
            expected: *expected_len as usize,
            found: *len as usize,
        },
        ErrorKind::Io(io) => WormbaitError::DatabaseRead {
            path: Default::default(),
            message: io.to_string(),
        },
        _ => WormbaitError::MalformedHeader(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const TABLE: &str = "test_id,gene,log2(fold_change)\n\
                         XLOC_000001,WBGene00000001,2.3\n\
                         XLOC_000002,\"WBGene00000002,WBGene00000003\",-1.5\n";

    #[test]
    fn lookup_by_first_column() {
        let db = CuffdiffDatabase::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(db.len(), 2);
        let row = db.get("XLOC_000002").unwrap();
        assert_eq!(row.gene_cell(), Some("WBGene00000002,WBGene00000003"));
        assert_eq!(row.fold_change(), Some("-1.5"));
        assert_eq!(row.key(), "XLOC_000002");
    }

    #[test]
    fn missing_key_is_absent() {
        let db = CuffdiffDatabase::from_reader(TABLE.as_bytes()).unwrap();
        assert!(db.get("XLOC_999999").is_none());
    }

    #[test]
    fn duplicate_key_keeps_last_row() {
        let table = "id,gene,log2(fold_change)\nX,WBGene1,1\nX,WBGene2,2\n";
        let db = CuffdiffDatabase::from_reader(table.as_bytes()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("X").unwrap().gene_cell(), Some("WBGene2"));
    }

    #[test]
    fn short_row_is_malformed() {
        let table = "id,gene,log2(fold_change)\nX,WBGene1\n";
        let err = CuffdiffDatabase::from_reader(table.as_bytes()).unwrap_err();
        assert_matches!(
            err,
            WormbaitError::MalformedTable {
                line: 2,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = CuffdiffDatabase::from_reader("".as_bytes()).unwrap_err();
        assert_matches!(err, WormbaitError::MalformedHeader(_));
    }

    #[test]
    fn row_iterates_in_header_order() {
        let db = CuffdiffDatabase::from_reader(TABLE.as_bytes()).unwrap();
        let pairs = db.get("XLOC_000001").unwrap().iter().collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                ("test_id", "XLOC_000001"),
                ("gene", "WBGene00000001"),
                ("log2(fold_change)", "2.3"),
            ]
        );
    }
}
