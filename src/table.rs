use std::fs;

use camino::Utf8Path;
use csv::WriterBuilder;
use tracing::info;

use crate::error::WormbaitError;
use crate::record::GeneRecord;

pub const OUTPUT_HEADERS: [&str; 11] = [
    "xloc_id",
    "gene_id",
    "up/down",
    "sequence_name",
    "protein_id",
    "best_human_ortholog",
    "description",
    "gene_class",
    "human_orthologs",
    "nematode_orthologs",
    "other_orthologs",
];

/// Writes `records` as CSV with one column per header, in header order.
///
/// The table is written to a temporary file beside `destination` and then
/// moved over it, so a failed write never leaves a truncated table behind.
pub fn write_records<S: AsRef<str>>(
    records: &[GeneRecord],
    headers: &[S],
    destination: &Utf8Path,
) -> Result<(), WormbaitError> {
    let fail = |message: String| WormbaitError::OutputWrite {
        path: destination.as_std_path().to_path_buf(),
        message,
    };

    let parent = match destination.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path()).map_err(|err| fail(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".wormbait-out")
        .suffix(".csv")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| fail(err.to_string()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(temp.as_file());
    writer
        .write_record(headers.iter().map(|header| header.as_ref()))
        .map_err(|err| fail(err.to_string()))?;
    for record in records {
        writer
            .write_record(
                headers
                    .iter()
                    .map(|header| record.field(header.as_ref()).unwrap_or_default()),
            )
            .map_err(|err| fail(err.to_string()))?;
    }
    writer.flush().map_err(|err| fail(err.to_string()))?;
    drop(writer);

    temp.persist(destination.as_std_path())
        .map_err(|err| fail(err.to_string()))?;
    info!(path = %destination, rows = records.len(), "wrote output table");
    Ok(())
}
