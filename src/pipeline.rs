use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::database::CuffdiffDatabase;
use crate::domain::{DEFAULT_GENE_PREFIX, is_placeholder, parse_identifiers, split_gene_ids};
use crate::error::WormbaitError;
use crate::record::{GeneRecord, RecordBuilder};
use crate::table::{OUTPUT_HEADERS, write_records};
use crate::wormbase::WormbaseClient;

/// Explicit inputs of one run; placeholder hints count as missing.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub identifiers: String,
    pub database: Option<Utf8PathBuf>,
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub identifiers: Vec<String>,
    pub missing: Vec<String>,
    pub records: usize,
    pub database: String,
    pub output: String,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

/// Line-oriented progress reporting towards whatever front end drives a run.
pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Cooperative cancellation, checked between identifiers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct Pipeline<C: WormbaseClient> {
    client: C,
    gene_prefix: String,
}

impl<C: WormbaseClient> Pipeline<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            gene_prefix: DEFAULT_GENE_PREFIX.to_string(),
        }
    }

    pub fn with_gene_prefix(mut self, prefix: &str) -> Self {
        self.gene_prefix = prefix.to_string();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn run(
        &self,
        request: &RunRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<RunSummary, WormbaitError> {
        let started_at = iso_timestamp();
        let result = self.run_inner(request, sink, cancel, started_at);
        if let Err(err) = &result {
            report(sink, err.to_string());
        }
        result
    }

    fn run_inner(
        &self,
        request: &RunRequest,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
        started_at: String,
    ) -> Result<RunSummary, WormbaitError> {
        if is_placeholder(&request.identifiers) {
            return Err(WormbaitError::InvalidInput(
                "please enter some number of XLOC IDs".to_string(),
            ));
        }
        let database_path = request
            .database
            .as_ref()
            .filter(|path| !is_placeholder(path.as_str()))
            .ok_or(WormbaitError::MissingDatabasePath)?;
        report(sink, format!("Database file located at: {database_path}"));
        let output_path = request
            .output
            .as_ref()
            .filter(|path| !is_placeholder(path.as_str()))
            .ok_or(WormbaitError::MissingOutputPath)?;
        report(sink, format!("Writing output CSV to: {output_path}"));

        report(sink, "Processing...".to_string());
        let identifiers = parse_identifiers(&request.identifiers)?;
        let database = CuffdiffDatabase::load(database_path)?;
        info!(
            identifiers = identifiers.len(),
            rows = database.len(),
            "starting aggregation run"
        );

        report(
            sink,
            "Beginning data collection from WormBase (this could take a bit)".to_string(),
        );
        let (records, missing) = self.collect(&identifiers, &database, sink, cancel)?;
        report(sink, "Finished collecting data from WormBase".to_string());

        write_records(&records, &OUTPUT_HEADERS, output_path)?;
        report(sink, "Writing output CSV file ... finished!".to_string());
        report(sink, "Run complete!".to_string());

        Ok(RunSummary {
            identifiers,
            missing,
            records: records.len(),
            database: database_path.to_string(),
            output: output_path.to_string(),
            started_at,
            finished_at: iso_timestamp(),
        })
    }

    /// Builds records for every identifier in input order.
    ///
    /// Returns the records together with the identifiers that had no row in
    /// `database`; those are reported and skipped.
    pub fn collect(
        &self,
        identifiers: &[String],
        database: &CuffdiffDatabase,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(Vec<GeneRecord>, Vec<String>), WormbaitError> {
        let builder = RecordBuilder::new(&self.client).with_gene_prefix(&self.gene_prefix);
        let mut records = Vec::new();
        let mut missing = Vec::new();

        for xloc_id in identifiers {
            if cancel.is_cancelled() {
                return Err(WormbaitError::Cancelled);
            }
            let start = Instant::now();
            let Some(row) = database.get(xloc_id) else {
                warn!(xloc_id = %xloc_id, "identifier not found in database");
                report(sink, format!("{xloc_id} ... not found in database"));
                missing.push(xloc_id.clone());
                continue;
            };
            report(sink, format!("{xloc_id} ... collecting"));

            let gene_ids = match row.gene_cell() {
                Some(cell) => split_gene_ids(cell),
                None => {
                    warn!(xloc_id = %xloc_id, "row has no gene column");
                    Vec::new()
                }
            };
            for gene_id in &gene_ids {
                records.push(builder.build(xloc_id, gene_id, database));
            }
            sink.event(ProgressEvent {
                message: format!("{xloc_id} ... finished ({} genes)", gene_ids.len()),
                elapsed: Some(start.elapsed()),
            });
        }

        Ok((records, missing))
    }
}

fn report(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
