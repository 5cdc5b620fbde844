use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::database::CuffdiffDatabase;
use crate::domain::{DEFAULT_GENE_PREFIX, EntityKind, has_gene_prefix};
use crate::wormbase::WormbaseClient;

pub const FIELD_SEQUENCE_NAME: &str = "sequence_name";
pub const FIELD_CONCISE_DESCRIPTION: &str = "concise_description";
pub const FIELD_GENE_MODELS: &str = "gene_models";
pub const FIELD_GENE_CLASS: &str = "gene_class";
pub const FIELD_HUMAN_ORTHOLOGS: &str = "human_orthologs";
pub const FIELD_NEMATODE_ORTHOLOGS: &str = "nematode_orthologs";
pub const FIELD_OTHER_ORTHOLOGS: &str = "other_orthologs";
pub const FIELD_BEST_HUMAN_MATCH: &str = "best_human_match";

/// One output row: a single (XLOC id, WormBase gene id) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneRecord {
    pub xloc_id: String,
    pub gene_id: String,
    #[serde(rename = "up/down")]
    pub up_down: Option<String>,
    pub sequence_name: Option<String>,
    pub protein_id: Option<String>,
    pub best_human_ortholog: Option<String>,
    pub description: Option<String>,
    pub gene_class: Option<String>,
    pub human_orthologs: Option<String>,
    pub nematode_orthologs: Option<String>,
    pub other_orthologs: Option<String>,
}

impl GeneRecord {
    pub fn new(xloc_id: &str, gene_id: &str) -> Self {
        Self {
            xloc_id: xloc_id.to_string(),
            gene_id: gene_id.to_string(),
            ..Self::default()
        }
    }

    /// Looks a cell up by output column name; unknown columns are `None`.
    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            "xloc_id" => Some(self.xloc_id.as_str()),
            "gene_id" => Some(self.gene_id.as_str()),
            "up/down" => self.up_down.as_deref(),
            "sequence_name" => self.sequence_name.as_deref(),
            "protein_id" => self.protein_id.as_deref(),
            "best_human_ortholog" => self.best_human_ortholog.as_deref(),
            "description" => self.description.as_deref(),
            "gene_class" => self.gene_class.as_deref(),
            "human_orthologs" => self.human_orthologs.as_deref(),
            "nematode_orthologs" => self.nematode_orthologs.as_deref(),
            "other_orthologs" => self.other_orthologs.as_deref(),
            _ => None,
        }
    }

    pub fn has_remote_data(&self) -> bool {
        [
            &self.sequence_name,
            &self.protein_id,
            &self.best_human_ortholog,
            &self.description,
            &self.gene_class,
            &self.human_orthologs,
            &self.nematode_orthologs,
            &self.other_orthologs,
        ]
        .iter()
        .any(|value| value.is_some())
    }
}

/// `None` for an empty list, otherwise the items joined by `", "`.
pub fn join_if_extant<S: AsRef<str>>(items: &[S]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| item.as_ref())
            .collect::<Vec<&str>>()
            .join(", "),
    )
}

/// Renders a scalar-ish payload as cell text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Object(map) => match map.get("label") {
            Some(label) if !label.is_object() => scalar_text(label),
            _ => Some(value.to_string()),
        },
        Value::Array(_) => Some(value.to_string()),
    }
}

pub fn description_text(value: &Value) -> Option<String> {
    value.get("text").and_then(scalar_text)
}

/// Collects `table[*].protein.id`, accepting a list of proteins per row.
pub fn protein_ids(gene_models: &Value) -> Vec<String> {
    let Some(rows) = gene_models.get("table").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| row.get("protein"))
        .flat_map(|protein| match protein {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter_map(|protein| protein.get("id"))
        .filter_map(scalar_text)
        .collect()
}

pub fn ortholog_labels(orthologs: &Value) -> Vec<String> {
    let Some(entries) = orthologs.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| entry.get("ortholog"))
        .filter_map(|ortholog| ortholog.get("label"))
        .filter_map(scalar_text)
        .collect()
}

pub fn best_match_description(best_match: &Value) -> Option<String> {
    best_match.get("description").and_then(scalar_text)
}

/// Populates [`GeneRecord`]s from the local table and WormBase.
pub struct RecordBuilder<'a, C: WormbaseClient> {
    client: &'a C,
    gene_prefix: String,
}

impl<'a, C: WormbaseClient> RecordBuilder<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            gene_prefix: DEFAULT_GENE_PREFIX.to_string(),
        }
    }

    pub fn with_gene_prefix(mut self, prefix: &str) -> Self {
        self.gene_prefix = prefix.to_string();
        self
    }

    pub fn build(&self, xloc_id: &str, gene_id: &str, database: &CuffdiffDatabase) -> GeneRecord {
        let mut record = GeneRecord::new(xloc_id, gene_id);
        record.up_down = database
            .get(xloc_id)
            .and_then(|row| row.fold_change())
            .map(str::to_string);

        if !has_gene_prefix(gene_id, &self.gene_prefix) {
            debug!(xloc_id, gene_id, "not a WormBase gene id, skipping remote fields");
            return record;
        }

        record.sequence_name = self
            .fetch(EntityKind::Gene, gene_id, FIELD_SEQUENCE_NAME)
            .as_ref()
            .and_then(scalar_text);

        record.description = self
            .fetch(EntityKind::Gene, gene_id, FIELD_CONCISE_DESCRIPTION)
            .as_ref()
            .and_then(description_text);

        let proteins = self
            .fetch(EntityKind::Gene, gene_id, FIELD_GENE_MODELS)
            .as_ref()
            .map(protein_ids)
            .unwrap_or_default();
        record.protein_id = join_if_extant(&proteins);

        record.gene_class = self
            .fetch(EntityKind::Gene, gene_id, FIELD_GENE_CLASS)
            .as_ref()
            .and_then(scalar_text);

        record.human_orthologs = self.orthologs(gene_id, FIELD_HUMAN_ORTHOLOGS);
        record.nematode_orthologs = self.orthologs(gene_id, FIELD_NEMATODE_ORTHOLOGS);
        record.other_orthologs = self.orthologs(gene_id, FIELD_OTHER_ORTHOLOGS);

        let best_matches = proteins
            .iter()
            .filter_map(|protein| {
                self.fetch(EntityKind::Protein, protein, FIELD_BEST_HUMAN_MATCH)
                    .as_ref()
                    .and_then(best_match_description)
            })
            .collect::<Vec<_>>();
        record.best_human_ortholog = join_if_extant(&best_matches);

        record
    }

    fn orthologs(&self, gene_id: &str, field: &str) -> Option<String> {
        let labels = self
            .fetch(EntityKind::Gene, gene_id, field)
            .as_ref()
            .map(ortholog_labels)
            .unwrap_or_default();
        join_if_extant(&labels)
    }

    fn fetch(&self, kind: EntityKind, id: &str, field: &str) -> Option<Value> {
        match self.client.fetch_field(kind, id, field) {
            Ok(value) => Some(value),
            Err(err) if err.is_remote() => {
                debug!(%kind, id, field, error = %err, "remote field absent");
                None
            }
            Err(err) => {
                warn!(%kind, id, field, error = %err, "unexpected failure fetching field");
                None
            }
        }
    }
}
