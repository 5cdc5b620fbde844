use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::WormbaitError;

/// Prefix of the hint text the front end pre-fills into empty inputs.
pub const PLACEHOLDER_PREFIX: &str = "Enter";

pub const DEFAULT_GENE_PREFIX: &str = "WBGene";

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("separator pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Gene,
    Protein,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Protein => "protein",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = WormbaitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gene" => Ok(EntityKind::Gene),
            "protein" => Ok(EntityKind::Protein),
            _ => Err(WormbaitError::InvalidInput(format!(
                "unknown entity kind: {value}"
            ))),
        }
    }
}

/// True for blank values and for the pre-filled "Enter ..." hints.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.starts_with(PLACEHOLDER_PREFIX)
}

/// Normalizes free-form identifier text into an ordered token list.
///
/// Lines are split first, then each line on any run of commas and
/// whitespace. Tokens keep their input order and are not deduplicated.
pub fn parse_identifiers(raw: &str) -> Result<Vec<String>, WormbaitError> {
    if is_placeholder(raw) {
        return Err(WormbaitError::InvalidInput(
            "please enter some number of XLOC IDs".to_string(),
        ));
    }

    let tokens = raw
        .lines()
        .flat_map(|line| SEPARATORS.split(line))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if tokens.is_empty() {
        return Err(WormbaitError::InvalidInput(
            "input contains only separators".to_string(),
        ));
    }
    Ok(tokens)
}

/// Splits a `gene` cell into external gene ids, dropping empty pieces.
pub fn split_gene_ids(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn has_gene_prefix(gene_id: &str, prefix: &str) -> bool {
    !gene_id.is_empty() && gene_id.starts_with(prefix)
}
