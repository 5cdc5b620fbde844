//! Aggregates WormBase annotations for the genes behind Cuffdiff XLOC loci.
//!
//! The flow is `domain::parse_identifiers` -> `database::CuffdiffDatabase`
//! -> `record::RecordBuilder` (one row per XLOC/gene pair, remote fields via
//! `wormbase::WormbaseClient`) -> `table::write_records`, driven by
//! `pipeline::Pipeline`.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod table;
pub mod wormbase;
