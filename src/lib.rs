//! Subsample a catalogue with simple selection criteria and score the
//! selection's completeness and purity against random and ideal reference
//! catalogues.
//!
//! Tables are read and written as CSV, JSON or Parquet, chosen by file
//! extension; FITS is not supported. Selection provenance and statistics go
//! into the output's header entries: `# key = value` comment lines in CSV
//! (with `HIERARCH key = value` for keys longer than eight characters), a
//! `meta` object in JSON, and key–value file metadata in Parquet.

pub mod app;
pub mod config;
pub mod criterion;
pub mod data;
pub mod error;
pub mod selection;
