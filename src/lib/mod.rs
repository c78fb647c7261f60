//! A library for counting multiplexed sequencing reads per reference, lane and sample.
//!
//! # Overview
//!
//! The flow of data is as follows:
//!
//! - The [`sample_map::SampleBarcodeMap`] is built once from the configuration table,
//!   registering each lane's barcode-to-sample assignments against a [`barcodes::BarcodeCatalog`].
//! - [`record`] parses each tab-separated read line into a [`record::ReadRecord`].
//! - The [`matcher::CachedAlignmentMatcher`] resolves an observed barcode to a per-lane plex
//!   index under a bounded error budget, with ambiguous matches counted as unmatched.
//! - [`counts`] aggregates the reference-by-lane-by-sample count table and per-lane statistics.
//! - The [`report::ReportBuilder`] renders the summary and count matrix, written by [`run`].
#![deny(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]
pub mod barcodes;
pub mod counts;
pub mod matcher;
pub mod opts;
pub mod record;
pub mod report;
pub mod run;
pub mod sample_map;
pub mod utils;
