//! The lane to barcode to sample assignment, built from a sample configuration table.
//!
//! The configuration table is tab-separated with the header
//! `Lane #<tab>Sample Name<tab>Lib Conc (pM)<tab>Index #`.  Each row assigns a lane a
//! comma-separated (and possibly quoted) list of sample names paired positionally with a
//! comma-separated list of 1-based barcode catalog indices:
//!
//! ```text
//! Lane #  Sample Name  Lib Conc (pM)  Index #
//! 1       "S61,S62"    14             "1,2"
//! 2       "S62,S64"    14             "2,4"
//! ```
//!
//! Rows with fewer than four columns are skipped; trailing names without a paired index are
//! ignored.  The map is built once before any read is processed and is immutable afterward.

use std::path::Path;

use ahash::AHashMap;
use bstr::BString;
use csv::{ReaderBuilder, StringRecord, Trim};
use fgoxide::io::Io;
use itertools::Itertools;
use thiserror::Error;

use crate::barcodes::BarcodeCatalog;

/// The expected configuration table header columns (the third is ignored).
const HEADER_LANE: &str = "Lane #";
const HEADER_SAMPLE_NAME: &str = "Sample Name";
const HEADER_INDEX: &str = "Index #";

/// The number of columns a configuration row must have to be considered.
const MIN_CONFIG_COLUMNS: usize = 4;

/// The error that may occur when building the [`SampleBarcodeMap`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read sample configuration")]
    Io(#[from] fgoxide::FgError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("The sample configuration was empty")]
    Empty,

    #[error("Bad header in sample configuration, expected '{expected}', found '{found}'")]
    BadHeader { expected: String, found: String },

    #[error("Bad lane '{value}' in sample configuration, lanes are 1-{lanes}")]
    BadLane { value: String, lanes: usize },

    #[error(
        "Bad barcode index '{value}' in sample configuration, catalog indices are 1-{catalog_size}"
    )]
    BadBarcodeIndex { value: String, catalog_size: usize },

    #[error("Samples {name_a} and {name_b} on lane {lane} share barcode {barcode}")]
    DuplicateBarcode { lane: usize, name_a: String, name_b: String, barcode: String },
}

/// A single sample registered on a lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// The 0-based lane the sample was configured on.
    pub lane: usize,
    /// The dense 0-based position of the sample within its lane, in configuration order.
    pub plex_index: usize,
    /// The sample name.
    pub name: String,
    /// The sample barcode sequence resolved from the catalog.
    pub barcode: BString,
}

/// The per-lane registry of samples keyed by barcode sequence.
#[derive(Debug, Default, Clone)]
pub struct LaneRegistry {
    /// The samples on this lane in plex-index order.
    samples: Vec<Sample>,
    /// Barcode sequence to plex index.
    by_barcode: AHashMap<Vec<u8>, usize>,
}

impl LaneRegistry {
    /// The number of samples configured for this lane.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples on this lane in plex-index order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The plex index of an exactly matching barcode, if present.
    pub fn plex_of(&self, barcode: &[u8]) -> Option<usize> {
        self.by_barcode.get(barcode).copied()
    }

    fn insert(&mut self, lane: usize, name: String, barcode: BString) -> Result<(), ConfigError> {
        if let Some(&existing) = self.by_barcode.get(barcode.as_slice()) {
            return Err(ConfigError::DuplicateBarcode {
                lane: lane + 1,
                name_a: self.samples[existing].name.clone(),
                name_b: name,
                barcode: barcode.to_string(),
            });
        }
        let plex_index = self.samples.len();
        self.by_barcode.insert(barcode.to_vec(), plex_index);
        self.samples.push(Sample { lane, plex_index, name, barcode });
        Ok(())
    }
}

/// The lane to (barcode to sample) assignment for one run.
#[derive(Debug, Clone)]
pub struct SampleBarcodeMap {
    lanes: Vec<LaneRegistry>,
}

impl SampleBarcodeMap {
    /// Build the map from a configuration table at the given path.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Io`] / [`ConfigError::Csv`] if the table cannot be read
    /// - [`ConfigError::Empty`] / [`ConfigError::BadHeader`] for a missing or malformed header
    /// - [`ConfigError::BadLane`] / [`ConfigError::BadBarcodeIndex`] for out-of-range values
    /// - [`ConfigError::DuplicateBarcode`] if two samples on a lane share a barcode
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        catalog: &BarcodeCatalog,
        num_lanes: usize,
    ) -> Result<Self, ConfigError> {
        let io = Io::default();
        let lines = io.read_lines(&path)?;
        Self::from_lines(&lines, catalog, num_lanes)
    }

    /// Build the map from the raw lines of a configuration table.
    pub fn from_lines(
        lines: &[String],
        catalog: &BarcodeCatalog,
        num_lanes: usize,
    ) -> Result<Self, ConfigError> {
        let data = lines.join("\n");
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data.as_bytes());

        let mut records: Vec<StringRecord> = vec![];
        for record in reader.records() {
            records.push(record?);
        }

        let header = records.first().ok_or(ConfigError::Empty)?;
        Self::validate_header(header)?;

        let mut lanes = vec![LaneRegistry::default(); num_lanes];
        for record in &records[1..] {
            // Rows without the full set of columns are skipped, not an error.
            if record.len() < MIN_CONFIG_COLUMNS {
                continue;
            }

            let lane = Self::parse_lane(&record[0], num_lanes)?;

            // Sample names and catalog indices are comma-separated lists, positionally
            // paired.  An empty name or a name without a paired index ends the row.
            let names: Vec<&str> = record[1].split(',').map(str::trim).collect();
            let indices: Vec<&str> = record[3].split(',').map(str::trim).collect();

            for (i, name) in names.iter().enumerate() {
                if name.is_empty() || i >= indices.len() {
                    break;
                }
                let barcode = Self::resolve_barcode(indices[i], catalog)?;
                lanes[lane].insert(lane, (*name).to_string(), barcode)?;
            }
        }

        Ok(Self { lanes })
    }

    /// Validate the configuration header row.
    fn validate_header(header: &StringRecord) -> Result<(), ConfigError> {
        let ok = header.len() == MIN_CONFIG_COLUMNS
            && &header[0] == HEADER_LANE
            && &header[1] == HEADER_SAMPLE_NAME
            && &header[3] == HEADER_INDEX;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::BadHeader {
                expected: format!(
                    "{}\t{}\tLib Conc (pM)\t{}",
                    HEADER_LANE, HEADER_SAMPLE_NAME, HEADER_INDEX
                ),
                found: header.iter().join("\t"),
            })
        }
    }

    /// Parse a 1-based lane number into its 0-based slot.
    ///
    /// The upper bound is exclusive of one-past-the-end: a lane number equal to the lane
    /// count is the last valid lane, one more is an error.
    fn parse_lane(raw: &str, num_lanes: usize) -> Result<usize, ConfigError> {
        match raw.parse::<usize>() {
            Ok(lane) if (1..=num_lanes).contains(&lane) => Ok(lane - 1),
            _ => Err(ConfigError::BadLane { value: raw.to_string(), lanes: num_lanes }),
        }
    }

    /// Resolve a 1-based barcode catalog index to its sequence.
    fn resolve_barcode(raw: &str, catalog: &BarcodeCatalog) -> Result<BString, ConfigError> {
        let barcode = match raw.parse::<usize>() {
            Ok(index) if index >= 1 => catalog.get(index - 1),
            _ => None,
        };
        match barcode {
            Some(barcode) => Ok(barcode.clone()),
            None => Err(ConfigError::BadBarcodeIndex {
                value: raw.to_string(),
                catalog_size: catalog.len(),
            }),
        }
    }

    /// The number of lanes the map was sized for.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// The registry for a 0-based lane.
    pub fn lane(&self, lane: usize) -> Option<&LaneRegistry> {
        self.lanes.get(lane)
    }

    /// The registries for all lanes, indexed by 0-based lane.
    pub fn lanes(&self) -> &[LaneRegistry] {
        &self.lanes
    }

    /// The total number of samples registered across all lanes.
    pub fn total_samples(&self) -> usize {
        self.lanes.iter().map(LaneRegistry::len).sum()
    }
}
