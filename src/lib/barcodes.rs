//! The catalog of known sample barcode sequences.
//!
//! Configuration tables refer to barcodes by their 1-based position in the catalog rather
//! than by sequence.  The default catalog is the set of 12 Illumina TruSeq multiplex
//! six-mers, but a custom catalog may be loaded from a single-column text file.

use std::path::Path;

use bstr::BString;
use fgoxide::io::Io;
use thiserror::Error;

/// The 12 Illumina TruSeq multiplex barcode sequences, catalog indices 1-12.
pub const ILLUMINA_TRUSEQ_BARCODES: [&str; 12] = [
    "ATCACG", "CGATGT", "TTAGGC", "TGACCA", "ACAGTG", "GCCAAT", "CAGATC", "ACTTGA", "GATCAG",
    "TAGCTT", "GGCTAC", "CTTGTA",
];

/// The error that may occur when loading a [`BarcodeCatalog`] from a file.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unable to read barcode catalog")]
    Io(#[from] fgoxide::FgError),

    #[error("Barcode catalog is empty: {path}")]
    Empty { path: String },
}

/// A fixed set of known barcode sequences, indexed 1..N.
#[derive(Debug, Clone)]
pub struct BarcodeCatalog {
    barcodes: Vec<BString>,
}

impl BarcodeCatalog {
    /// Create a catalog from an ordered list of barcode sequences.
    pub fn new<I, B>(barcodes: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BString>,
    {
        Self { barcodes: barcodes.into_iter().map(Into::into).collect() }
    }

    /// Load a catalog from a text file with one barcode sequence per line.
    ///
    /// Blank lines are skipped; sequences are upper-cased.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let io = Io::default();
        let lines = io.read_lines(&path)?;
        let barcodes: Vec<BString> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| BString::from(l.to_ascii_uppercase()))
            .collect();
        if barcodes.is_empty() {
            return Err(CatalogError::Empty { path: path.as_ref().to_string_lossy().to_string() });
        }
        Ok(Self { barcodes })
    }

    /// The number of barcodes in the catalog.
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }

    /// Look up a barcode by its 0-based slot, `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&BString> {
        self.barcodes.get(index)
    }
}

impl Default for BarcodeCatalog {
    fn default() -> Self {
        Self::new(ILLUMINA_TRUSEQ_BARCODES)
    }
}
