#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use crate::utils::built_info;

pub static TOOL_NAME: &str = "readmux";

static SHORT_USAGE: &str =
    "Counts multiplexed sequencing reads per reference sequence, lane and sample.";

static LONG_USAGE: &str = "
Counts multiplexed sequencing reads per reference sequence, lane and sample.

Reads every `.txt` file in the data directory.  Each line is a tab-separated aligned read
record; the lane, multiplex tag and reference name fields drive the counting.  The sample
configuration table maps each lane's barcodes to sample names.  Observed barcodes are
matched against the configured barcodes tolerating up to --max-barcode-errors read errors;
an ambiguous best match is counted as unmatched rather than assigned arbitrarily.

The report CSV contains a per-lane statistics summary followed by a reference-by-sample
count matrix covering every lane that received at least one read.

Example invocation:

readmux \\
  --data-dir run42/ \\
  --sample-config samples.txt \\
  --output run42_read_counts.csv
";

#[derive(Parser, Debug, Clone)]
#[clap(name = TOOL_NAME, version = built_info::VERSION.as_str(), about=SHORT_USAGE, long_about=LONG_USAGE, term_width=0)]
pub struct Opts {
    /// Directory containing the aligned read files (`*.txt`).
    #[clap(long, short = 'd', display_order = 1)]
    pub data_dir: PathBuf,

    /// Path to the sample configuration table.
    #[clap(long, short = 's', display_order = 2)]
    pub sample_config: PathBuf,

    /// The file to write the report CSV to.
    ///
    /// This tool will overwrite an existing file.
    ///
    /// [default: <data-dir>_read_counts.csv]
    #[clap(long, short = 'o', display_order = 3)]
    pub output: Option<PathBuf>,

    /// The file to write per-sample read totals to, as TSV.
    ///
    /// [default: None]
    #[clap(long, short = 'p', display_order = 4)]
    pub per_sample_output: Option<PathBuf>,

    /// Path to a custom barcode catalog with one sequence per line.
    ///
    /// Configuration-table barcode indices refer to 1-based positions in this catalog.
    ///
    /// [default: the 12 Illumina TruSeq multiplex barcodes]
    #[clap(long, short = 'b', display_order = 5)]
    pub barcode_catalog: Option<PathBuf>,

    /// Number of allowed errors between an observed barcode and the expected barcode.
    #[clap(long, short = 'm', default_value = "2", display_order = 11)]
    pub max_barcode_errors: usize,

    /// Number of lanes on the flow cell.
    #[clap(long, default_value = "8", display_order = 11)]
    pub lanes: usize,

    /// Maximum number of distinct reference sequences expected in the data.
    #[clap(long, default_value = "25", display_order = 11)]
    pub max_references: usize,
}

/// Parse args and set up logging.
pub fn setup() -> Opts {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    Opts::parse()
}
