//! The end-to-end run: enumerate read files, count every line, write the report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fgoxide::io::{DelimFile, Io};
use log::{info, warn};

use crate::barcodes::BarcodeCatalog;
use crate::counts::{ReadCounts, ReferenceIndex};
use crate::matcher::CachedAlignmentMatcher;
use crate::opts::Opts;
use crate::record::{extract_lane, parse_read_line};
use crate::report::ReportBuilder;
use crate::sample_map::SampleBarcodeMap;

/// Execute one full counting run.
pub fn run(opts: Opts) -> Result<(), anyhow::Error> {
    let catalog = match &opts.barcode_catalog {
        Some(path) => BarcodeCatalog::from_path(path)
            .with_context(|| format!("Unable to load barcode catalog {}", path.display()))?,
        None => BarcodeCatalog::default(),
    };
    let map = SampleBarcodeMap::from_path(&opts.sample_config, &catalog, opts.lanes)
        .with_context(|| {
            format!("Unable to load sample configuration {}", opts.sample_config.display())
        })?;
    info!("Configured {} samples across {} lanes", map.total_samples(), opts.lanes);

    let inputs = find_input_files(&opts.data_dir)?;
    if inputs.is_empty() {
        warn!("No .txt read files found in {}", opts.data_dir.display());
    }

    let matcher = CachedAlignmentMatcher::new(&map, opts.max_barcode_errors);
    let mut references = ReferenceIndex::new();
    let mut counts = ReadCounts::new(&map, opts.max_references);

    let io = Io::default();
    for path in &inputs {
        info!("Processing {}", path.display());
        let lines = io
            .read_lines(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;

        // Malformed lines whose lane field is itself unreadable are attributed to the lane
        // of the last parsed record in the file.
        let mut current_lane = 0;
        for line in &lines {
            match parse_read_line(line, opts.lanes) {
                Some(record) => {
                    current_lane = record.lane;
                    counts.record_line(record.lane);
                    let reference_index = references.resolve(&record.reference);
                    counts.record_read(&matcher, reference_index, record.lane, &record.barcode)?;
                }
                None => {
                    let lane = extract_lane(line, opts.lanes).unwrap_or(current_lane);
                    counts.record_line(lane);
                    counts.record_malformed(lane);
                }
            }
        }
    }

    let report = ReportBuilder::new(&map, &references, &counts);

    let output = opts.output.clone().unwrap_or_else(|| default_output_path(&opts.data_dir));
    write_report(&report, &output)?;
    info!("Wrote report to {}", output.display());

    if let Some(path) = &opts.per_sample_output {
        DelimFile::default()
            .write_tsv(path, report.per_sample_counts())
            .with_context(|| format!("Unable to write {}", path.display()))?;
        info!("Wrote per-sample counts to {}", path.display());
    }

    Ok(())
}

/// The regular files in `dir` with a `.txt` extension (case-insensitive), sorted by path
/// for a deterministic processing order.
pub fn find_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Unable to list {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Unable to list {}", dir.display()))?.path();
        let is_txt =
            path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("txt"));
        if path.is_file() && is_txt {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The default report path: the data directory's name with a `_read_counts.csv` suffix,
/// as a sibling of the directory.
fn default_output_path(data_dir: &Path) -> PathBuf {
    let name = data_dir
        .file_name()
        .map_or_else(|| "read_counts".to_string(), |n| n.to_string_lossy().into_owned());
    data_dir.with_file_name(format!("{}_read_counts.csv", name))
}

/// Write the summary table and the count matrix to one CSV file, separated by a blank row.
fn write_report(report: &ReportBuilder, output: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(output)
        .with_context(|| format!("Unable to write {}", output.display()))?;

    for row in report.summary() {
        writer.write_record(&row)?;
    }
    writer.write_record([""])?;
    for row in report.matrix() {
        writer.write_record(&row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::{Path, PathBuf};

    use fgoxide::io::Io;
    use tempfile::tempdir;

    use super::{default_output_path, find_input_files, run};
    use crate::opts::Opts;

    fn read_line(lane: usize, barcode: &str, reference: &str) -> String {
        [
            "HWUSI-EAS000",
            "1",
            &lane.to_string(),
            "103",
            "349",
            "1118",
            barcode,
            "1",
            "ACGTACGTACGT",
            "hhhhhhhhhhhh",
            reference,
            "60486",
            "F",
            "12",
            "37",
        ]
        .join("\t")
    }

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("samples.txt");
        let lines = vec![
            "Lane #\tSample Name\tLib Conc (pM)\tIndex #".to_string(),
            "1\t\"S1,S2\"\t14\t\"1,2\"".to_string(),
        ];
        Io::default().write_lines(&path, &lines).unwrap();
        path
    }

    fn test_opts(data_dir: PathBuf, sample_config: PathBuf, output: PathBuf) -> Opts {
        Opts {
            data_dir,
            sample_config,
            output: Some(output),
            per_sample_output: None,
            barcode_catalog: None,
            max_barcode_errors: 2,
            lanes: 8,
            max_references: 25,
        }
    }

    #[test]
    fn test_find_input_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["b.txt", "a.TXT", "notes.csv", "c.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.txt")).unwrap();

        let names: Vec<String> = find_input_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_default_output_path_is_a_sibling() {
        let path = default_output_path(Path::new("/data/run42"));
        assert_eq!(path, Path::new("/data/run42_read_counts.csv"));
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("run42");
        fs::create_dir(&data_dir).unwrap();

        let lines = vec![
            read_line(1, "ATCACG", "chr2"),
            read_line(1, "ATCACG", "chr2"),
            // One error from CGATGT, still matched to S2.
            read_line(1, "CGATGA", "chr1"),
            // No barcode within budget: counted as unmatched.
            read_line(1, "GGGGGG", "chr1"),
            // Malformed: too few fields, attributed to the last parsed lane.
            "junk".to_string(),
        ];
        Io::default().write_lines(&data_dir.join("reads.txt"), &lines).unwrap();
        let config = write_config(dir.path());

        let output = dir.path().join("report.csv");
        let per_sample = dir.path().join("per_sample.tsv");
        let mut opts = test_opts(data_dir, config, output.clone());
        opts.per_sample_output = Some(per_sample.clone());
        run(opts).unwrap();

        let report = fs::read_to_string(&output).unwrap();
        assert!(report.contains("Total lines,5"));
        assert!(report.contains("Malformed lines,1"));
        assert!(report.contains("Unmatched barcodes,1"));
        assert!(report.contains("Reference,S1,S2"));
        // chr2 was seen first, so it precedes chr1.
        let chr2 = report.find("chr2,2,0").unwrap();
        let chr1 = report.find("chr1,0,1").unwrap();
        assert!(chr2 < chr1);

        let per_sample = fs::read_to_string(&per_sample).unwrap();
        assert!(per_sample.contains("1\tS1\tATCACG\t2"));
        assert!(per_sample.contains("1\tS2\tCGATGT\t1"));
    }

    #[test]
    fn test_run_with_no_counted_reads_writes_empty_report() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("run42");
        fs::create_dir(&data_dir).unwrap();
        let config = write_config(dir.path());

        let output = dir.path().join("report.csv");
        run(test_opts(data_dir, config, output.clone())).unwrap();

        let report = fs::read_to_string(&output).unwrap();
        // No active lanes: headers and labels only.
        assert!(report.contains("Total lines"));
        assert!(!report.contains("Lane#"));
    }

    #[test]
    fn test_run_with_bad_config_fails() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("run42");
        fs::create_dir(&data_dir).unwrap();
        let config = dir.path().join("samples.txt");
        let lines = vec![
            "Lane #\tSample Name\tLib Conc (pM)\tIndex #".to_string(),
            "9\tS1\t14\t1".to_string(),
        ];
        Io::default().write_lines(&config, &lines).unwrap();

        let output = dir.path().join("report.csv");
        assert!(run(test_opts(data_dir, config, output)).is_err());
    }
}
