//! Rendering of final counts into report tables.
//!
//! A lane appears in the report only if it received at least one counted read.  For an
//! active lane every configured sample is reported, in plex order, including samples that
//! received zero reads.  All views here are pure functions of the final aggregator state
//! and can be rendered repeatedly.

use itertools::Itertools;
use serde::Serialize;

use crate::counts::{LaneStats, ReadCounts, ReferenceIndex};
use crate::sample_map::SampleBarcodeMap;

/// One per-sample total, serialized as a row of the per-sample TSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleCountsRow {
    /// The 1-based lane the sample was configured on.
    pub lane: usize,
    /// The sample name from the configuration table.
    pub sample: String,
    /// The sample's barcode sequence.
    pub barcode: String,
    /// Total reads assigned to the sample across all references.
    pub reads: u64,
}

/// Renders the aggregator's contents into the report tables.
pub struct ReportBuilder<'a> {
    map: &'a SampleBarcodeMap,
    references: &'a ReferenceIndex,
    counts: &'a ReadCounts,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        map: &'a SampleBarcodeMap,
        references: &'a ReferenceIndex,
        counts: &'a ReadCounts,
    ) -> Self {
        Self { map, references, counts }
    }

    /// The 0-based lanes that received at least one counted read, in lane order.
    pub fn active_lanes(&self) -> Vec<usize> {
        (0..self.counts.lane_count()).filter(|&lane| self.counts.lane_total(lane) > 0).collect()
    }

    /// The per-lane statistics summary: one row per statistic, one column per active lane.
    ///
    /// The first row is the header (`Lane#N` per active lane).
    pub fn summary(&self) -> Vec<Vec<String>> {
        let lanes = self.active_lanes();
        let stats = self.counts.stats();

        let row = |label: &str, value: fn(&LaneStats) -> u64| -> Vec<String> {
            std::iter::once(label.to_string())
                .chain(lanes.iter().map(|&lane| value(&stats[lane]).to_string()))
                .collect()
        };

        vec![
            std::iter::once(String::new())
                .chain(lanes.iter().map(|lane| format!("Lane#{}", lane + 1)))
                .collect(),
            row("Total lines", |s| s.total_lines),
            row("Malformed lines", |s| s.malformed_lines),
            row("Unmatched barcodes", |s| s.unmatched_barcodes),
        ]
    }

    /// The reference-by-sample count matrix.
    ///
    /// Two header rows (lane labels, then sample names), then one row per reference in
    /// discovery order.  Columns are grouped by active lane with samples in plex order.
    pub fn matrix(&self) -> Vec<Vec<String>> {
        let columns = self.matrix_columns();

        let mut rows = Vec::with_capacity(self.references.len() + 2);
        rows.push(
            std::iter::once(String::new())
                .chain(columns.iter().map(|&(lane, _)| format!("Lane#{}", lane + 1)))
                .collect(),
        );
        rows.push(
            std::iter::once("Reference".to_string())
                .chain(columns.iter().map(|&(lane, plex)| {
                    self.map.lane(lane).map_or_else(String::new, |r| r.samples()[plex].name.clone())
                }))
                .collect(),
        );
        for (reference_index, name) in self.references.names().iter().enumerate() {
            rows.push(
                std::iter::once(name.clone())
                    .chain(
                        columns
                            .iter()
                            .map(|&(lane, plex)| {
                                self.counts.count(reference_index, lane, plex).to_string()
                            }),
                    )
                    .collect(),
            );
        }
        rows
    }

    /// Per-sample totals for every configured sample on an active lane.
    pub fn per_sample_counts(&self) -> Vec<SampleCountsRow> {
        self.active_lanes()
            .into_iter()
            .filter_map(|lane| self.map.lane(lane).map(|registry| (lane, registry)))
            .flat_map(|(lane, registry)| {
                registry.samples().iter().map(move |sample| {
                    let reads = (0..self.references.len())
                        .map(|r| self.counts.count(r, lane, sample.plex_index))
                        .sum();
                    SampleCountsRow {
                        lane: lane + 1,
                        sample: sample.name.clone(),
                        barcode: sample.barcode.to_string(),
                        reads,
                    }
                })
            })
            .collect()
    }

    /// The matrix column order: (lane, plex) grouped by active lane, samples in plex order.
    fn matrix_columns(&self) -> Vec<(usize, usize)> {
        self.active_lanes()
            .into_iter()
            .flat_map(|lane| {
                let num_samples = self.map.lane(lane).map_or(0, |r| r.len());
                (0..num_samples).map(move |plex| (lane, plex))
            })
            .collect_vec()
    }
}

#[cfg(test)]
mod test {
    use super::ReportBuilder;
    use crate::barcodes::BarcodeCatalog;
    use crate::counts::{ReadCounts, ReferenceIndex};
    use crate::matcher::AlignmentMatcher;
    use crate::sample_map::SampleBarcodeMap;

    /// Lane 1: S1 (ATCACG), S2 (CGATGT); lane 3: S3 (TTAGGC); lanes 2 and 4-8 empty.
    fn test_map() -> SampleBarcodeMap {
        let lines = vec![
            "Lane #\tSample Name\tLib Conc (pM)\tIndex #".to_string(),
            "1\t\"S1,S2\"\t14\t\"1,2\"".to_string(),
            "3\tS3\t14\t3".to_string(),
        ];
        SampleBarcodeMap::from_lines(&lines, &BarcodeCatalog::default(), 8).unwrap()
    }

    /// chr2 first, then chr1, so discovery order differs from name order; reads only on
    /// lane 1 (both samples) and lane 3.
    fn populated() -> (SampleBarcodeMap, ReferenceIndex, ReadCounts) {
        let map = test_map();
        let mut references = ReferenceIndex::new();
        let mut counts = ReadCounts::new(&map, 25);
        {
            let matcher = AlignmentMatcher::new(&map, 2);
            let chr2 = references.resolve("chr2");
            let chr1 = references.resolve("chr1");

            for _ in 0..3 {
                counts.record_line(0);
                counts.record_read(&matcher, chr2, 0, b"ATCACG").unwrap();
            }
            counts.record_line(0);
            counts.record_read(&matcher, chr1, 0, b"CGATGT").unwrap();
            counts.record_line(2);
            counts.record_read(&matcher, chr1, 2, b"TTAGGC").unwrap();
            // A line on lane 2 that never produces a counted read.
            counts.record_line(1);
            counts.record_malformed(1);
        }
        (map, references, counts)
    }

    #[test]
    fn test_active_lanes_require_a_counted_read() {
        let (map, references, counts) = populated();
        let report = ReportBuilder::new(&map, &references, &counts);
        // Lane 2 saw lines but no counted read, so it stays out of the report.
        assert_eq!(report.active_lanes(), vec![0, 2]);
    }

    #[test]
    fn test_summary_covers_active_lanes_only() {
        let (map, references, counts) = populated();
        let report = ReportBuilder::new(&map, &references, &counts);

        let summary = report.summary();
        assert_eq!(summary[0], vec!["", "Lane#1", "Lane#3"]);
        assert_eq!(summary[1], vec!["Total lines", "4", "1"]);
        assert_eq!(summary[2], vec!["Malformed lines", "0", "0"]);
        assert_eq!(summary[3], vec!["Unmatched barcodes", "0", "0"]);
    }

    #[test]
    fn test_matrix_rows_follow_discovery_order() {
        let (map, references, counts) = populated();
        let report = ReportBuilder::new(&map, &references, &counts);

        let matrix = report.matrix();
        assert_eq!(matrix[0], vec!["", "Lane#1", "Lane#1", "Lane#3"]);
        assert_eq!(matrix[1], vec!["Reference", "S1", "S2", "S3"]);
        // chr2 was seen first, so it is the first data row.
        assert_eq!(matrix[2], vec!["chr2", "3", "0", "0"]);
        assert_eq!(matrix[3], vec!["chr1", "0", "1", "1"]);
    }

    #[test]
    fn test_zero_read_sample_on_active_lane_is_reported() {
        let map = test_map();
        let mut references = ReferenceIndex::new();
        let mut counts = ReadCounts::new(&map, 25);
        let matcher = AlignmentMatcher::new(&map, 2);
        let chr1 = references.resolve("chr1");
        counts.record_line(0);
        counts.record_read(&matcher, chr1, 0, b"ATCACG").unwrap();

        let report = ReportBuilder::new(&map, &references, &counts);
        let matrix = report.matrix();
        // S2 received nothing but lane 1 is active, so its column is present.
        assert_eq!(matrix[1], vec!["Reference", "S1", "S2"]);
        assert_eq!(matrix[2], vec!["chr1", "1", "0"]);
    }

    #[test]
    fn test_per_sample_counts() {
        let (map, references, counts) = populated();
        let report = ReportBuilder::new(&map, &references, &counts);

        let rows = report.per_sample_counts();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].lane, 1);
        assert_eq!(rows[0].sample, "S1");
        assert_eq!(rows[0].barcode, "ATCACG");
        assert_eq!(rows[0].reads, 3);
        assert_eq!(rows[1].sample, "S2");
        assert_eq!(rows[1].reads, 1);
        assert_eq!(rows[2].lane, 3);
        assert_eq!(rows[2].reads, 1);
    }

    #[test]
    fn test_empty_run_produces_header_only_tables() {
        let map = test_map();
        let references = ReferenceIndex::new();
        let counts = ReadCounts::new(&map, 25);

        let report = ReportBuilder::new(&map, &references, &counts);
        assert!(report.active_lanes().is_empty());
        assert_eq!(report.summary()[0], vec![""]);
        assert_eq!(report.matrix().len(), 2);
        assert!(report.per_sample_counts().is_empty());
    }
}
