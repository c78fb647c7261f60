//! Aggregation of read counts per reference, lane and sample.
//!
//! [`ReferenceIndex`] assigns reference names dense indices in first-appearance order.
//! [`ReadCounts`] owns the three-level count table `counts[reference][lane][plex]` and the
//! per-lane [`LaneStats`].  Table capacity is fixed at construction from the catalog sizes
//! and the sample map; an index that would land outside the table is a fatal
//! [`CountError`], never a silent wrap.  Per-record conditions (malformed lines, unmatched
//! barcodes) are absorbed into the statistics and never interrupt processing.

use ahash::AHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::matcher::{MatchResult, Matcher};
use crate::sample_map::{LaneRegistry, SampleBarcodeMap};

/// The error raised when a resolved index would exceed the pre-allocated table capacity.
///
/// This signals a configuration/catalog-size mismatch with the actual data and stops the
/// run rather than corrupt counts.
#[derive(Error, Debug)]
pub enum CountError {
    #[error("Reference index {index} exceeds the table capacity of {capacity} references")]
    ReferenceCapacityExceeded { index: usize, capacity: usize },

    #[error("Lane {lane} exceeds the table capacity of {capacity} lanes")]
    LaneCapacityExceeded { lane: usize, capacity: usize },

    #[error("Plex index {plex} exceeds the {capacity} samples configured for lane {lane}")]
    PlexCapacityExceeded { plex: usize, lane: usize, capacity: usize },
}

/// A dynamic name-to-dense-index registry for reference sequence names.
///
/// Indices are assigned in first-appearance order across all input files, in
/// file-processing order.  Append-only; nothing is ever removed.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    names: Vec<String>,
    by_name: AHashMap<String, usize>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a reference name, assigning the next dense index at first sight.
    ///
    /// Idempotent for repeated names and monotonic across distinct names.
    pub fn resolve(&mut self, name: &str) -> usize {
        match self.by_name.get(name) {
            Some(&index) => index,
            None => {
                let index = self.by_name.len();
                self.by_name.insert(name.to_string(), index);
                self.names.push(name.to_string());
                index
            }
        }
    }

    /// The index previously assigned to a name, if any.  Never assigns.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// The number of distinct references seen.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The reference names in discovery order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Per-lane processing statistics.
///
/// Exact, monotonically increasing counters; never reset mid-run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaneStats {
    /// Total lines read for the lane.
    pub total_lines: u64,
    /// Lines that failed to parse (no data or incomplete data).
    pub malformed_lines: u64,
    /// Lines whose barcode had no unique best candidate within the error budget.
    pub unmatched_barcodes: u64,
}

impl LaneStats {
    /// The lines that parsed and matched a sample.
    pub fn matched(&self) -> u64 {
        self.total_lines - self.malformed_lines - self.unmatched_barcodes
    }
}

/// The sparse three-level read count table plus per-lane statistics.
#[derive(Debug)]
pub struct ReadCounts {
    /// counts[reference][lane][plex]; the inner dimension is jagged, sized per lane to the
    /// number of samples configured for that lane.
    counts: Vec<Vec<Vec<u64>>>,
    stats: Vec<LaneStats>,
}

impl ReadCounts {
    /// Allocate the table for a run: `max_references` reference slots, one lane slot per
    /// configured lane, and per-lane plex slots matching the sample map.
    pub fn new(map: &SampleBarcodeMap, max_references: usize) -> Self {
        let lane_sizes: Vec<usize> = map.lanes().iter().map(LaneRegistry::len).collect();
        let counts = (0..max_references)
            .map(|_| lane_sizes.iter().map(|&n| vec![0; n]).collect())
            .collect();
        Self { counts, stats: vec![LaneStats::default(); map.lane_count()] }
    }

    /// Count one input line against a lane.
    pub fn record_line(&mut self, lane: usize) {
        self.stats[lane].total_lines += 1;
    }

    /// Count one malformed (unparseable) line against a lane.
    pub fn record_malformed(&mut self, lane: usize) {
        self.stats[lane].malformed_lines += 1;
    }

    /// Count one parsed read: match its barcode against the lane's registry and either
    /// increment the matched cell or the lane's unmatched statistic.
    ///
    /// # Errors
    ///
    /// - [`CountError`] if the reference index, lane, or matched plex index falls outside
    ///   the table allocated at construction.
    pub fn record_read<M: Matcher>(
        &mut self,
        matcher: &M,
        reference_index: usize,
        lane: usize,
        barcode: &[u8],
    ) -> Result<(), CountError> {
        if reference_index >= self.counts.len() {
            return Err(CountError::ReferenceCapacityExceeded {
                index: reference_index,
                capacity: self.counts.len(),
            });
        }
        if lane >= self.stats.len() {
            return Err(CountError::LaneCapacityExceeded { lane, capacity: self.stats.len() });
        }

        match matcher.find(lane, barcode) {
            MatchResult::Match { plex_index, .. } => {
                let cells = &mut self.counts[reference_index][lane];
                if plex_index >= cells.len() {
                    return Err(CountError::PlexCapacityExceeded {
                        plex: plex_index,
                        lane,
                        capacity: cells.len(),
                    });
                }
                cells[plex_index] += 1;
            }
            MatchResult::NoMatch => {
                self.stats[lane].unmatched_barcodes += 1;
            }
        }
        Ok(())
    }

    /// The count cell for (reference, lane, plex); zero for anything outside the table.
    pub fn count(&self, reference_index: usize, lane: usize, plex_index: usize) -> u64 {
        self.counts
            .get(reference_index)
            .and_then(|by_lane| by_lane.get(lane))
            .and_then(|cells| cells.get(plex_index))
            .copied()
            .unwrap_or(0)
    }

    /// The sum of all count cells for a lane across references and samples.
    pub fn lane_total(&self, lane: usize) -> u64 {
        self.counts
            .iter()
            .filter_map(|by_lane| by_lane.get(lane))
            .flat_map(|cells| cells.iter())
            .sum()
    }

    /// The per-lane statistics, indexed by 0-based lane.
    pub fn stats(&self) -> &[LaneStats] {
        &self.stats
    }

    /// The maximum number of distinct references the table can hold.
    pub fn reference_capacity(&self) -> usize {
        self.counts.len()
    }

    /// The number of lane slots in the table.
    pub fn lane_count(&self) -> usize {
        self.stats.len()
    }
}
