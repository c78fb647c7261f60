//! Parsing of aligned sequencing read lines.
//!
//! Each line carries 15 tab-separated fields:
//!
//! ```text
//! 1-8:  SequencerName  flowCell  lane  tile  x  y  tag  read
//! 9-15: sequence  quality  ref  pos  direction  length  mapQuality
//! ```
//!
//! Field 7 is `0` when the run is not multiplexed and field 11 is empty when the read did
//! not align.  Only the lane, tag and reference fields drive counting; the rest are carried
//! through untouched.

use bstr::BString;

/// The number of tab-separated fields in a well-formed read line.
pub const NUM_DATA_FIELDS: usize = 15;

/// One parsed sequencing read record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    /// The 0-based lane the read was sequenced on.
    pub lane: usize,
    /// The observed multiplex tag read.
    pub barcode: BString,
    /// The name of the reference sequence the read aligned to, empty if unaligned.
    pub reference: String,
    /// The read bases.
    pub sequence: BString,
    /// The base quality string, uninterpreted.
    pub quality: BString,
    /// The alignment position, carried through as text.
    pub position: String,
    /// The alignment direction.
    pub direction: String,
    /// The alignment descriptor.
    pub alignment: String,
    /// The mapping quality; 0 when absent or unparseable.
    pub map_quality: i32,
}

/// Parse one read line into a [`ReadRecord`].
///
/// Returns `None` for a malformed line: wrong field count, or a lane number that is not a
/// valid 1-based lane for this run.
pub fn parse_read_line(line: &str, num_lanes: usize) -> Option<ReadRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != NUM_DATA_FIELDS {
        return None;
    }

    let lane = parse_lane_field(fields[2], num_lanes)?;

    Some(ReadRecord {
        lane,
        barcode: BString::from(fields[6]),
        sequence: BString::from(fields[8]),
        quality: BString::from(fields[9]),
        reference: fields[10].to_string(),
        position: fields[11].to_string(),
        direction: fields[12].to_string(),
        alignment: fields[13].to_string(),
        map_quality: fields[14].parse::<i32>().unwrap_or(0),
    })
}

/// Best-effort extraction of the lane from a line that may be malformed.
///
/// Used to attribute malformed-line statistics to a lane when the full record cannot be
/// parsed; requires only that the lane field itself is present and in range.
pub fn extract_lane(line: &str, num_lanes: usize) -> Option<usize> {
    let field = line.split('\t').nth(2)?;
    parse_lane_field(field, num_lanes)
}

fn parse_lane_field(raw: &str, num_lanes: usize) -> Option<usize> {
    match raw.parse::<usize>() {
        Ok(lane) if (1..=num_lanes).contains(&lane) => Some(lane - 1),
        _ => None,
    }
}
