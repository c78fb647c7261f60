//! Match an observed barcode read against the barcodes registered on a lane, tolerating a
//! bounded number of read errors.
//!
//! The search is a best-effort minimal error count between the observed and expected
//! sequences using single-character look-ahead realignment, capped at the error budget.  It
//! is deliberately not a full edit-distance computation: only one character of look-ahead is
//! considered per mismatch, so some exotic multi-error patterns report a higher error count
//! than the true minimum.  That behavior is load-bearing for output compatibility and must
//! not be "fixed" into classical edit distance.

use std::cell::RefCell;

use cached::SizedCache;

use crate::sample_map::{LaneRegistry, SampleBarcodeMap};

thread_local! (
    /// The barcode cache used by the `CachedAlignmentMatcher`, keyed by (lane, barcode).
    static CACHE: RefCell<SizedCache<(usize, Vec<u8>), MatchResult>> =
    RefCell::new(SizedCache::with_size(100_000))
);

/// The outcome of matching one observed barcode against a lane's registry.
#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub enum MatchResult {
    /// The unique best candidate within the error budget.
    Match { plex_index: usize, errors: usize },
    /// No candidate within budget, or two or more candidates tied at the minimum.
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    pub fn is_no_match(&self) -> bool {
        !self.is_match()
    }

    /// The matched plex index, if any.
    pub fn plex_index(&self) -> Option<usize> {
        match self {
            Self::Match { plex_index, .. } => Some(*plex_index),
            Self::NoMatch => None,
        }
    }
}

/// The base trait for all matching algorithms.
pub trait Matcher {
    fn find(&self, lane: usize, barcode: &[u8]) -> MatchResult;
}

/// Matches with the bounded recursive alignment search.
pub struct AlignmentMatcher<'a> {
    map: &'a SampleBarcodeMap,
    max_errors: usize,
}

impl<'a> AlignmentMatcher<'a> {
    pub fn new(map: &'a SampleBarcodeMap, max_errors: usize) -> Self {
        Self { map, max_errors }
    }
}

impl<'a> Matcher for AlignmentMatcher<'a> {
    fn find(&self, lane: usize, barcode: &[u8]) -> MatchResult {
        match self.map.lane(lane) {
            Some(registry) => find_in_registry(registry, barcode, self.max_errors),
            None => MatchResult::NoMatch,
        }
    }
}

/// An [`AlignmentMatcher`] with a thread-local cache of previously matched barcodes.
///
/// Observed barcodes repeat heavily within a run, so memoizing (lane, barcode) pairs skips
/// the alignment search for all but the first occurrence.
pub struct CachedAlignmentMatcher<'a> {
    inner: AlignmentMatcher<'a>,
}

impl<'a> CachedAlignmentMatcher<'a> {
    pub fn new(map: &'a SampleBarcodeMap, max_errors: usize) -> Self {
        Self { inner: AlignmentMatcher::new(map, max_errors) }
    }
}

impl<'a> Matcher for CachedAlignmentMatcher<'a> {
    fn find(&self, lane: usize, barcode: &[u8]) -> MatchResult {
        CACHE.with(|cache| {
            let c = &mut *cache.borrow_mut();
            let key = (lane, barcode.to_vec());
            if let Some(res) = cached::Cached::cache_get(c, &key) {
                return res.clone();
            }
            let result = self.inner.find(lane, barcode);
            cached::Cached::cache_set(c, key, result.clone());
            result
        })
    }
}

/// Find the unique best candidate for an observed barcode within a lane's registry.
///
/// An exact match short-circuits at zero errors.  Otherwise every candidate is scored with
/// [`best_alignment`]; the unique candidate at the minimum error count wins, and a tie of
/// two or more always yields [`MatchResult::NoMatch`], never an arbitrary pick.
pub fn find_in_registry(
    registry: &LaneRegistry,
    barcode: &[u8],
    max_errors: usize,
) -> MatchResult {
    if let Some(plex_index) = registry.plex_of(barcode) {
        return MatchResult::Match { plex_index, errors: 0 };
    }

    let mut best_plex = None;
    let mut min_errors = max_errors + 1;
    let mut num_at_min = 0;
    for sample in registry.samples() {
        let errors = best_alignment(barcode, &sample.barcode, 0, max_errors);
        if errors <= max_errors {
            if errors < min_errors {
                min_errors = errors;
                best_plex = Some(sample.plex_index);
                num_at_min = 1;
            } else if errors == min_errors {
                num_at_min += 1;
            }
        }
    }

    match best_plex {
        Some(plex_index) if num_at_min == 1 => {
            MatchResult::Match { plex_index, errors: min_errors }
        }
        _ => MatchResult::NoMatch,
    }
}

/// Best-effort minimal error count between an observed sequence `s` and a candidate `t`.
///
/// Walks both sequences together; a mismatch costs one error and triggers at most one
/// character of look-ahead realignment, trying in order an extra character in `s` (insertion)
/// then a missing character in `s` (deletion).  A recursive branch whose result equals the
/// error count at the branch point means the remainder aligned perfectly and is accepted
/// immediately.  The outer walk always advances both positions, so plain substitution is
/// scored alongside the realignment branches.  Recursion depth is bounded by `max_errors`.
///
/// Returns `max_errors + 1` when the budget is exceeded.
pub fn best_alignment(s: &[u8], t: &[u8], err: usize, max_errors: usize) -> usize {
    let mut err = err;
    let mut min_err = max_errors + 1;
    let mut si = 0;
    let mut ti = 0;

    while si < s.len() && ti < t.len() {
        if s[si] != t[ti] {
            err += 1;
            if err > max_errors {
                break;
            } else if si + 1 < s.len() && t[ti] == s[si + 1] {
                // Extra character in s: advance s, hold t.
                let e = best_alignment(&s[si + 1..], &t[ti..], err, max_errors);
                if e == err {
                    return e;
                } else if e < min_err {
                    min_err = e;
                }
            } else if ti + 1 < t.len() && t[ti + 1] == s[si] {
                // Missing character in s: advance t, hold s.
                let e = best_alignment(&s[si..], &t[ti + 1..], err, max_errors);
                if e == err {
                    return e;
                } else if e < min_err {
                    min_err = e;
                }
            }
        }

        si += 1;
        ti += 1;
    }

    if err < min_err {
        min_err = err;
    }

    min_err
}
