//! Heuristics for the inconsistent per-band archive file names.
//!
//! Names are underscore separated tokens, e.g. `HS_H09_20230615_0310_B03_FLDK_R10_S0110.DAT.bz2`:
//! product prefix, sensor id, date (`YYYYMMDD`), time (`HHMM`), band token and a full-disk
//! marker. Older and mirrored archives deviate from this layout in where the band id shows up,
//! which is why band extraction runs through a list of independent strategies.

use crate::{band::BandId, time_window::TimePoint};
use chrono::naive::NaiveDateTime;

pub const ARCHIVE_SUFFIX: &str = ".DAT.bz2";
pub const COMPRESSION_SUFFIX: &str = ".bz2";
pub const FULL_DISK_MARKER: &str = "FLDK";

const MIN_TOKENS: usize = 5;

pub type BandStrategy = fn(&str, &[&str]) -> Option<BandId>;

/// Band extraction strategies in priority order. The first one returning a band wins.
///
/// 1. `band-token`: a token of the form `B<digits>`
/// 2. `marker-ci-dot-number`: a token containing `.fldk.` (any case) whose last dot segment is
///    a number
/// 3. `marker-dot-segment`: a token containing `FLDK` whose last dot segment is a number or a
///    `B<digits>` token
/// 4. `after-marker`: the dot segment directly following `FLDK.` anywhere in the name
pub const BAND_STRATEGIES: [(&str, BandStrategy); 4] = [
    ("band-token", band_from_band_token),
    ("marker-ci-dot-number", band_from_marker_ci),
    ("marker-dot-segment", band_from_marker_segment),
    ("after-marker", band_from_after_marker),
];

/// Date and time tokens as found in a file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTimestamp {
    pub date: String,
    pub time: String,
}

impl FileTimestamp {
    pub fn compact(&self) -> String {
        format!("{}{}", self.date, self.time)
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.compact(), "%Y%m%d%H%M").ok()
    }

    /// Full date+time match, or failing that a match of the minute field alone.
    pub fn matches(&self, tp: &TimePoint) -> bool {
        if self.compact() == tp.compact() {
            return true;
        }

        let minute = self.time.get(self.time.len().saturating_sub(2)..);
        minute == Some(tp.minute().as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    /// sensor id token, e.g. `H09`
    pub sensor: String,
    pub band: BandId,
    pub timestamp: FileTimestamp,
    /// which entry of [`BAND_STRATEGIES`] produced the band
    pub strategy: &'static str,
}

/// Suffix and full-disk marker check.
pub fn is_admissible(fname: &str) -> bool {
    fname.ends_with(ARCHIVE_SUFFIX) && fname.contains(FULL_DISK_MARKER)
}

/// Parse band and timestamp out of an archive file name, `None` if the name is not admissible
/// or no band strategy succeeds.
pub fn parse_archive_name(fname: &str) -> Option<ParsedName> {
    if !is_admissible(fname) {
        return None;
    }

    let tokens: Vec<&str> = fname.split('_').collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let (strategy, band) = BAND_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(fname, &tokens).map(|band| (*name, band)))?;

    let timestamp = FileTimestamp {
        date: tokens[2].to_owned(),
        time: tokens[3].to_owned(),
    };

    Some(ParsedName {
        sensor: tokens[1].to_owned(),
        band,
        timestamp,
        strategy,
    })
}

/// Output name of a decompressed archive.
pub fn decompressed_name(fname: &str) -> &str {
    fname.strip_suffix(COMPRESSION_SUFFIX).unwrap_or(fname)
}

fn b_digits(segment: &str) -> Option<BandId> {
    segment.strip_prefix('B').and_then(BandId::from_digits)
}

// only tokens with at least one dot have a final dot segment
fn last_dot_segment(token: &str) -> Option<&str> {
    token.rsplit_once('.').map(|(_, last)| last)
}

fn band_from_band_token(_fname: &str, tokens: &[&str]) -> Option<BandId> {
    tokens.iter().find_map(|token| b_digits(token))
}

fn band_from_marker_ci(_fname: &str, tokens: &[&str]) -> Option<BandId> {
    let marker = format!(".{}.", FULL_DISK_MARKER.to_lowercase());
    tokens
        .iter()
        .filter(|token| token.to_lowercase().contains(&marker))
        .find_map(|token| last_dot_segment(token).and_then(BandId::from_digits))
}

fn band_from_marker_segment(_fname: &str, tokens: &[&str]) -> Option<BandId> {
    tokens
        .iter()
        .filter(|token| token.contains(FULL_DISK_MARKER))
        .find_map(|token| {
            let last = last_dot_segment(token)?;
            BandId::from_digits(last).or_else(|| b_digits(last))
        })
}

fn band_from_after_marker(fname: &str, _tokens: &[&str]) -> Option<BandId> {
    let marker = format!("{}.", FULL_DISK_MARKER);
    let (_, rest) = fname.split_once(&marker)?;
    rest.split('.').next().and_then(BandId::from_digits)
}
