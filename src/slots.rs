use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    band::BandId,
    error::{HimawariArchError, Result},
    filename::parse_archive_name,
    satellite::Satellite,
};
use chrono::naive::NaiveDateTime;
use walkdir::WalkDir;

/// One full-disk scan, identified by its `YYYYMMDD` date and `HHMM` time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub date: String,
    pub time: String,
}

impl SlotKey {
    pub fn new<S: Into<String>>(date: S, time: S) -> Self {
        SlotKey {
            date: date.into(),
            time: time.into(),
        }
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&format!("{}{}", self.date, self.time), "%Y%m%d%H%M").ok()
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            None => write!(f, "{}_{}", self.date, self.time),
        }
    }
}

/// Staged archive files grouped by scan, in ascending slot order.
pub type SlotMap = BTreeMap<SlotKey, Vec<PathBuf>>;

/// Slot and band of a staged archive file name. Uses the same admission rules as the remote
/// scan, so every file that was downloaded can be grouped.
pub fn match_archive_name(fname: &str, sat: Satellite) -> Option<(SlotKey, BandId)> {
    let parsed = parse_archive_name(fname)?;
    if parsed.sensor != sat.sensor_id() {
        return None;
    }

    let key = SlotKey::new(parsed.timestamp.date, parsed.timestamp.time);
    Some((key, parsed.band))
}

pub struct LocalSlotScanner {
    sat: Satellite,
}

impl LocalSlotScanner {
    pub fn new(sat: Satellite) -> Self {
        LocalSlotScanner { sat }
    }

    pub fn scan(&self, data_root: &Path) -> SlotMap {
        log::info!("Scanning {:?} for available data slots...", data_root);

        let mut slots = SlotMap::new();
        let mut file_count = 0;

        for entry_res in WalkDir::new(data_root) {
            let entry = match entry_res {
                Ok(entry) => entry,
                Err(err) => {
                    log::error!("Error reading directory entry: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let fname = entry.file_name().to_string_lossy().into_owned();
            match match_archive_name(&fname, self.sat) {
                Some((key, _band)) => {
                    slots.entry(key).or_default().push(entry.into_path());
                    file_count += 1;
                }
                None => log::debug!("File name does not match pattern, skipped: {}", fname),
            }
        }

        for paths in slots.values_mut() {
            paths.sort();
        }

        log::info!(
            "Scan finished. Found {} data files in {} slots.",
            file_count,
            slots.len()
        );

        slots
    }
}

/// Which of the listed slots to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotSelection {
    All,
    /// 1-based positions in the ordered slot list
    Indices(Vec<usize>),
}

impl SlotSelection {
    pub fn resolve(&self, slots: &SlotMap) -> Result<Vec<SlotKey>> {
        let keys: Vec<&SlotKey> = slots.keys().collect();

        match self {
            SlotSelection::All => Ok(keys.into_iter().cloned().collect()),
            SlotSelection::Indices(indices) => indices
                .iter()
                .map(|&i| {
                    i.checked_sub(1)
                        .and_then(|idx| keys.get(idx))
                        .map(|key| (*key).clone())
                        .ok_or_else(|| {
                            HimawariArchError::InvalidInput(format!(
                                "slot number {} is invalid, expected 1 to {}",
                                i,
                                keys.len()
                            ))
                        })
                })
                .collect(),
        }
    }
}

impl FromStr for SlotSelection {
    type Err = HimawariArchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SlotSelection::All);
        }
        if s.is_empty() {
            return Ok(SlotSelection::Indices(vec![]));
        }

        s.split(',')
            .map(|tok| {
                tok.trim().parse::<usize>().map_err(|_| {
                    HimawariArchError::InvalidInput(format!(
                        "invalid slot selection '{}', expected comma separated numbers or 'all'",
                        s
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()
            .map(SlotSelection::Indices)
    }
}
