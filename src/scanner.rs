use crate::{
    band::{BandId, BandSet},
    cancel::CancelContext,
    error::{HimawariArchError, Result},
    filename::parse_archive_name,
    remote::{RemoteError, RemoteSession},
    time_window::TimePoint,
};
use chrono::naive::NaiveDateTime;

pub const DEFAULT_REMOTE_ROOT: &str = "/jma/hsd";

/// A remote archive file that passed admission, band and time checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFileDescriptor {
    pub filename: String,
    pub remote_dir: String,
    pub band: BandId,
    pub timestamp: NaiveDateTime,
    pub time_point: TimePoint,
}

impl RemoteFileDescriptor {
    pub fn remote_path(&self) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), self.filename)
    }
}

/// Outcome of scanning one time point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Matched(Vec<RemoteFileDescriptor>),
    DirectoryNotFound,
    ListingFailed(String),
}

pub struct RemoteSlotScanner {
    remote_root: String,
}

impl RemoteSlotScanner {
    pub fn new<S: Into<String>>(remote_root: S) -> Self {
        RemoteSlotScanner {
            remote_root: remote_root.into(),
        }
    }

    /// `<root>/<YYYYMM>/<DD>/<HH>/`
    pub fn remote_dir(&self, tp: &TimePoint) -> String {
        format!(
            "{}/{}/{}/{}/",
            self.remote_root.trim_end_matches('/'),
            tp.year_month(),
            tp.day(),
            tp.hour()
        )
    }

    pub fn scan<R: RemoteSession + ?Sized>(
        &self,
        remote: &R,
        tp: &TimePoint,
        bands: &BandSet,
    ) -> ScanOutcome {
        let dir = self.remote_dir(tp);
        log::info!("Checking remote directory: {} for time {}", dir, tp);

        let fnames = match remote.list(&dir) {
            Ok(fnames) => fnames,
            Err(RemoteError::NotFound(_)) => {
                log::warn!("Remote directory not found: {}. Skipping this time slot.", dir);
                return ScanOutcome::DirectoryNotFound;
            }
            Err(err) => {
                log::error!("Error listing directory {}: {}", dir, err);
                return ScanOutcome::ListingFailed(err.to_string());
            }
        };

        let matches: Vec<RemoteFileDescriptor> = fnames
            .iter()
            .filter_map(|fname| self.match_file(fname, &dir, tp, bands))
            .collect();

        if matches.is_empty() {
            log::info!(
                "No matching files found for {} in {} with target bands {}.",
                tp,
                dir,
                bands
            );
        }

        ScanOutcome::Matched(matches)
    }

    /// Scan every time point; soft failures only show up in the log. Stops before the next
    /// listing once `ctx` is cancelled.
    pub fn scan_all<R: RemoteSession + ?Sized>(
        &self,
        remote: &R,
        time_points: &[TimePoint],
        bands: &BandSet,
        ctx: &CancelContext,
    ) -> Result<Vec<RemoteFileDescriptor>> {
        let mut found = vec![];

        for tp in time_points {
            if ctx.is_cancelled() {
                log::warn!("Remote scan interrupted before {}.", tp);
                return Err(HimawariArchError::Interrupted);
            }

            if let ScanOutcome::Matched(matches) = self.scan(remote, tp, bands) {
                found.extend(matches);
            }
        }

        Ok(found)
    }

    fn match_file(
        &self,
        fname: &str,
        dir: &str,
        tp: &TimePoint,
        bands: &BandSet,
    ) -> Option<RemoteFileDescriptor> {
        let parsed = match parse_archive_name(fname) {
            Some(parsed) => parsed,
            None => {
                log::debug!("Rejected file name: {}", fname);
                return None;
            }
        };

        if !parsed.timestamp.matches(tp) {
            log::debug!("Timestamp mismatch for {} at {}", fname, tp);
            return None;
        }

        if !bands.contains(&parsed.band) {
            log::debug!("Band {} of {} not requested", parsed.band, fname);
            return None;
        }

        log::info!("Found matching file: {} (Band {})", fname, parsed.band);

        Some(RemoteFileDescriptor {
            filename: fname.to_owned(),
            remote_dir: dir.to_owned(),
            band: parsed.band,
            timestamp: parsed
                .timestamp
                .datetime()
                .unwrap_or_else(|| tp.datetime()),
            time_point: *tp,
        })
    }
}

impl Default for RemoteSlotScanner {
    fn default() -> Self {
        RemoteSlotScanner::new(DEFAULT_REMOTE_ROOT)
    }
}
