use std::path::{Path, PathBuf};

use crate::{
    band::BandSet,
    cancel::CancelContext,
    composite::CompositeGenerator,
    config::ArchiveConfig,
    decompress::{DecompressionPool, DecompressionResult},
    error::{HimawariArchError, Result},
    remote::RemoteSession,
    satellite::Satellite,
    scanner::RemoteSlotScanner,
    slots::{LocalSlotScanner, SlotKey, SlotMap, SlotSelection},
    stager::{DownloadReport, DownloadStager},
    time_window::{generate, TimePoint, DEFAULT_INTERVAL_MINUTES},
};

/// The acquisition pipeline over one remote session.
///
/// Stages run strictly one after the other: all downloads of a window finish before local
/// files are grouped, and a slot is fully decompressed before the next one starts.
pub struct Archive<R: RemoteSession> {
    remote: R,
    interval_minutes: i64,
    scanner: RemoteSlotScanner,
    stager: DownloadStager,
    local: LocalArchive,
    closed: bool,
}

/// The local half of the pipeline: grouping staged files and decompressing slots. It needs
/// no remote session.
pub struct LocalArchive {
    data_root: PathBuf,
    ctx: CancelContext,
    sat: Satellite,
    decompressed_dir: PathBuf,
    pool: DecompressionPool,
}

/// Per-slot outcome of [`LocalArchive::process`].
#[derive(Debug)]
pub struct SlotReport {
    pub slot: SlotKey,
    pub decompressed: DecompressionResult,
    pub composite: Option<Result<PathBuf>>,
}

impl<R: RemoteSession> Archive<R> {
    pub fn connect<P>(root_path: P, remote: R) -> Self
    where
        P: Into<PathBuf>,
    {
        let root = root_path.into();
        log::info!("Connected to archive at: {:?}", &root);

        Self {
            remote,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            scanner: RemoteSlotScanner::default(),
            stager: DownloadStager::new(root.clone()),
            local: LocalArchive::new(root),
            closed: false,
        }
    }

    pub fn from_config(config: &ArchiveConfig, remote: R) -> Self {
        let mut archive = Self::connect(&config.data_dir, remote)
            .with_interval_minutes(config.interval_minutes)
            .with_remote_root(&config.remote_root);
        archive.local = LocalArchive::from_config(config);
        archive
    }

    pub fn with_cancel_context(mut self, ctx: CancelContext) -> Self {
        self.local.ctx = ctx;
        self
    }

    pub fn with_satellite(mut self, sat: Satellite) -> Self {
        self.local.sat = sat;
        self
    }

    pub fn with_interval_minutes(mut self, interval_minutes: i64) -> Self {
        self.interval_minutes = interval_minutes;
        self
    }

    pub fn with_remote_root(mut self, remote_root: &str) -> Self {
        self.scanner = RemoteSlotScanner::new(remote_root);
        self
    }

    pub fn with_decompressed_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.local.decompressed_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.local.pool = DecompressionPool::new(max_workers);
        self
    }

    pub fn cancel_context(&self) -> &CancelContext {
        &self.local.ctx
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn local(&self) -> &LocalArchive {
        &self.local
    }

    /// Download every requested band file for the scans between `start` and `end`.
    pub fn retrieve(
        &self,
        start: TimePoint,
        end: TimePoint,
        bands: &BandSet,
    ) -> Result<DownloadReport> {
        let start = self.validate_start(start);
        let time_points = generate(start, end, self.interval_minutes);

        if time_points.is_empty() {
            log::warn!("No time points provided for download.");
            return Ok(DownloadReport::default());
        }

        log::info!(
            "Starting download process for {} time points...",
            time_points.len()
        );

        let ctx = &self.local.ctx;
        let found = self
            .scanner
            .scan_all(&self.remote, &time_points, bands, ctx)?;

        self.stager.stage_all(&self.remote, &found, ctx)
    }

    /// Release the remote session. Also happens on drop.
    pub fn close(&mut self) {
        if !self.closed {
            self.remote.close();
            self.closed = true;
            log::info!("Connection closed.");
        }
    }

    fn validate_start(&self, start: TimePoint) -> TimePoint {
        let earliest = self.local.sat.earliest_operational_date();
        if start.datetime() < earliest {
            log::warn!(
                "valid start time was adjusted to start - {}",
                TimePoint::new(earliest)
            );
            TimePoint::new(earliest)
        } else {
            start
        }
    }
}

impl<R: RemoteSession> Drop for Archive<R> {
    fn drop(&mut self) {
        self.close();
    }
}

impl LocalArchive {
    pub fn new<P: Into<PathBuf>>(data_root: P) -> Self {
        let data_root = data_root.into();
        let decompressed_dir = data_root.join("decompressed");

        LocalArchive {
            data_root,
            ctx: CancelContext::new(),
            sat: Satellite::default(),
            decompressed_dir,
            pool: DecompressionPool::with_host_parallelism(),
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        LocalArchive {
            data_root: config.data_dir.clone(),
            ctx: CancelContext::new(),
            sat: config.satellite,
            decompressed_dir: config.decompressed_dir.clone(),
            pool: DecompressionPool::new(config.max_workers),
        }
    }

    pub fn with_cancel_context(mut self, ctx: CancelContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_decompressed_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.decompressed_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.pool = DecompressionPool::new(max_workers);
        self
    }

    /// Staged archives grouped into scan slots, oldest first.
    pub fn slots(&self) -> SlotMap {
        LocalSlotScanner::new(self.sat).scan(&self.data_root)
    }

    pub fn decompress_slot(&self, files: &[PathBuf]) -> DecompressionResult {
        self.pool.run(files, &self.decompressed_dir)
    }

    /// Decompress the selected slots and feed each one to `generator`. Slot level failures
    /// are recorded in the returned reports.
    pub fn process(
        &self,
        selection: &SlotSelection,
        generator: Option<&dyn CompositeGenerator>,
        output_dir: &Path,
    ) -> Result<Vec<SlotReport>> {
        let slots = self.slots();
        if slots.is_empty() {
            log::warn!("No data slots available for processing.");
            return Ok(vec![]);
        }

        let selected = selection.resolve(&slots)?;
        let mut reports = Vec::with_capacity(selected.len());

        for key in selected {
            if self.ctx.is_cancelled() {
                return Err(HimawariArchError::Interrupted);
            }

            log::info!("Processing slot: {}", key);
            let files = slots.get(&key).map(Vec::as_slice).unwrap_or_default();
            let decompressed = self.decompress_slot(files);

            let composite = generator.map(|generator| {
                let res = generator.generate(&key, &decompressed.successes(), output_dir);
                if let Err(err) = &res {
                    log::error!("Composite generation for {} failed: {}", key, err);
                }
                res
            });

            reports.push(SlotReport {
                slot: key,
                decompressed,
                composite,
            });
        }

        Ok(reports)
    }
}
