use std::{
    fs::{self, create_dir_all},
    path::{Path, PathBuf},
};

use crate::{
    cancel::CancelContext,
    error::{HimawariArchError, Result},
    remote::RemoteSession,
    scanner::RemoteFileDescriptor,
    time_window::TimePoint,
};
use chrono::{Datelike, Timelike};

pub const TEMP_SUFFIX: &str = ".part";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Clone, Debug)]
pub struct DownloadTask {
    pub remote_path: String,
    pub final_path: PathBuf,
    pub temp_path: PathBuf,
    pub state: TaskState,
}

impl DownloadTask {
    pub fn new(remote_path: String, final_path: PathBuf) -> Self {
        let mut temp_name = final_path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);

        DownloadTask {
            remote_path,
            final_path,
            temp_path: PathBuf::from(temp_name),
            state: TaskState::Pending,
        }
    }
}

#[derive(Debug)]
pub enum StageOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
    Failed(HimawariArchError),
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    /// every staged task with its final state, in staging order
    pub tasks: Vec<DownloadTask>,
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(String, HimawariArchError)>,
}

impl DownloadReport {
    /// every local file that is in place after the run
    pub fn available(&self) -> impl Iterator<Item = &PathBuf> {
        self.downloaded.iter().chain(self.skipped.iter())
    }
}

/// Stages remote files under `<root>/<YYYYMMDD>/<HH>/` with a temp-then-rename protocol.
pub struct DownloadStager {
    root: PathBuf,
}

impl DownloadStager {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DownloadStager { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn local_dir(&self, tp: &TimePoint) -> PathBuf {
        let dt = tp.datetime();
        let mut pth = self.root.clone();
        pth.push(format!("{:04}{:02}{:02}", dt.year(), dt.month(), dt.day()));
        pth.push(format!("{:02}", dt.hour()));
        pth
    }

    pub fn task_for(&self, desc: &RemoteFileDescriptor) -> DownloadTask {
        let final_path = self.local_dir(&desc.time_point).join(&desc.filename);
        DownloadTask::new(desc.remote_path(), final_path)
    }

    /// Stage a single file. Failures are returned as [`StageOutcome::Failed`], never as panics
    /// or early returns, so the caller can move on to the next file. The returned task carries
    /// its final state.
    pub fn stage<R: RemoteSession + ?Sized>(
        &self,
        remote: &R,
        desc: &RemoteFileDescriptor,
        ctx: &CancelContext,
    ) -> (DownloadTask, StageOutcome) {
        let mut task = self.task_for(desc);

        if is_non_empty_file(&task.final_path) {
            log::info!(
                "File already exists locally: {:?}. Skipping.",
                task.final_path
            );
            task.state = TaskState::Completed;
            let outcome = StageOutcome::AlreadyPresent(task.final_path.clone());
            return (task, outcome);
        }

        if let Some(dir) = task.final_path.parent() {
            if let Err(err) = create_dir_all(dir) {
                log::error!("Error creating local directory {:?}: {}", dir, err);
                task.state = TaskState::Failed;
                return (task, StageOutcome::Failed(err.into()));
            }
        }

        if task.temp_path.exists() {
            log::warn!(
                "Partial file exists: {:?}. Overwriting.",
                task.temp_path
            );
        }

        log::info!("Downloading {} to {:?}", task.remote_path, task.temp_path);
        task.state = TaskState::InProgress;

        let guard = ctx.guard(task.temp_path.clone());
        let res = remote
            .get(&task.remote_path, guard.path())
            .map_err(HimawariArchError::from)
            .and_then(|()| {
                // cancel() already removed the temp file, there is nothing to commit
                if ctx.is_cancelled() {
                    Err(HimawariArchError::Interrupted)
                } else {
                    guard.commit(&task.final_path).map_err(HimawariArchError::from)
                }
            });

        let outcome = match res {
            Ok(()) => {
                task.state = TaskState::Completed;
                log::info!("Successfully downloaded and saved: {:?}", task.final_path);
                StageOutcome::Downloaded(task.final_path.clone())
            }
            Err(err) => {
                // the guard was consumed or dropped, the temp file is gone
                task.state = TaskState::Failed;
                if ctx.is_cancelled() {
                    log::warn!("Download of {} interrupted.", task.remote_path);
                    StageOutcome::Failed(HimawariArchError::Interrupted)
                } else {
                    log::error!("Failed to download {}: {}", task.remote_path, err);
                    StageOutcome::Failed(err)
                }
            }
        };

        (task, outcome)
    }

    /// Stage files one after the other over the single `remote` session.
    ///
    /// Per-file failures are recorded in the report. Fatal ones, like a lost connection or an
    /// interrupt, end the batch.
    pub fn stage_all<R: RemoteSession + ?Sized>(
        &self,
        remote: &R,
        descs: &[RemoteFileDescriptor],
        ctx: &CancelContext,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();

        for desc in descs {
            if ctx.is_cancelled() {
                log::warn!("Download interrupted.");
                return Err(HimawariArchError::Interrupted);
            }

            let (task, outcome) = self.stage(remote, desc, ctx);
            match outcome {
                StageOutcome::Downloaded(pth) => report.downloaded.push(pth),
                StageOutcome::AlreadyPresent(pth) => report.skipped.push(pth),
                StageOutcome::Failed(err) if err.is_fatal() => return Err(err),
                StageOutcome::Failed(err) => report.failed.push((desc.remote_path(), err)),
            }
            report.tasks.push(task);
        }

        if ctx.is_cancelled() {
            return Err(HimawariArchError::Interrupted);
        }

        log::info!(
            "Download process finished: {} downloaded, {} already present, {} failed.",
            report.downloaded.len(),
            report.skipped.len(),
            report.failed.len()
        );

        Ok(report)
    }
}

pub(crate) fn is_non_empty_file(pth: &Path) -> bool {
    fs::metadata(pth)
        .map(|md| md.is_file() && md.len() > 0)
        .unwrap_or(false)
}
