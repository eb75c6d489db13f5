mod common;

use std::fs;

use common::{archive_name, tp, FakeRemote};
use himawari_arch::{
    BandSet, CancelContext, DownloadStager, HimawariArchError, RemoteFileDescriptor,
    RemoteSlotScanner, StageOutcome, TaskState,
};

const DIR: &str = "/jma/hsd/202306/15/03";

fn descriptors(remote: &FakeRemote) -> Vec<RemoteFileDescriptor> {
    RemoteSlotScanner::default()
        .scan_all(
            remote,
            &[tp("20230615 03:10")],
            &BandSet::default(),
            &CancelContext::new(),
        )
        .unwrap()
}

fn remote_with(bands: &[&str]) -> FakeRemote {
    let mut remote = FakeRemote::new();
    for band in bands {
        let fname = archive_name("20230615", "0310", band);
        remote.add_file(DIR, &fname, fname.as_bytes());
    }
    remote
}

#[test]
fn local_layout_is_namespaced_by_day_and_hour() {
    let stager = DownloadStager::new("/tmp/data");
    let dir = stager.local_dir(&tp("20230615 03:10"));
    assert!(dir.ends_with("20230615/03"));
}

#[test]
fn second_run_transfers_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let ctx = CancelContext::new();

    let first = remote_with(&["01", "03"]);
    let report = stager.stage_all(&first, &descriptors(&first), &ctx).unwrap();
    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(first.get_count(), 2);

    let second = remote_with(&["01", "03"]);
    let report = stager.stage_all(&second, &descriptors(&second), &ctx).unwrap();
    assert_eq!(second.get_count(), 0);
    assert_eq!(report.skipped.len(), 2);
    assert!(report.downloaded.is_empty());
}

#[test]
fn one_failed_transfer_does_not_abort_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let ctx = CancelContext::new();

    let mut remote = remote_with(&["01", "02", "03", "13"]);
    let failing = format!("{}/{}", DIR, archive_name("20230615", "0310", "02"));
    remote.fail_transfer(&failing);

    let descs = descriptors(&remote);
    assert_eq!(descs.len(), 4);

    let report = stager.stage_all(&remote, &descs, &ctx).unwrap();
    assert_eq!(report.downloaded.len(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, failing);
    assert!(matches!(report.failed[0].1, HimawariArchError::Transfer { .. }));

    let failed_task = stager.task_for(
        descs
            .iter()
            .find(|d| d.band.as_str() == "02")
            .unwrap(),
    );
    assert!(!failed_task.final_path.exists());
    assert!(!failed_task.temp_path.exists());

    for pth in &report.downloaded {
        assert!(fs::metadata(pth).unwrap().len() > 0);
    }
    assert_eq!(ctx.in_flight(), None);

    assert_eq!(report.tasks.len(), 4);
    for task in &report.tasks {
        let expected = if task.remote_path == failing {
            TaskState::Failed
        } else {
            TaskState::Completed
        };
        assert_eq!(task.state, expected, "{}", task.remote_path);
    }
}

#[test]
fn new_task_is_pending() {
    let stager = DownloadStager::new("/tmp/data");
    let remote = remote_with(&["01"]);
    let task = stager.task_for(&descriptors(&remote)[0]);

    assert_eq!(task.state, TaskState::Pending);
    assert!(task.temp_path.to_string_lossy().ends_with(".DAT.bz2.part"));
}

#[test]
fn skipped_file_counts_as_completed() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let remote = remote_with(&["13"]);
    let desc = descriptors(&remote).remove(0);

    let task = stager.task_for(&desc);
    fs::create_dir_all(task.final_path.parent().unwrap()).unwrap();
    fs::write(&task.final_path, b"already here").unwrap();

    let (staged, outcome) = stager.stage(&remote, &desc, &CancelContext::new());
    assert!(matches!(outcome, StageOutcome::AlreadyPresent(_)));
    assert_eq!(staged.state, TaskState::Completed);
    assert_eq!(remote.get_count(), 0);
}

#[test]
fn lost_connection_ends_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let ctx = CancelContext::new();

    let mut remote = remote_with(&["01", "02", "03"]);
    remote.drop_connection(&format!("{}/{}", DIR, archive_name("20230615", "0310", "02")));

    let res = stager.stage_all(&remote, &descriptors(&remote), &ctx);
    assert!(matches!(res, Err(HimawariArchError::Transport(_))));
    assert_eq!(remote.get_count(), 2);
    assert_eq!(ctx.in_flight(), None);
}

#[test]
fn cancel_during_transfer_is_reported_as_interrupt() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let ctx = CancelContext::new();

    let mut remote = remote_with(&["01", "03"]);
    let first = format!("{}/{}", DIR, archive_name("20230615", "0310", "01"));
    remote.cancel_during_get(&first, ctx.clone());

    let descs = descriptors(&remote);
    let task = stager.task_for(&descs[0]);
    assert_eq!(task.remote_path, first);

    let res = stager.stage_all(&remote, &descs, &ctx);
    assert!(matches!(res, Err(HimawariArchError::Interrupted)));
    assert_eq!(remote.get_count(), 1);
    assert!(!task.final_path.exists());
    assert!(!task.temp_path.exists());
    assert_eq!(ctx.in_flight(), None);
}

#[test]
fn stale_temp_file_is_overwritten() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let remote = remote_with(&["13"]);
    let desc = descriptors(&remote).remove(0);

    let task = stager.task_for(&desc);
    fs::create_dir_all(task.final_path.parent().unwrap()).unwrap();
    fs::write(&task.temp_path, b"left over from an earlier run").unwrap();

    match stager.stage(&remote, &desc, &CancelContext::new()) {
        (staged, StageOutcome::Downloaded(pth)) => {
            assert_eq!(pth, task.final_path);
            assert_eq!(staged.state, TaskState::Completed);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(!task.temp_path.exists());
    assert_eq!(fs::read(&task.final_path).unwrap(), desc.filename.as_bytes());
}

#[test]
fn empty_final_file_is_downloaded_again() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let remote = remote_with(&["07"]);
    let desc = descriptors(&remote).remove(0);

    let task = stager.task_for(&desc);
    fs::create_dir_all(task.final_path.parent().unwrap()).unwrap();
    fs::write(&task.final_path, b"").unwrap();

    let (_, outcome) = stager.stage(&remote, &desc, &CancelContext::new());
    assert!(matches!(outcome, StageOutcome::Downloaded(_)));
    assert_eq!(remote.get_count(), 1);
}

#[test]
fn cancelled_context_stops_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let stager = DownloadStager::new(tmp.path());
    let remote = remote_with(&["01", "03"]);
    let ctx = CancelContext::new();
    ctx.cancel();

    let res = stager.stage_all(&remote, &descriptors(&remote), &ctx);
    assert!(matches!(res, Err(HimawariArchError::Interrupted)));
    assert_eq!(remote.get_count(), 0);
}

#[test]
fn cancel_removes_registered_temp_file() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = tmp.path().join("file.DAT.bz2.part");
    fs::write(&temp, b"partial").unwrap();

    let ctx = CancelContext::new();
    let guard = ctx.guard(temp.clone());
    assert_eq!(ctx.in_flight(), Some(temp.clone()));

    let handler_ctx = ctx.clone();
    assert_eq!(handler_ctx.cancel(), Some(temp.clone()));
    assert!(!temp.exists());
    assert!(ctx.is_cancelled());

    drop(guard);
    assert_eq!(ctx.in_flight(), None);
}

#[test]
fn committed_guard_keeps_file() {
    let tmp = tempfile::tempdir().unwrap();
    let temp = tmp.path().join("a.part");
    let dest = tmp.path().join("a");
    fs::write(&temp, b"data").unwrap();

    let ctx = CancelContext::new();
    ctx.guard(temp.clone()).commit(&dest).unwrap();

    assert!(dest.exists());
    assert!(!temp.exists());
    assert_eq!(ctx.in_flight(), None);
    assert_eq!(ctx.cancel(), None);
}
