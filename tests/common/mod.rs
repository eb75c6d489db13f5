#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashSet},
    fs,
    io::Write,
    path::Path,
};

use bzip2::{write::BzEncoder, Compression};
use himawari_arch::{parse_time_point, CancelContext, RemoteError, RemoteSession, TimePoint};

/// In-memory remote archive. Files are keyed by directory (without trailing slash).
#[derive(Default)]
pub struct FakeRemote {
    dirs: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    failing: HashSet<String>,
    disconnecting: HashSet<String>,
    cancel_on_get: Option<(String, CancelContext)>,
    broken_dirs: HashSet<String>,
    lists: Cell<usize>,
    gets: Cell<usize>,
    requested: RefCell<Vec<String>>,
    pub closed: Cell<bool>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, dir: &str, fname: &str, data: &[u8]) {
        self.dirs
            .entry(normalize(dir))
            .or_default()
            .insert(fname.to_owned(), data.to_vec());
    }

    pub fn add_dir(&mut self, dir: &str) {
        self.dirs.entry(normalize(dir)).or_default();
    }

    /// `get` of this remote path writes a few bytes and then fails
    pub fn fail_transfer(&mut self, remote_path: &str) {
        self.failing.insert(remote_path.to_owned());
    }

    /// `get` of this remote path loses the connection
    pub fn drop_connection(&mut self, remote_path: &str) {
        self.disconnecting.insert(remote_path.to_owned());
    }

    /// `get` of this remote path is interrupted by `ctx.cancel()` halfway through the transfer
    pub fn cancel_during_get(&mut self, remote_path: &str, ctx: CancelContext) {
        self.cancel_on_get = Some((remote_path.to_owned(), ctx));
    }

    /// `list` of this directory fails with a non-"not found" error
    pub fn break_listing(&mut self, dir: &str) {
        self.broken_dirs.insert(normalize(dir));
    }

    pub fn list_count(&self) -> usize {
        self.lists.get()
    }

    pub fn get_count(&self) -> usize {
        self.gets.get()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl RemoteSession for FakeRemote {
    fn list(&self, dir: &str) -> Result<Vec<String>, RemoteError> {
        self.lists.set(self.lists.get() + 1);
        let key = normalize(dir);
        if self.broken_dirs.contains(&key) {
            return Err(RemoteError::Listing {
                path: dir.to_owned(),
                message: "permission denied".into(),
            });
        }

        self.dirs
            .get(&key)
            .map(|files| files.keys().cloned().collect())
            .ok_or_else(|| RemoteError::NotFound(dir.to_owned()))
    }

    fn get(&self, remote_path: &str, local_path: &Path) -> Result<(), RemoteError> {
        self.gets.set(self.gets.get() + 1);
        self.requested.borrow_mut().push(remote_path.to_owned());

        let transfer_err = |message: &str| RemoteError::Transfer {
            path: remote_path.to_owned(),
            message: message.to_owned(),
        };

        if self.disconnecting.contains(remote_path) {
            return Err(RemoteError::Transport("connection lost".into()));
        }

        if let Some((_, ctx)) = self
            .cancel_on_get
            .as_ref()
            .filter(|(pth, _)| pth == remote_path)
        {
            fs::write(local_path, b"partial").map_err(|e| transfer_err(&e.to_string()))?;
            ctx.cancel();
            return Ok(());
        }

        if self.failing.contains(remote_path) {
            fs::write(local_path, b"partial").map_err(|e| transfer_err(&e.to_string()))?;
            return Err(transfer_err("connection reset"));
        }

        let (dir, fname) = remote_path
            .rsplit_once('/')
            .ok_or_else(|| transfer_err("bad path"))?;
        let data = self
            .dirs
            .get(&normalize(dir))
            .and_then(|files| files.get(fname))
            .ok_or_else(|| transfer_err("no such file"))?;

        fs::write(local_path, data).map_err(|e| transfer_err(&e.to_string()))
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

fn normalize(dir: &str) -> String {
    dir.trim_end_matches('/').to_owned()
}

pub fn bz2(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

pub fn tp(s: &str) -> TimePoint {
    parse_time_point(s).unwrap()
}

pub fn archive_name(date: &str, time: &str, band: &str) -> String {
    format!("HS_H09_{}_{}_B{}_FLDK_R10_S0110.DAT.bz2", date, time, band)
}

/// bz2 fixture holding `content` under `dir/name`
pub fn write_archive(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    fs::create_dir_all(dir).unwrap();
    let pth = dir.join(name);
    fs::write(&pth, bz2(content)).unwrap();
    pth
}
