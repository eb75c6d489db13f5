use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

/// Run-level cancellation state.
///
/// Clones share state, so a signal handler can hold one clone while the download loop holds
/// another. At most one in-flight temp file is registered at any time.
#[derive(Clone, Debug, Default)]
pub struct CancelContext {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    in_flight: Mutex<Option<PathBuf>>,
}

impl CancelContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Mark the run as cancelled and delete the registered temp file, if any. Returns the path
    /// that was removed.
    pub fn cancel(&self) -> Option<PathBuf> {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        let pth = self.slot().take();
        match pth {
            Some(pth) => {
                log::info!("Cleaning up partial download: {:?}", pth);
                remove_temp(&pth);
                Some(pth)
            }
            None => {
                log::info!("No partial file to clean up.");
                None
            }
        }
    }

    pub fn in_flight(&self) -> Option<PathBuf> {
        self.slot().clone()
    }

    /// Register `temp_path` as the current in-flight download.
    pub fn guard<P: Into<PathBuf>>(&self, temp_path: P) -> TempGuard<'_> {
        let path = temp_path.into();
        *self.slot() = Some(path.clone());

        TempGuard {
            ctx: self,
            path,
            committed: false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, path: &Path) {
        let mut slot = self.slot();
        if slot.as_deref() == Some(path) {
            *slot = None;
        }
    }
}

/// Scoped ownership of one temp download file.
///
/// Dropping the guard without [`TempGuard::commit`] removes the temp file.
#[derive(Debug)]
pub struct TempGuard<'a> {
    ctx: &'a CancelContext,
    path: PathBuf,
    committed: bool,
}

impl TempGuard<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the temp file to `final_path`.
    pub fn commit(mut self, final_path: &Path) -> io::Result<()> {
        fs::rename(&self.path, final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            remove_temp(&self.path);
        }
        self.ctx.release(&self.path);
    }
}

fn remove_temp(pth: &Path) {
    match fs::remove_file(pth) {
        Ok(()) => log::info!("Removed partial download file: {:?}", pth),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::error!("Error removing partial file {:?}: {}", pth, err),
    }
}
