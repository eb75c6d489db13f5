use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, create_dir_all, File},
    io::{self, BufReader, BufWriter, Write},
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    thread,
};

use crate::{error::HimawariArchError, filename::decompressed_name, stager::TEMP_SUFFIX};
use bzip2::read::BzDecoder;
use crossbeam_channel::unbounded;

const PROGRESS_STEP: usize = 50;

/// One entry per submitted archive, keyed by the archive path.
#[derive(Debug, Default)]
pub struct DecompressionResult {
    entries: BTreeMap<PathBuf, Result<PathBuf, HimawariArchError>>,
}

impl DecompressionResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, archive: &Path) -> Option<&Result<PathBuf, HimawariArchError>> {
        self.entries.get(archive)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Result<PathBuf, HimawariArchError>)> {
        self.entries.iter()
    }

    /// decompressed paths, in archive path order
    pub fn successes(&self) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter_map(|res| res.as_ref().ok().cloned())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&PathBuf, &HimawariArchError)> {
        self.entries
            .iter()
            .filter_map(|(archive, res)| res.as_ref().err().map(|err| (archive, err)))
            .collect()
    }
}

/// `<output_dir>/<archive name without .bz2>`
pub fn output_path(archive: &Path, output_dir: &Path) -> PathBuf {
    let fname = archive
        .file_name()
        .map(|fname| fname.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(decompressed_name(&fname))
}

/// Decompress a single bz2 archive into `output_dir`.
///
/// The data goes to `<output>.part` first and is renamed into place once complete, so an
/// existing non-empty output is always whole and reused as is. A zero-length one is
/// regenerated. On failure the partial output is removed.
pub fn decompress_file(archive: &Path, output_dir: &Path) -> Result<PathBuf, HimawariArchError> {
    let out = output_path(archive, output_dir);

    if let Ok(md) = fs::metadata(&out) {
        if md.len() > 0 {
            log::debug!("Reusing decompressed file {:?}", out);
            return Ok(out);
        }
        log::warn!("Exists but is zero-length, decompressing again: {:?}", out);
        fs::remove_file(&out)?;
    }

    let temp = temp_path(&out);
    if temp.exists() {
        log::warn!("Partial output exists: {:?}. Overwriting.", temp);
    }

    let decompression_err = |message: String| HimawariArchError::Decompression {
        path: archive.to_path_buf(),
        message,
    };

    match write_decompressed(archive, &temp) {
        Ok(0) => {
            remove_partial(&temp);
            Err(decompression_err("archive decompressed to zero bytes".into()))
        }
        Ok(_) => match fs::rename(&temp, &out) {
            Ok(()) => Ok(out),
            Err(err) => {
                log::error!("Error moving {:?} into place: {}", temp, err);
                remove_partial(&temp);
                Err(decompression_err(err.to_string()))
            }
        },
        Err(err) => {
            log::error!("Error decompressing {:?}: {}", archive, err);
            remove_partial(&temp);
            Err(decompression_err(err.to_string()))
        }
    }
}

fn temp_path(out: &Path) -> PathBuf {
    let mut name = out.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn write_decompressed(archive: &Path, out: &Path) -> io::Result<u64> {
    let mut reader = BzDecoder::new(BufReader::new(File::open(archive)?));
    let mut writer = BufWriter::new(File::create(out)?);

    let n = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(n)
}

fn remove_partial(out: &Path) {
    match fs::remove_file(out) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::error!("Error removing partial output {:?}: {}", out, err),
    }
}

/// Bounded pool decompressing the archives of one slot.
pub struct DecompressionPool {
    max_workers: usize,
}

impl DecompressionPool {
    pub fn new(max_workers: usize) -> Self {
        DecompressionPool {
            max_workers: max_workers.max(1),
        }
    }

    pub fn with_host_parallelism() -> Self {
        Self::new(default_workers())
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Blocks until every archive has been handled.
    pub fn run(&self, archives: &[PathBuf], output_dir: &Path) -> DecompressionResult {
        let archives: BTreeSet<PathBuf> = archives.iter().cloned().collect();
        let mut result = DecompressionResult::default();
        if archives.is_empty() {
            return result;
        }

        if let Err(err) = create_dir_all(output_dir) {
            log::error!("Error creating output directory {:?}: {}", output_dir, err);
            for archive in archives {
                let failure = HimawariArchError::Decompression {
                    path: archive.clone(),
                    message: format!("output directory unavailable: {}", err),
                };
                result.entries.insert(archive, Err(failure));
            }
            return result;
        }

        let num_total = archives.len();
        let num_workers = self.max_workers.min(num_total);
        log::info!(
            "Decompressing {} files with up to {} threads...",
            num_total,
            num_workers
        );

        let pool = threadpool::ThreadPool::with_name("Decompress Thread".to_owned(), num_workers);
        let (to_collector, results) = unbounded();

        for archive in archives {
            let to_collector = to_collector.clone();
            let output_dir = output_dir.to_path_buf();

            pool.execute(move || {
                let res = catch_unwind(AssertUnwindSafe(|| decompress_file(&archive, &output_dir)))
                    .unwrap_or_else(|_| {
                        Err(HimawariArchError::Decompression {
                            path: archive.clone(),
                            message: "decompression task panicked".into(),
                        })
                    });

                if to_collector.send((archive, res)).is_err() {
                    log::error!("Decompression collector went away");
                }
            });
        }
        drop(to_collector);

        let mut num_ok = 0;
        for (archive, res) in results {
            match &res {
                Ok(_) => {
                    num_ok += 1;
                    if num_ok % PROGRESS_STEP == 0 {
                        log::info!("Decompressed {} of {} files...", num_ok, num_total);
                    }
                }
                Err(err) => log::error!("Decompression of {:?} failed: {}", archive, err),
            }
            result.entries.insert(archive, res);
        }
        pool.join();

        log::info!(
            "Decompression finished. {} of {} files available.",
            num_ok,
            num_total
        );

        result
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
