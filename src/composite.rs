use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    error::{HimawariArchError, Result},
    slots::SlotKey,
};

/// Consumer of one slot's decompressed band files.
pub trait CompositeGenerator {
    fn generate(&self, slot: &SlotKey, files: &[PathBuf], output_dir: &Path) -> Result<PathBuf>;
}

/// `<output_dir>/<YYYYMMDD>/<YYYYMMDD>_<HHMM>_TrueColor.png`
pub fn composite_path(slot: &SlotKey, output_dir: &Path) -> PathBuf {
    output_dir
        .join(&slot.date)
        .join(format!("{}_{}_TrueColor.png", slot.date, slot.time))
}

/// Hands the files to an external imaging program as
/// `<program> <args..> <output png> <file>...`.
#[derive(Debug, Clone)]
pub struct ExternalCommandGenerator {
    program: String,
    args: Vec<String>,
}

impl ExternalCommandGenerator {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        ExternalCommandGenerator {
            program: program.into(),
            args,
        }
    }
}

impl CompositeGenerator for ExternalCommandGenerator {
    fn generate(&self, slot: &SlotKey, files: &[PathBuf], output_dir: &Path) -> Result<PathBuf> {
        if files.is_empty() {
            return Err(HimawariArchError::Composite(format!(
                "no decompressed files for slot {}",
                slot
            )));
        }

        let out = composite_path(slot, output_dir);
        if let Some(dir) = out.parent() {
            create_dir_all(dir)?;
        }

        log::info!("--- Generating composite for {} ---", slot);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&out)
            .args(files)
            .status()?;

        if !status.success() {
            return Err(HimawariArchError::Composite(format!(
                "{} exited with {} for slot {}",
                self.program, status, slot
            )));
        }

        log::info!("Composite image saved to: {:?}", out);
        Ok(out)
    }
}
