/**************************************************************************************************
 *                                           Public API
 *************************************************************************************************/
pub use crate::{
    archive::{Archive, LocalArchive, SlotReport},
    band::{BandId, BandSet, DEFAULT_BANDS},
    cancel::{CancelContext, TempGuard},
    composite::{composite_path, CompositeGenerator, ExternalCommandGenerator},
    config::ArchiveConfig,
    decompress::{decompress_file, DecompressionPool, DecompressionResult},
    error::{HimawariArchError, Result},
    filename::{parse_archive_name, ParsedName, BAND_STRATEGIES},
    remote::{RemoteError, RemoteSession, SessionParams},
    satellite::Satellite,
    scanner::{RemoteFileDescriptor, RemoteSlotScanner, ScanOutcome},
    slots::{LocalSlotScanner, SlotKey, SlotMap, SlotSelection},
    stager::{DownloadReport, DownloadStager, DownloadTask, StageOutcome, TaskState},
    time_window::{generate, parse_time_point, TimePoint},
};

#[cfg(feature = "sftp")]
pub use crate::sftp_remote::SftpSession;

pub mod filename;

/**************************************************************************************************
 *                                      Private Implementation
 *************************************************************************************************/
mod archive;
mod band;
mod cancel;
mod composite;
mod config;
mod decompress;
mod error;
mod remote;
mod satellite;
mod scanner;
#[cfg(feature = "sftp")]
mod sftp_remote;
mod slots;
mod stager;
mod time_window;
