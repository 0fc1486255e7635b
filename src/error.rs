//! Error taxonomy for the flash filesystem engine.
//!
//! One tagged value per failure kind, mirroring the `Display` style of
//! `fs::prodos::types::Error` / `fs::fat::types::Error`: each variant carries
//! its own human-readable sentence, interpolating the sizes/indices relevant
//! to the failure.

use thiserror::Error;

pub type VmuResult<T> = Result<T, Error>;
pub type DYNERR = Box<dyn std::error::Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("could not open host file {0}")]
    OpenFailed(String),
    #[error("host file read was short or failed: {0}")]
    ReadFailed(String),
    #[error("card has only {free} free blocks, {needed} required")]
    InadequateFreeBlocks { free: usize, needed: usize },
    #[error("a GAME file already occupies this card")]
    GameDuplicate,
    #[error("a reserved file name ({0}) is already present")]
    NameDuplicate(String),
    #[error("directory is full, no free entry for a new file")]
    FilesMaxed,
    #[error("defragmentation could not free {0} contiguous blocks from block 0")]
    DefragFailed(usize),
    #[error("internal inconsistency while reading FAT/directory: {0}")]
    DeviceReadError(String),
    #[error("internal inconsistency while writing FAT/directory: {0}")]
    DeviceWriteError(String),
    #[error("flash image has no format marker at the root block")]
    FlashUnformatted,
    #[error("VMI sidecar {0} has no paired VMS file")]
    VmiNoVms(String),
    #[error("VMS file {0} has no paired VMI sidecar")]
    VmsNoVmi(String),
    #[error("file extension {0} is not a recognised container format")]
    UnknownFormat(String),
}
