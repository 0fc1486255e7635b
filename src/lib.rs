//! # `vmufs`
//!
//! A flash filesystem engine for Sega Dreamcast VMU card images: a FAT-like
//! filesystem over a flat 128 KiB flash buffer, plus codecs for the host
//! container formats emulators and save-game tools use to carry VMU files
//! around (`.bin`/`.vmu`, `.dcm`, `.dci`, `.vmi`+`.vms`).
//!
//! ## Architecture
//!
//! `device::VmuDevice` owns the raw flash buffer and is the only thing that
//! allocates memory; every other module is a typed view over it, split the
//! way the layers of the real hardware are split:
//! * `block` — the root block and the FAT allocator
//! * `directory` — the 32-byte directory entries
//! * `file` — create/delete/read/crc as block-chain operations
//! * `defrag` — the snapshot/reinstall/rollback transaction
//! * `codec` — host file formats layered on top of the above
//!
//! This library does not emulate the VMU's CPU, LCD, or BIOS; it only
//! interprets the flash image the way the BIOS's own filesystem code would.

pub mod block;
pub mod codec;
pub mod defrag;
pub mod device;
pub mod directory;
pub mod error;
pub mod file;
pub mod time;

pub use block::{MemUsage, RootBlock};
pub use device::VmuDevice;
pub use directory::{CopyProtect, DirEntry, FileType};
pub use error::{Error, VmuResult, DYNERR};
pub use file::FileProperties;
