//! Owns the raw 128 KiB flash buffer and the per-device last-error message.
//!
//! Everything above this is a typed view over `VmuDevice::flash`; this is the
//! only place the buffer's total size and block geometry constants live.

use std::cell::RefCell;

use crate::error::Error;

/// Total size of a Sega stock VMU flash card.
pub const FLASH_SIZE: usize = 128 * 1024;
/// Size of one allocation block.
pub const BLOCK_SIZE: usize = 512;
/// Size of one directory entry.
pub const DIR_ENTRY_SIZE: usize = 32;

/// FAT sentinel values, as used by the VMU BIOS.
pub const UNALLOCATED: u16 = 0xFFFC;
pub const LAST_IN_FILE: u16 = 0xFFFA;
pub const DAMAGED: u16 = 0xFFFF;

/// Cap on the last-error-message buffer, matching the original
/// `VMU_FLASH_LOAD_IMAGE_ERROR_MESSAGE_SIZE`.
const LAST_ERROR_CAP: usize = 256;

/// A single 128 KiB flash image plus the bookkeeping the engine needs to
/// operate on it. This is the "device handle" spec.md refers to; the CPU/LCD
/// emulation that would otherwise own this buffer is out of scope here.
pub struct VmuDevice {
    flash: Box<[u8; FLASH_SIZE]>,
    last_error: RefCell<String>,
}

impl std::fmt::Debug for VmuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmuDevice")
            .field("last_error", &self.last_error.borrow())
            .finish_non_exhaustive()
    }
}

impl VmuDevice {
    /// A zero-filled, unformatted card. Mirrors `fs::fat::Disk::from_img`
    /// taking ownership of fresh storage; callers must `format` before use.
    pub fn new() -> Self {
        Self {
            flash: Box::new([0u8; FLASH_SIZE]),
            last_error: RefCell::new(String::new()),
        }
    }

    /// Wrap an existing 128 KiB image (e.g. loaded from a `.bin`/`.vmu` file).
    pub fn from_flash(flash: [u8; FLASH_SIZE]) -> Self {
        Self {
            flash: Box::new(flash),
            last_error: RefCell::new(String::new()),
        }
    }

    pub fn flash(&self) -> &[u8; FLASH_SIZE] {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut [u8; FLASH_SIZE] {
        &mut self.flash
    }

    /// Replace the entire flash image, e.g. during defragmentation rollback.
    pub fn restore_flash(&mut self, snapshot: &[u8; FLASH_SIZE]) {
        self.flash.copy_from_slice(snapshot);
    }

    pub fn last_error_message(&self) -> String {
        self.last_error.borrow().clone()
    }

    /// Record a human-readable sentence for the last failure. Per spec.md
    /// §9, this is never cleared on success — only overwritten by the next
    /// failure.
    pub(crate) fn record_error(&self, e: Error) -> Error {
        log::error!("{}", e);
        let mut msg = e.to_string();
        msg.truncate(LAST_ERROR_CAP);
        *self.last_error.borrow_mut() = msg;
        e
    }
}

impl Default for VmuDevice {
    fn default() -> Self {
        Self::new()
    }
}
