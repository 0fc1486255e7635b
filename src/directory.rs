//! ## Directory layer
//!
//! Iterate/find/allocate/free the 32-byte directory entries stored in the
//! directory blocks. Entries are indexed top-down: entry 0 is the first
//! entry of the block at `root.dir_block - (root.dir_size - 1)`, per
//! spec.md §4.2.

use binrw::{BinRead, BinWrite};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::io::Cursor;

use crate::device::{VmuDevice, BLOCK_SIZE, DIR_ENTRY_SIZE};
use crate::time;

pub const ICONDATA_VMS_NAME: &str = "ICONDATA.VMS";
/// Reserved well-known name for the background PVR texture used by some
/// games' save icons.
pub const EXTRA_BG_PVR_NAME: &str = "EXTRA.PVR";

/// Storage type of a directory entry.
#[derive(FromPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileType {
    None = 0x00,
    Data = 0x33,
    Game = 0xcc,
}

impl FileType {
    fn from_byte(b: u8) -> Self {
        FromPrimitive::from_u8(b).unwrap_or(FileType::None)
    }
}

/// Copy-protection flag of a directory entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CopyProtect {
    Ok,
    Protected,
    Unknown,
}

impl CopyProtect {
    fn from_byte(b: u8) -> Self {
        match b {
            0x00 => CopyProtect::Ok,
            0xff => CopyProtect::Protected,
            _ => CopyProtect::Unknown,
        }
    }
    fn to_byte(self) -> u8 {
        match self {
            CopyProtect::Ok => 0x00,
            CopyProtect::Protected => 0xff,
            CopyProtect::Unknown => 0xff,
        }
    }
}

/// Raw 32-byte directory entry layout (spec.md §6). `type_byte` and
/// `copy_protect_byte` are kept raw rather than as enums so an unrecognised
/// byte round-trips instead of failing to parse; `file_type()`/
/// `copy_protect()` interpret them.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct DirEntry {
    type_byte: u8,
    copy_protect_byte: u8,
    pub first_block: u16,
    pub file_name: [u8; 12],
    pub timestamp: [u8; 8],
    pub file_size: u16,
    pub header_offset: u16,
    unused: [u8; 4],
}

impl DirEntry {
    pub(crate) fn empty() -> Self {
        Self {
            type_byte: FileType::None as u8,
            copy_protect_byte: 0,
            first_block: 0,
            file_name: [0x20; 12],
            timestamp: [0; 8],
            file_size: 0,
            header_offset: 0,
            unused: [0; 4],
        }
    }

    pub(crate) fn from_bytes(buf: &[u8]) -> Self {
        let mut cursor = Cursor::new(buf);
        DirEntry::read(&mut cursor).expect("directory entry is fixed size, cannot fail to parse")
    }

    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut cursor = Cursor::new(vec![0u8; DIR_ENTRY_SIZE]);
        self.write(&mut cursor)
            .expect("directory entry is fixed size, cannot fail to serialize");
        cursor.into_inner().try_into().unwrap()
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_byte(self.type_byte)
    }

    pub fn set_file_type(&mut self, t: FileType) {
        self.type_byte = t as u8;
    }

    pub fn copy_protect(&self) -> CopyProtect {
        CopyProtect::from_byte(self.copy_protect_byte)
    }

    pub fn set_copy_protect(&mut self, p: CopyProtect) {
        self.copy_protect_byte = p.to_byte();
    }

    pub fn is_live(&self) -> bool {
        matches!(self.file_type(), FileType::Data | FileType::Game)
    }

    /// Space-padded, non-NUL-terminated 12-byte name, trimmed for display.
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.file_name)
            .trim_end()
            .to_string()
    }

    pub fn set_name(&mut self, name: &str) {
        let mut field = [0x20u8; 12];
        for (i, b) in name.as_bytes().iter().take(12).enumerate() {
            field[i] = *b;
        }
        self.file_name = field;
    }

    pub fn timestamp(&self) -> Option<chrono::NaiveDateTime> {
        time::unpack_timestamp(self.timestamp)
    }

    /// Prefix match against the shorter of the 12-byte field or
    /// `name.len()`, per spec.md §4.2.
    fn name_matches(&self, name: &str) -> bool {
        let n = name.len().min(12);
        let field = String::from_utf8_lossy(&self.file_name[..n]);
        field.eq_ignore_ascii_case(&name[..n])
    }
}

impl VmuDevice {
    fn dir_region(&self) -> &[u8] {
        let root = self.root();
        let first_block = root.dir_block - (root.dir_size - 1);
        let start = first_block as usize * BLOCK_SIZE;
        let len = root.dir_size as usize * BLOCK_SIZE;
        &self.flash()[start..start + len]
    }

    pub fn dir_count(&self) -> usize {
        let root = self.root();
        root.dir_size as usize * BLOCK_SIZE / DIR_ENTRY_SIZE
    }

    pub fn dir_by_index(&self, i: usize) -> DirEntry {
        let off = i * DIR_ENTRY_SIZE;
        DirEntry::from_bytes(&self.dir_region()[off..off + DIR_ENTRY_SIZE])
    }

    pub fn write_dir_entry(&mut self, i: usize, entry: &DirEntry) {
        let root = self.root();
        let first_block = root.dir_block - (root.dir_size - 1);
        let byte_index = i * DIR_ENTRY_SIZE;
        let block = first_block as usize + byte_index / BLOCK_SIZE;
        let offset_in_block = byte_index % BLOCK_SIZE;
        let mut block_bytes = self.block_bytes(block as u16);
        block_bytes[offset_in_block..offset_in_block + DIR_ENTRY_SIZE]
            .copy_from_slice(&entry.to_bytes());
        self.write_block_bytes(block as u16, &block_bytes);
    }

    /// First DATA/GAME entry whose name prefix-matches `name`.
    pub fn dir_find(&self, name: &str) -> Option<(usize, DirEntry)> {
        (0..self.dir_count())
            .map(|i| (i, self.dir_by_index(i)))
            .find(|(_, e)| e.is_live() && e.name_matches(name))
    }

    pub fn dir_find_game(&self) -> Option<(usize, DirEntry)> {
        (0..self.dir_count())
            .map(|i| (i, self.dir_by_index(i)))
            .find(|(_, e)| e.file_type() == FileType::Game)
    }

    pub fn dir_find_icondata(&self) -> Option<(usize, DirEntry)> {
        self.dir_find(ICONDATA_VMS_NAME)
    }

    pub fn dir_find_extra_bg_pvr(&self) -> Option<(usize, DirEntry)> {
        self.dir_find(EXTRA_BG_PVR_NAME)
    }

    /// First entry whose type is not DATA and not GAME: NONE, or any
    /// unrecognised byte, both treated as free.
    pub fn dir_entry_alloc(&self) -> Option<usize> {
        (0..self.dir_count()).find(|i| !self.dir_by_index(*i).is_live())
    }

    /// Zero the 32 bytes. The FAT chain is untouched; callers must free
    /// blocks first.
    pub fn dir_entry_free(&mut self, i: usize) {
        self.write_dir_entry(i, &DirEntry::empty());
    }

    pub fn file_count(&self) -> usize {
        (0..self.dir_count())
            .filter(|i| self.dir_by_index(*i).is_live())
            .count()
    }

    /// The `k`-th DATA/GAME entry encountered while iterating in descending
    /// dir index. This ordering is observable and must be preserved: the
    /// defragmenter uses it to sequence reinstalls (spec.md §4.2).
    pub fn file_at_index(&self, k: usize) -> Option<(usize, DirEntry)> {
        (0..self.dir_count())
            .rev()
            .map(|i| (i, self.dir_by_index(i)))
            .filter(|(_, e)| e.is_live())
            .nth(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_round_trip() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        assert_eq!(dev.file_count(), 0);
        let i = dev.dir_entry_alloc().unwrap();
        let mut e = DirEntry::empty();
        e.set_file_type(FileType::Data);
        e.set_name("HELLO");
        dev.write_dir_entry(i, &e);
        assert_eq!(dev.file_count(), 1);
        assert_eq!(dev.dir_find("HELLO").unwrap().0, i);
        dev.dir_entry_free(i);
        assert_eq!(dev.file_count(), 0);
    }

    #[test]
    fn file_at_index_is_descending() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let i0 = dev.dir_entry_alloc().unwrap();
        let mut e0 = DirEntry::empty();
        e0.set_file_type(FileType::Data);
        e0.set_name("FIRST");
        dev.write_dir_entry(i0, &e0);

        let i1 = dev.dir_entry_alloc().unwrap();
        let mut e1 = DirEntry::empty();
        e1.set_file_type(FileType::Data);
        e1.set_name("SECOND");
        dev.write_dir_entry(i1, &e1);

        assert!(i1 > i0);
        assert_eq!(dev.file_at_index(0).unwrap().1.name_str(), "SECOND");
        assert_eq!(dev.file_at_index(1).unwrap().1.name_str(), "FIRST");
    }
}
