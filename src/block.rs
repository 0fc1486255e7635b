//! ## Block layer
//!
//! Typed views over the raw flash buffer: the root block, the FAT, and the
//! allocator. This is the only layer that interprets raw flash bytes as
//! anything other than an opaque array; every layer above (`directory`,
//! `file`, `defrag`, `codec`) goes through the accessors here.

use binrw::{BinRead, BinWrite};
use std::io::Cursor;

use crate::device::{VmuDevice, BLOCK_SIZE, DAMAGED, LAST_IN_FILE, UNALLOCATED};
use crate::directory::FileType;
use crate::error::{Error, VmuResult};
use crate::time;

/// Physical location of the root block on a Sega stock card. Unlike the
/// other layout fields (which are read from the root block itself), this
/// one must be known up front in order to find the root block at all.
pub const ROOT_BLOCK_INDEX: u16 = 255;

/// Every byte of the "formatted" marker equals this when the card is
/// formatted.
const FORMAT_SENTINEL: u8 = 0x55;

/// Structured view of the root block (spec.md §3, §6). Field offsets follow
/// the Sega-documented layout so BIOS ROMs can read the card; reserved
/// regions round the struct out to exactly `BLOCK_SIZE` bytes.
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct RootBlock {
    pub formatted: [u8; 16],
    pub custom_color: u8,
    /// (blue, green, red, alpha)
    pub color: [u8; 4],
    reserved1: [u8; 11],
    pub timestamp: [u8; 8],
    reserved2: [u8; 8],
    pub total_size: u16,
    pub partition_number: u16,
    pub root_block: u16,
    pub fat_block: u16,
    pub fat_size: u16,
    pub dir_block: u16,
    pub dir_size: u16,
    pub icon_shape: u16,
    pub user_size: u16,
    pub save_area_block: u16,
    pub save_area_size: u16,
    pub exec_file_index: u16,
    reserved3: [u8; 440],
}

impl RootBlock {
    /// Sega stock 256-block card geometry: FAT at 254 (1 block), directory
    /// at 253 spanning 13 blocks, save area at 31, 200 user blocks.
    pub fn sega_default() -> Self {
        Self {
            formatted: [FORMAT_SENTINEL; 16],
            custom_color: 0,
            color: [0, 0, 0, 0],
            reserved1: [0; 11],
            timestamp: time::pack_timestamp(None),
            reserved2: [0; 8],
            total_size: 256,
            partition_number: 0,
            root_block: ROOT_BLOCK_INDEX,
            fat_block: 254,
            fat_size: 1,
            dir_block: 253,
            dir_size: 13,
            icon_shape: 0,
            user_size: 200,
            save_area_block: 31,
            save_area_size: 200,
            exec_file_index: 0xFF,
            reserved3: [0; 440],
        }
    }

    fn from_bytes(buf: &[u8; BLOCK_SIZE]) -> Self {
        let mut cursor = Cursor::new(&buf[..]);
        RootBlock::read(&mut cursor).expect("root block is fixed size, cannot fail to parse")
    }

    fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut cursor = Cursor::new(vec![0u8; BLOCK_SIZE]);
        self.write(&mut cursor).expect("root block is fixed size, cannot fail to serialize");
        cursor.into_inner().try_into().unwrap()
    }

    /// True iff the first 15 bytes of the formatted marker equal the
    /// sentinel byte, per spec.md §4.1.
    pub fn is_formatted(&self) -> bool {
        self.formatted[..15].iter().all(|b| *b == FORMAT_SENTINEL)
    }
}

/// Free/used/damaged/hidden block accounting, spec.md §8 property 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemUsage {
    pub blocks_free: usize,
    pub blocks_used: usize,
    pub blocks_damaged: usize,
    pub blocks_hidden: usize,
}

impl VmuDevice {
    pub fn root(&self) -> RootBlock {
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(self.block_region(ROOT_BLOCK_INDEX));
        RootBlock::from_bytes(&buf)
    }

    pub fn write_root(&mut self, root: &RootBlock) {
        let bytes = root.to_bytes();
        self.block_region_mut(ROOT_BLOCK_INDEX).copy_from_slice(&bytes);
    }

    pub fn check_formatted(&self) -> bool {
        self.root().is_formatted()
    }

    fn block_region(&self, b: u16) -> &[u8] {
        let start = b as usize * BLOCK_SIZE;
        &self.flash()[start..start + BLOCK_SIZE]
    }

    fn block_region_mut(&mut self, b: u16) -> &mut [u8] {
        let start = b as usize * BLOCK_SIZE;
        &mut self.flash_mut()[start..start + BLOCK_SIZE]
    }

    /// Number of blocks the FAT can address. Source of truth is FAT sizing,
    /// not `total_size` (known-unreliable in Sega-formatted cards).
    pub fn block_count(&self) -> usize {
        self.root().fat_size as usize * BLOCK_SIZE / 2
    }

    /// Number of user-data blocks, again trusting the root's own field over
    /// `total_size`.
    pub fn user_data_blocks(&self) -> usize {
        self.root().user_size as usize
    }

    fn fat_byte_offset(&self, b: u16) -> usize {
        self.root().fat_block as usize * BLOCK_SIZE + b as usize * 2
    }

    pub fn fat_entry(&self, b: u16) -> u16 {
        if b as usize >= self.block_count() {
            return UNALLOCATED;
        }
        let off = self.fat_byte_offset(b);
        u16::from_le_bytes([self.flash()[off], self.flash()[off + 1]])
    }

    fn set_fat_entry(&mut self, b: u16, val: u16) {
        let off = self.fat_byte_offset(b);
        let bytes = val.to_le_bytes();
        self.flash_mut()[off] = bytes[0];
        self.flash_mut()[off + 1] = bytes[1];
    }

    /// `fat[b]`, or `UNALLOCATED` if `b` is out of range.
    pub fn block_next(&self, b: u16) -> u16 {
        self.fat_entry(b)
    }

    pub fn block_bytes(&self, b: u16) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        out.copy_from_slice(self.block_region(b));
        out
    }

    pub fn write_block_bytes(&mut self, b: u16, data: &[u8]) {
        let region = self.block_region_mut(b);
        let n = data.len().min(BLOCK_SIZE);
        region[..n].copy_from_slice(&data[..n]);
        for byte in region[n..].iter_mut() {
            *byte = 0;
        }
    }

    /// Number of consecutive `UNALLOCATED` blocks starting at block 0,
    /// i.e. how large a GAME file could be installed without defragmenting.
    pub fn contiguous_free_from_zero(&self) -> usize {
        let mut n = 0;
        let user_blocks = self.user_data_blocks() as u16;
        while n < user_blocks as usize && self.fat_entry(n as u16) == UNALLOCATED {
            n += 1;
        }
        n
    }

    pub fn mem_usage(&self) -> MemUsage {
        let root = self.root();
        let user_blocks = root.user_size as usize;
        let mut blocks_free = 0;
        let mut blocks_used = 0;
        let mut blocks_damaged = 0;
        for b in 0..user_blocks {
            match self.fat_entry(b as u16) {
                UNALLOCATED => blocks_free += 1,
                DAMAGED => blocks_damaged += 1,
                _ => blocks_used += 1,
            }
        }
        let blocks_hidden = root.total_size as usize
            - root.fat_size as usize
            - root.dir_size as usize
            - 1
            - user_blocks;
        MemUsage {
            blocks_free,
            blocks_used,
            blocks_damaged,
            blocks_hidden,
        }
    }

    /// Allocate one block for a file of the given type, optionally chaining
    /// it onto `previous`. GAME files are placed ascending from block 0 so
    /// the BIOS can execute them in place; DATA files are placed descending
    /// from the top of the user area so a future GAME keeps the low
    /// addresses free. Returns `UNALLOCATED` and performs no mutation on
    /// failure.
    pub fn block_alloc(&mut self, previous: u16, file_type: FileType) -> u16 {
        let user_blocks = self.user_data_blocks();
        let chosen = match file_type {
            FileType::Game => (0..user_blocks as u16).find(|b| self.fat_entry(*b) == UNALLOCATED),
            FileType::Data => (0..user_blocks as u16)
                .rev()
                .find(|b| self.fat_entry(*b) == UNALLOCATED),
            FileType::None => None,
        };
        let chosen = match chosen {
            Some(b) => b,
            None => {
                log::warn!("block_alloc: no free block available for {:?}", file_type);
                return UNALLOCATED;
            }
        };
        self.set_fat_entry(chosen, LAST_IN_FILE);
        self.write_block_bytes(chosen, &[]);
        if previous != UNALLOCATED && previous != LAST_IN_FILE {
            self.set_fat_entry(previous, chosen);
        }
        log::trace!("block_alloc: {:?} -> block {}", file_type, chosen);
        chosen
    }

    /// Free block `b`: zero its contents and mark `UNALLOCATED`. Does not
    /// touch any predecessor; safe use is restricted to `file_delete`, which
    /// always walks forward from `first_block`.
    pub fn block_free(&mut self, b: u16) {
        self.write_block_bytes(b, &[]);
        self.set_fat_entry(b, UNALLOCATED);
    }

    /// Zero the buffer, write the supplied root template, mark FAT/root/
    /// directory blocks self-terminating, and mark every other block free.
    pub fn format(&mut self, template: &RootBlock) -> VmuResult<()> {
        for byte in self.flash_mut().iter_mut() {
            *byte = 0;
        }
        let mut root = template.clone();
        root.formatted = [FORMAT_SENTINEL; 16];
        root.timestamp = time::pack_timestamp(None);
        if root.user_size as u32 + root.fat_size as u32 + root.dir_size as u32 + 1
            > root.total_size as u32
        {
            return Err(self.record_error(Error::DeviceWriteError(format!(
                "user_size {} + fat_size {} + dir_size {} + 1 exceeds total_size {}",
                root.user_size, root.fat_size, root.dir_size, root.total_size
            ))));
        }
        self.write_root(&root);

        for b in 0..root.user_size {
            self.set_fat_entry(b, UNALLOCATED);
        }
        for i in 0..root.fat_size {
            self.set_fat_entry(root.fat_block + i, LAST_IN_FILE);
        }
        self.set_fat_entry(root.root_block, LAST_IN_FILE);

        let dir_top = root.dir_block;
        let dir_size = root.dir_size;
        for i in 0..dir_size {
            let b = dir_top - i;
            if i == dir_size - 1 {
                self.set_fat_entry(b, LAST_IN_FILE);
            } else {
                self.set_fat_entry(b, b - 1);
            }
        }
        log::debug!(
            "formatted card: total={} user={} fat_block={} dir_block={}..{}",
            root.total_size,
            root.user_size,
            root.fat_block,
            dir_top - dir_size + 1,
            dir_top
        );
        Ok(())
    }

    pub fn format_default(&mut self) -> VmuResult<()> {
        self.format(&RootBlock::sega_default())
    }
}
