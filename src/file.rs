//! ## File engine
//!
//! `file_create`/`file_delete`/`file_read`/`file_crc`: the only layer that
//! allocates or frees block chains as a unit. Grounded on the create/delete/
//! read contract shapes of `fs::fat::Disk::{save,delete,read_file}` and
//! `fs::prodos::Disk`'s rollback-on-failure writes.

use crate::device::{VmuDevice, BLOCK_SIZE, LAST_IN_FILE, UNALLOCATED};
use crate::directory::{CopyProtect, DirEntry, FileType};
use crate::error::{Error, VmuResult};
use crate::time;

/// Inputs to `file_create`; mirrors `properties` in spec.md §4.3.
#[derive(Debug, Clone)]
pub struct FileProperties {
    pub file_name: String,
    pub file_type: FileType,
    pub copy_protect: CopyProtect,
}

fn bytes_to_blocks(n: usize) -> usize {
    n.div_ceil(BLOCK_SIZE)
}

impl VmuDevice {
    /// Allocate a directory entry and block chain for `data`, and copy the
    /// bytes in. On any failure this leaves the card exactly as it was
    /// before the call (spec.md §4.3 steps 6-7).
    pub fn file_create(
        &mut self,
        properties: &FileProperties,
        data: &[u8],
    ) -> VmuResult<(usize, DirEntry)> {
        if properties.file_type == FileType::Game && self.dir_find_game().is_some() {
            return Err(self.record_error(Error::GameDuplicate));
        }

        let blocks_required = bytes_to_blocks(data.len());
        if self.mem_usage().blocks_free < blocks_required {
            return Err(self.record_error(Error::InadequateFreeBlocks {
                free: self.mem_usage().blocks_free,
                needed: blocks_required,
            }));
        }

        if properties.file_type == FileType::Game
            && self.contiguous_free_from_zero() < blocks_required
        {
            self.defragment(None)?;
            if self.contiguous_free_from_zero() < blocks_required {
                return Err(self.record_error(Error::DefragFailed(blocks_required)));
            }
        }

        let index = self
            .dir_entry_alloc()
            .ok_or_else(|| self.record_error(Error::FilesMaxed))?;

        let mut entry = DirEntry::empty();
        entry.set_name(&properties.file_name);
        entry.set_copy_protect(properties.copy_protect);
        entry.set_file_type(properties.file_type);
        entry.file_size = blocks_required as u16;
        entry.header_offset = if properties.file_type == FileType::Data {
            0
        } else {
            1
        };
        entry.timestamp = time::pack_timestamp(None);

        let mut allocated = Vec::with_capacity(blocks_required);
        let mut previous = UNALLOCATED;
        for _ in 0..blocks_required {
            let b = self.block_alloc(previous, properties.file_type);
            if b == UNALLOCATED {
                for &freed in &allocated {
                    self.block_free(freed);
                }
                return Err(self.record_error(Error::InadequateFreeBlocks {
                    free: self.mem_usage().blocks_free,
                    needed: blocks_required,
                }));
            }
            allocated.push(b);
            previous = b;
        }

        for (i, &b) in allocated.iter().enumerate() {
            let start = i * BLOCK_SIZE;
            let end = (start + BLOCK_SIZE).min(data.len());
            self.write_block_bytes(b, &data[start..end]);
        }

        entry.first_block = allocated.first().copied().unwrap_or(UNALLOCATED);
        self.write_dir_entry(index, &entry);
        log::info!(
            "file_create: {:?} {:?} {} blocks at dir index {}",
            properties.file_type,
            properties.file_name,
            blocks_required,
            index
        );
        Ok((index, entry))
    }

    /// Free every block in `entry`'s chain, then the directory entry itself.
    /// Returns the number of blocks freed. If the chain reaches
    /// `UNALLOCATED` before `LAST_IN_FILE`, stops there and returns the
    /// partial count; the card is corrupt but the caller is told so via the
    /// short count rather than an error (spec.md §4.3).
    pub fn file_delete(&mut self, index: usize) -> usize {
        let entry = self.dir_by_index(index);
        let mut freed = 0;
        let mut b = entry.first_block;
        while b != LAST_IN_FILE {
            if b == UNALLOCATED {
                log::warn!("file_delete: chain for dir index {} is corrupt", index);
                break;
            }
            let next = self.block_next(b);
            self.block_free(b);
            freed += 1;
            b = next;
        }
        self.dir_entry_free(index);
        freed
    }

    /// Walk the FAT chain from `entry.first_block`, copy up to `buffer.len()`
    /// bytes starting at `offset` bytes into the file, skipping the header
    /// block's bytes (but still walking through it) when `include_header` is
    /// false. Returns the number of bytes copied.
    pub fn file_read(&self, entry: &DirEntry, buffer: &mut [u8], offset: usize, include_header: bool) -> usize {
        let mut want_skip = offset;
        let mut written = 0;
        let mut b = entry.first_block;
        let mut block_index: u16 = 0;
        while b != LAST_IN_FILE && b != UNALLOCATED && written < buffer.len() {
            let block = self.block_bytes(b);
            let skip_block = !include_header && block_index == entry.header_offset;
            if !skip_block {
                for &byte in block.iter() {
                    if want_skip > 0 {
                        want_skip -= 1;
                        continue;
                    }
                    if written >= buffer.len() {
                        break;
                    }
                    buffer[written] = byte;
                    written += 1;
                }
            }
            b = self.block_next(b);
            block_index += 1;
        }
        written
    }

    /// DATA: CRC-16/CCITT over `headerSize + dataBytes` of the file with the
    /// in-place VMS header CRC field zeroed during the computation. GAME:
    /// the firmware never checks, so this always returns 0.
    ///
    /// Runs over the file's full `file_size * BLOCK_SIZE` block-aligned span
    /// rather than `headerSize + dataBytes`: the VMS header's own data-length
    /// field is outside this engine's scope, so there is no `dataBytes` value
    /// to trim to. The trailing pad bytes are zeroed by `file_create` and so
    /// don't perturb a CRC computed this way.
    pub fn file_crc(&self, entry: &DirEntry) -> u16 {
        if entry.file_type() != FileType::Data {
            return 0;
        }
        let total = entry.file_size as usize * BLOCK_SIZE;
        let mut buf = vec![0u8; total];
        self.file_read(entry, &mut buf, 0, true);
        if buf.len() >= VMS_CRC_FIELD_OFFSET + 2 {
            buf[VMS_CRC_FIELD_OFFSET] = 0;
            buf[VMS_CRC_FIELD_OFFSET + 1] = 0;
        }
        crc16_ccitt(&buf)
    }
}

/// Offset of the CRC field within a VMS header, per the Sega VMS header
/// layout (outside filesystem scope beyond this one field, per spec.md §1).
const VMS_CRC_FIELD_OFFSET: usize = 0x46;

fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str, t: FileType) -> FileProperties {
        FileProperties {
            file_name: name.to_string(),
            file_type: t,
            copy_protect: CopyProtect::Ok,
        }
    }

    #[test]
    fn data_file_round_trips() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let (idx, entry) = dev.file_create(&props("HELLO   .DAT", FileType::Data), &data).unwrap();
        assert_eq!(entry.first_block, 199);
        assert_eq!(dev.fat_entry(199), 198);
        assert_eq!(dev.fat_entry(198), LAST_IN_FILE);

        let mut out = vec![0u8; 1000];
        let n = dev.file_read(&entry, &mut out, 0, true);
        assert_eq!(n, 1000);
        assert_eq!(out, data);

        let freed = dev.file_delete(idx);
        assert_eq!(freed, 2);
        assert_eq!(dev.mem_usage().blocks_free, 200);
    }

    #[test]
    fn game_file_allocates_ascending_and_skips_header() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let data = vec![0xABu8; BLOCK_SIZE * 5];
        let (_idx, entry) = dev.file_create(&props("GAME.BIN    ", FileType::Game), &data).unwrap();
        assert_eq!(entry.first_block, 0);
        assert_eq!(dev.fat_entry(0), 1);
        assert_eq!(dev.fat_entry(1), 2);
        assert_eq!(dev.fat_entry(4), LAST_IN_FILE);
        assert_eq!(entry.header_offset, 1);

        let mut out = vec![0u8; BLOCK_SIZE * 4];
        let n = dev.file_read(&entry, &mut out, 0, false);
        assert_eq!(n, BLOCK_SIZE * 4);
        assert!(out.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn game_duplicate_is_rejected() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        dev.file_create(&props("GAME1       ", FileType::Game), &[0u8; BLOCK_SIZE])
            .unwrap();
        let err = dev
            .file_create(&props("GAME2       ", FileType::Game), &[0u8; BLOCK_SIZE])
            .unwrap_err();
        assert_eq!(err, Error::GameDuplicate);
    }

    #[test]
    fn create_failure_leaves_card_unchanged() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let before = dev.mem_usage();
        let huge = vec![0u8; BLOCK_SIZE * 1000];
        let err = dev
            .file_create(&props("TOOBIG      ", FileType::Data), &huge)
            .unwrap_err();
        assert!(matches!(err, Error::InadequateFreeBlocks { .. }));
        assert_eq!(dev.mem_usage(), before);
        assert_eq!(dev.file_count(), 0);
    }
}
