//! ## Defragmenter
//!
//! Snapshot/delete-all/reinstall/rollback transaction, grounded on
//! `fs::prodos::Disk`'s pattern of staging destructive writes against a
//! scratch copy before committing. No partial state is ever observable from
//! outside `defragment`.

use crate::device::VmuDevice;
use crate::error::{Error, VmuResult};
use crate::file::FileProperties;

impl VmuDevice {
    /// Delete and reinstall every file so GAME/DATA allocations are packed
    /// against their respective ends of the user area again. If
    /// `new_user_size` is `Some`, the root's `user_size` is updated as part
    /// of the same transaction. Fully succeeds or leaves the card bit-for-bit
    /// as it was.
    pub fn defragment(&mut self, new_user_size: Option<u16>) -> VmuResult<()> {
        let snapshot = *self.flash();
        let snapshot_dev = VmuDevice::from_flash(snapshot);

        let n = self.file_count();
        let mut entries = Vec::with_capacity(n);
        for k in 0..n {
            if let Some((idx, entry)) = self.file_at_index(k) {
                entries.push((idx, entry));
            }
        }

        let original_blocks_used = self.mem_usage().blocks_used;
        let mut freed_total = 0usize;
        for (idx, entry) in &entries {
            let freed = self.file_delete(*idx);
            if freed == 0 {
                log::warn!("defragment: delete of dir index {} freed no blocks, rolling back", idx);
                self.restore_flash(&snapshot);
                return Err(self.record_error(Error::DefragFailed(entry.file_size as usize)));
            }
            freed_total += freed;
        }

        if self.file_count() != 0
            || freed_total != original_blocks_used
            || self.mem_usage().blocks_free < freed_total
        {
            log::warn!("defragment: post-delete verification failed, rolling back");
            self.restore_flash(&snapshot);
            return Err(self.record_error(Error::DefragFailed(freed_total)));
        }

        if let Some(user_size) = new_user_size {
            let mut root = self.root();
            root.user_size = user_size;
            self.write_root(&root);
        }

        for (_, snap_entry) in &entries {
            let total_bytes = snap_entry.file_size as usize * crate::device::BLOCK_SIZE;
            let mut data = vec![0u8; total_bytes];
            snapshot_dev.file_read(snap_entry, &mut data, 0, true);
            let properties = FileProperties {
                file_name: snap_entry.name_str(),
                file_type: snap_entry.file_type(),
                copy_protect: snap_entry.copy_protect(),
            };
            if self.file_create(&properties, &data).is_err() {
                log::warn!("defragment: reinstall of {:?} failed, rolling back", properties.file_name);
                self.restore_flash(&snapshot);
                return Err(self.record_error(Error::DefragFailed(total_bytes)));
            }
        }

        if self.file_count() != n || self.mem_usage().blocks_used != original_blocks_used {
            log::warn!("defragment: post-reinstall verification failed, rolling back");
            self.restore_flash(&snapshot);
            return Err(self.record_error(Error::DefragFailed(n)));
        }

        log::debug!("defragment: reinstalled {} files", n);
        Ok(())
    }
}
