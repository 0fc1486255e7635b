//! `.dci`: a 32-byte dir-entry header, concatenated with the file payload
//! padded to the next 4-byte boundary, the whole thing word-swapped.

use std::path::Path;

use crate::codec::word_swap;
use crate::device::{VmuDevice, DIR_ENTRY_SIZE};
use crate::directory::{DirEntry, EXTRA_BG_PVR_NAME, ICONDATA_VMS_NAME};
use crate::error::{Error, VmuResult};
use crate::file::FileProperties;

fn padded_len(n: usize) -> usize {
    n.div_ceil(4) * 4
}

impl VmuDevice {
    /// Import a `.dci` file and `file_create` it on `self`.
    pub fn load_image_dci(&mut self, path: impl AsRef<Path>) -> VmuResult<()> {
        let mut bytes = std::fs::read(path.as_ref())
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))?;
        if bytes.len() < DIR_ENTRY_SIZE || !bytes.len().is_multiple_of(4) {
            return Err(Error::ReadFailed(format!(
                "{} is {} bytes, not a valid word-swapped .dci image",
                path.as_ref().display(),
                bytes.len()
            )));
        }
        word_swap(&mut bytes);
        let header = DirEntry::from_bytes(&bytes[..DIR_ENTRY_SIZE]);
        let payload_len = padded_len(header.file_size as usize * 512).min(bytes.len() - DIR_ENTRY_SIZE);
        let data = &bytes[DIR_ENTRY_SIZE..DIR_ENTRY_SIZE + payload_len];

        let name = header.name_str();
        if (name == ICONDATA_VMS_NAME && self.dir_find_icondata().is_some())
            || (name == EXTRA_BG_PVR_NAME && self.dir_find_extra_bg_pvr().is_some())
        {
            return Err(Error::NameDuplicate(name));
        }

        let properties = FileProperties {
            file_name: name,
            file_type: header.file_type(),
            copy_protect: header.copy_protect(),
        };
        self.file_create(&properties, data)?;
        Ok(())
    }

    /// Export `entry`'s dir-entry header plus its full contents (including
    /// header block) as a `.dci` file.
    pub fn export_dci(&self, entry: &DirEntry, path: impl AsRef<Path>) -> VmuResult<()> {
        let total = entry.file_size as usize * 512;
        let mut data = vec![0u8; total];
        self.file_read(entry, &mut data, 0, true);

        let mut out = entry.to_bytes().to_vec();
        out.resize(DIR_ENTRY_SIZE + padded_len(total), 0);
        out[DIR_ENTRY_SIZE..DIR_ENTRY_SIZE + total].copy_from_slice(&data);
        word_swap(&mut out);

        std::fs::write(path.as_ref(), &out)
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))
    }
}
