//! `.dcm`: the entire 128 KiB flash image, word-swapped. No use of the file
//! engine; this is a raw transform of `dev.flash`.

use std::path::Path;

use crate::codec::word_swap;
use crate::device::{VmuDevice, FLASH_SIZE};
use crate::error::{Error, VmuResult};

impl VmuDevice {
    pub fn load_image_dcm(path: impl AsRef<Path>) -> VmuResult<Self> {
        let mut bytes = std::fs::read(path.as_ref())
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))?;
        if bytes.len() != FLASH_SIZE {
            return Err(Error::ReadFailed(format!(
                "{} is {} bytes, expected {}",
                path.as_ref().display(),
                bytes.len(),
                FLASH_SIZE
            )));
        }
        word_swap(&mut bytes);
        let mut flash = [0u8; FLASH_SIZE];
        flash.copy_from_slice(&bytes);
        let dev = VmuDevice::from_flash(flash);
        if !dev.check_formatted() {
            return Err(Error::FlashUnformatted);
        }
        Ok(dev)
    }

    pub fn export_image_dcm(&self, path: impl AsRef<Path>) -> VmuResult<()> {
        let mut bytes = self.flash().to_vec();
        word_swap(&mut bytes);
        std::fs::write(path.as_ref(), &bytes)
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))
    }
}
