//! `.bin` / `.vmu`: raw 128 KiB flash image, byte-identical to `dev.flash`.

use std::path::Path;

use crate::device::{VmuDevice, FLASH_SIZE};
use crate::error::{Error, VmuResult};

impl VmuDevice {
    /// Load a raw 128 KiB flash image from `path`. Short reads are a
    /// failure, not a silently-accepted partial image.
    pub fn load_image_bin(path: impl AsRef<Path>) -> VmuResult<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))?;
        if bytes.len() != FLASH_SIZE {
            return Err(Error::ReadFailed(format!(
                "{} is {} bytes, expected {}",
                path.as_ref().display(),
                bytes.len(),
                FLASH_SIZE
            )));
        }
        let mut flash = [0u8; FLASH_SIZE];
        flash.copy_from_slice(&bytes);
        let dev = VmuDevice::from_flash(flash);
        if !dev.check_formatted() {
            return Err(Error::FlashUnformatted);
        }
        Ok(dev)
    }

    pub fn export_image_bin(&self, path: impl AsRef<Path>) -> VmuResult<()> {
        std::fs::write(path.as_ref(), &self.flash()[..])
            .map_err(|e| Error::OpenFailed(format!("{}: {}", path.as_ref().display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_file() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.vmu");
        dev.export_image_bin(&path).unwrap();
        let reloaded = VmuDevice::load_image_bin(&path).unwrap();
        assert_eq!(reloaded.flash(), dev.flash());
    }

    #[test]
    fn short_file_is_read_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let err = VmuDevice::load_image_bin(&path).unwrap_err();
        assert!(matches!(err, Error::ReadFailed(_)));
    }

    #[test]
    fn unformatted_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.bin");
        std::fs::write(&path, vec![0u8; FLASH_SIZE]).unwrap();
        let err = VmuDevice::load_image_bin(&path).unwrap_err();
        assert!(matches!(err, Error::FlashUnformatted));
    }
}
