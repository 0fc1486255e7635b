//! `.vmi` + `.vms`: a fixed-size binary sidecar describing a file, paired
//! with a raw `.vms` payload. Only the fields the filesystem needs (the
//! 12-byte declared file name, mode, size, the paired resource name used to
//! locate the `.vms` file, timestamp) are modelled; the rest of the real VMI
//! layout is outside this engine's concern.

use std::path::{Path, PathBuf};

use binrw::{BinRead, BinWrite};
use std::io::Cursor;

use crate::device::{VmuDevice, BLOCK_SIZE};
use crate::directory::{CopyProtect, DirEntry, FileType, EXTRA_BG_PVR_NAME, ICONDATA_VMS_NAME};
use crate::error::{Error, VmuResult};
use crate::file::FileProperties;

const VMI_SIZE: usize = 108;

#[derive(BinRead, BinWrite, Debug, Clone)]
#[brw(little)]
struct VmiHeader {
    checksum: u32,
    description: [u8; 32],
    copyright: [u8; 32],
    vms_resource_name: [u8; 8],
    file_name: [u8; 12],
    file_number: u16,
    /// bit0: 0 = DATA, 1 = GAME. bit1: 0 = OK, 1 = PROTECTED.
    file_mode: u16,
    unused: u16,
    file_size_bytes: u32,
    timestamp: [u8; 8],
    reserved: [u8; 2],
}

impl VmiHeader {
    fn from_bytes(buf: &[u8; VMI_SIZE]) -> Self {
        let mut cursor = Cursor::new(&buf[..]);
        VmiHeader::read(&mut cursor).expect("VMI header is fixed size, cannot fail to parse")
    }

    fn to_bytes(&self) -> [u8; VMI_SIZE] {
        let mut cursor = Cursor::new(vec![0u8; VMI_SIZE]);
        self.write(&mut cursor)
            .expect("VMI header is fixed size, cannot fail to serialize");
        cursor.into_inner().try_into().unwrap()
    }

    fn file_type(&self) -> FileType {
        if self.file_mode & 0x1 != 0 {
            FileType::Game
        } else {
            FileType::Data
        }
    }

    fn copy_protect(&self) -> CopyProtect {
        if self.file_mode & 0x2 != 0 {
            CopyProtect::Protected
        } else {
            CopyProtect::Ok
        }
    }

    /// Name used to locate the paired `.vms` payload on the host filesystem.
    fn resource_name(&self) -> String {
        String::from_utf8_lossy(&self.vms_resource_name)
            .trim_end_matches('\0')
            .trim_end()
            .to_string()
    }

    /// Declared 12-byte file name, stored on the card. May differ from the
    /// resource name used to find the `.vms` file.
    fn declared_name(&self) -> String {
        String::from_utf8_lossy(&self.file_name)
            .trim_end_matches('\0')
            .trim_end()
            .to_string()
    }
}

fn sibling_vms_path(vmi_path: &Path, resource_name: &str) -> PathBuf {
    let parent = vmi_path.parent().unwrap_or_else(|| Path::new("."));
    if !resource_name.is_empty() {
        let candidate = parent.join(format!("{}.VMS", resource_name));
        if candidate.exists() {
            return candidate;
        }
        let candidate = parent.join(format!("{}.vms", resource_name));
        if candidate.exists() {
            return candidate;
        }
    }
    vmi_path.with_extension("vms")
}

impl VmuDevice {
    /// Parse the VMI sidecar at `vmi_path`, load the paired `.vms` payload,
    /// and `file_create` it on `self`.
    pub fn load_image_vmi(&mut self, vmi_path: impl AsRef<Path>) -> VmuResult<()> {
        let vmi_path = vmi_path.as_ref();
        let vmi_bytes = std::fs::read(vmi_path)
            .map_err(|e| Error::OpenFailed(format!("{}: {}", vmi_path.display(), e)))?;
        if vmi_bytes.len() != VMI_SIZE {
            return Err(Error::ReadFailed(format!(
                "{} is {} bytes, expected {}",
                vmi_path.display(),
                vmi_bytes.len(),
                VMI_SIZE
            )));
        }
        let mut buf = [0u8; VMI_SIZE];
        buf.copy_from_slice(&vmi_bytes);
        let header = VmiHeader::from_bytes(&buf);

        let vms_path = sibling_vms_path(vmi_path, &header.resource_name());
        if !vms_path.exists() {
            return Err(Error::VmiNoVms(vmi_path.display().to_string()));
        }
        let data = std::fs::read(&vms_path)
            .map_err(|e| Error::ReadFailed(format!("{}: {}", vms_path.display(), e)))?;

        let name = header.declared_name();
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
        self.file_create(&properties, &data)?;
        Ok(())
    }

    /// Write `entry`'s raw contents to `vms_path` and a matching `.vmi`
    /// sidecar to `vmi_path`.
    pub fn export_vmi(
        &self,
        entry: &DirEntry,
        vmi_path: impl AsRef<Path>,
        vms_path: impl AsRef<Path>,
    ) -> VmuResult<()> {
        let total = entry.file_size as usize * BLOCK_SIZE;
        let mut data = vec![0u8; total];
        self.file_read(entry, &mut data, 0, true);
        std::fs::write(vms_path.as_ref(), &data)
            .map_err(|e| Error::OpenFailed(format!("{}: {}", vms_path.as_ref().display(), e)))?;

        let mut vms_resource_name = [0u8; 8];
        let name = entry.name_str();
        for (i, b) in name.as_bytes().iter().take(8).enumerate() {
            vms_resource_name[i] = *b;
        }
        let mut file_name = [0u8; 12];
        for (i, b) in name.as_bytes().iter().take(12).enumerate() {
            file_name[i] = *b;
        }
        let mut file_mode = 0u16;
        if entry.file_type() == FileType::Game {
            file_mode |= 0x1;
        }
        if entry.copy_protect() == CopyProtect::Protected {
            file_mode |= 0x2;
        }
        let header = VmiHeader {
            checksum: 0,
            description: [0; 32],
            copyright: [0; 32],
            vms_resource_name,
            file_name,
            file_number: 1,
            file_mode,
            unused: 0,
            file_size_bytes: total as u32,
            timestamp: entry.timestamp,
            reserved: [0; 2],
        };
        std::fs::write(vmi_path.as_ref(), header.to_bytes())
            .map_err(|e| Error::OpenFailed(format!("{}: {}", vmi_path.as_ref().display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_data_file() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let data = vec![0x7Eu8; BLOCK_SIZE];
        let (_idx, entry) = dev
            .file_create(
                &FileProperties {
                    file_name: "SAVEDATA".to_string(),
                    file_type: FileType::Data,
                    copy_protect: CopyProtect::Ok,
                },
                &data,
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let vmi_path = dir.path().join("SAVEDATA.VMI");
        let vms_path = dir.path().join("SAVEDATA.VMS");
        dev.export_vmi(&entry, &vmi_path, &vms_path).unwrap();

        let mut reloaded = VmuDevice::new();
        reloaded.format_default().unwrap();
        reloaded.load_image_vmi(&vmi_path).unwrap();
        assert_eq!(reloaded.file_count(), 1);
        let (_, reentry) = reloaded.dir_find("SAVEDATA").unwrap();
        let mut out = vec![0u8; data.len()];
        reloaded.file_read(&reentry, &mut out, 0, true);
        assert_eq!(out, data);
    }

    #[test]
    fn missing_vms_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let vmi_path = dir.path().join("ORPHAN.VMI");
        let header = VmiHeader {
            checksum: 0,
            description: [0; 32],
            copyright: [0; 32],
            vms_resource_name: *b"ORPHAN\0\0",
            file_name: *b"ORPHAN\0\0\0\0\0\0",
            file_number: 1,
            file_mode: 0,
            unused: 0,
            file_size_bytes: 0,
            timestamp: [0; 8],
            reserved: [0; 2],
        };
        std::fs::write(&vmi_path, header.to_bytes()).unwrap();

        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        let err = dev.load_image_vmi(&vmi_path).unwrap_err();
        assert!(matches!(err, Error::VmiNoVms(_)));
    }

    #[test]
    fn declared_name_can_differ_from_resource_name() {
        let dir = tempfile::tempdir().unwrap();
        let vmi_path = dir.path().join("RES.VMI");
        let vms_path = dir.path().join("RES.VMS");
        std::fs::write(&vms_path, vec![0x11u8; BLOCK_SIZE]).unwrap();
        let header = VmiHeader {
            checksum: 0,
            description: [0; 32],
            copyright: [0; 32],
            vms_resource_name: *b"RES\0\0\0\0\0",
            file_name: *b"LONGNAME.DAT",
            file_number: 1,
            file_mode: 0,
            unused: 0,
            file_size_bytes: BLOCK_SIZE as u32,
            timestamp: [0; 8],
            reserved: [0; 2],
        };
        std::fs::write(&vmi_path, header.to_bytes()).unwrap();

        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        dev.load_image_vmi(&vmi_path).unwrap();
        assert!(dev.dir_find("LONGNAME.DAT").is_some());
        assert!(dev.dir_find("RES").is_none());
    }

    #[test]
    fn duplicate_icondata_is_rejected() {
        let mut dev = VmuDevice::new();
        dev.format_default().unwrap();
        dev.file_create(
            &FileProperties {
                file_name: ICONDATA_VMS_NAME.to_string(),
                file_type: FileType::Data,
                copy_protect: CopyProtect::Ok,
            },
            &vec![0u8; BLOCK_SIZE],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let vmi_path = dir.path().join("ICONDATA.VMI");
        let vms_path = dir.path().join("ICONDATA.VMS");
        std::fs::write(&vms_path, vec![0u8; BLOCK_SIZE]).unwrap();
        let header = VmiHeader {
            checksum: 0,
            description: [0; 32],
            copyright: [0; 32],
            vms_resource_name: *b"ICONDATA",
            file_name: *b"ICONDATA.VMS",
            file_number: 1,
            file_mode: 0,
            unused: 0,
            file_size_bytes: BLOCK_SIZE as u32,
            timestamp: [0; 8],
            reserved: [0; 2],
        };
        std::fs::write(&vmi_path, header.to_bytes()).unwrap();

        let err = dev.load_image_vmi(&vmi_path).unwrap_err();
        assert!(matches!(err, Error::NameDuplicate(_)));
    }
}
