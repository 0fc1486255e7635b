use vmufs::{CopyProtect, FileProperties, FileType, VmuDevice};

fn data_props(name: &str) -> FileProperties {
    FileProperties {
        file_name: name.to_string(),
        file_type: FileType::Data,
        copy_protect: CopyProtect::Ok,
    }
}

#[test]
fn create_read_delete_restores_free_blocks() {
    let mut dev = VmuDevice::new();
    dev.format_default().unwrap();
    let before = dev.mem_usage();

    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();
    let (idx, entry) = dev.file_create(&data_props("BIGSAVE     "), &payload).unwrap();
    assert_eq!(entry.file_size as usize, payload.len().div_ceil(512));

    let mut out = vec![0u8; payload.len()];
    let n = dev.file_read(&entry, &mut out, 0, true);
    assert_eq!(n, payload.len());
    assert_eq!(out, payload);

    let freed = dev.file_delete(idx);
    assert_eq!(freed, entry.file_size as usize);
    assert_eq!(dev.mem_usage(), before);
}

#[test]
fn partial_read_honors_offset_and_length() {
    let mut dev = VmuDevice::new();
    dev.format_default().unwrap();
    let payload: Vec<u8> = (0..512u32).map(|i| i as u8).collect();
    let (_idx, entry) = dev.file_create(&data_props("OFFSET      "), &payload).unwrap();

    let mut out = vec![0u8; 10];
    let n = dev.file_read(&entry, &mut out, 100, true);
    assert_eq!(n, 10);
    assert_eq!(out, payload[100..110]);
}

#[test]
fn filesystem_rejects_a_second_game_file() {
    let mut dev = VmuDevice::new();
    dev.format_default().unwrap();
    let game_props = FileProperties {
        file_name: "FIRSTGAME   ".to_string(),
        file_type: FileType::Game,
        copy_protect: CopyProtect::Ok,
    };
    dev.file_create(&game_props, &[0u8; 512]).unwrap();

    let second = FileProperties {
        file_name: "SECONDGAME  ".to_string(),
        ..game_props
    };
    let err = dev.file_create(&second, &[0u8; 512]).unwrap_err();
    assert_eq!(err, vmufs::Error::GameDuplicate);
    assert_eq!(dev.last_error_message(), err.to_string());
}
