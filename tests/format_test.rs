use vmufs::VmuDevice;

#[test]
fn fresh_card_has_200_free_blocks() {
    let mut dev = VmuDevice::new();
    dev.format_default().unwrap();
    assert!(dev.check_formatted());
    assert_eq!(dev.mem_usage().blocks_free, 200);
    assert_eq!(dev.file_count(), 0);
    assert_eq!(dev.last_error_message(), "");
}

#[test]
fn oversized_geometry_is_rejected() {
    let mut dev = VmuDevice::new();
    let mut root = vmufs::RootBlock::sega_default();
    root.user_size = 300;
    let err = dev.format(&root).unwrap_err();
    assert_eq!(dev.last_error_message(), err.to_string());
}
