use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn minimal_img_8x1_black() -> Vec<u8> {
    let mut b = Vec::new();
    b.extend_from_slice(b"Playdate IMG");
    b.extend_from_slice(&0u32.to_le_bytes()); // uncompressed file flags
    b.extend_from_slice(&8u16.to_le_bytes()); // width
    b.extend_from_slice(&1u16.to_le_bytes()); // height
    b.extend_from_slice(&1u16.to_le_bytes()); // stride
    b.extend_from_slice(&0u16.to_le_bytes()); // clip_l
    b.extend_from_slice(&0u16.to_le_bytes()); // clip_r
    b.extend_from_slice(&0u16.to_le_bytes()); // clip_t
    b.extend_from_slice(&0u16.to_le_bytes()); // clip_b
    b.extend_from_slice(&0u16.to_le_bytes()); // image flags
    b.push(0x00); // all-black row, 8 bits
    b
}

#[test]
fn img_subcommand_writes_png() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("icon.pdi");
    fs::write(&input, minimal_img_8x1_black()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_pdtool"))
        .arg("img")
        .arg(&input)
        .output()
        .expect("run pdtool img");

    assert!(output.status.success(), "{:?}", output);

    let png_path = dir.path().join("icon.png");
    let bytes = fs::read(&png_path).expect("png output written");
    assert_eq!(&bytes[0..8], b"\x89PNG\r\n\x1a\n");
}
