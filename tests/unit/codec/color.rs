use super::*;

#[test]
fn pack_unpack_round_trips_every_color() {
    for r in 0..=255u8 {
        for g in 0..=255u8 {
            for b in 0..=255u8 {
                let packed = pack_rgb(r, g, b);
                assert_eq!(unpack_rgb(packed), HexColor::new(r, g, b));
                assert_eq!(unpack_buffer_color(packed as f32), HexColor::new(r, g, b));
            }
        }
    }
}

#[test]
fn every_channel_value_renders_zero_padded_lowercase_hex() {
    for v in 0..=255u8 {
        let hex = format!("{v:02x}");
        assert_eq!(unpack_rgb(pack_rgb(v, 0, 0)).to_string(), format!("#{hex}0000"));
        assert_eq!(unpack_rgb(pack_rgb(0, v, 0)).to_string(), format!("#00{hex}00"));
        assert_eq!(unpack_rgb(pack_rgb(0, 0, v)).to_string(), format!("#0000{hex}"));
        assert_eq!(
            unpack_rgb(pack_rgb(v, 255 - v, v)).to_string(),
            format!("#{hex}{:02x}{hex}", 255 - v)
        );
    }
}

#[test]
fn buffer_colors_are_exact_in_f32() {
    // 24-bit integers are exactly representable as f32
    let packed = pack_rgb(0xff, 0x00, 0xcc);
    assert_eq!(unpack_buffer_color(packed as f32).to_string(), "#ff00cc");
    assert_eq!(unpack_buffer_color(16_777_215.0).to_string(), "#ffffff");
    assert_eq!(unpack_buffer_color(0.0).to_string(), "#000000");
}

#[test]
fn high_bits_are_masked() {
    assert_eq!(unpack_rgb(0x01_12_34_56).to_string(), "#123456");
}

#[test]
fn parse_accepts_optional_hash_and_rejects_garbage() {
    assert_eq!(HexColor::parse("#0a0B0c").unwrap(), HexColor::new(10, 11, 12));
    assert_eq!(HexColor::parse("ffffff").unwrap(), HexColor::new(255, 255, 255));
    assert!(HexColor::parse("#fff").is_err());
    assert!(HexColor::parse("#gg0000").is_err());
    assert_eq!(HexColor::parse_or_black("red"), HexColor::BLACK);
}

#[test]
fn serde_uses_hex_strings() {
    let c = HexColor::new(0x12, 0xab, 0x00);
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#12ab00\"");
    let back: HexColor = serde_json::from_str("\"#12ab00\"").unwrap();
    assert_eq!(back, c);
    assert!(serde_json::from_str::<HexColor>("\"nope\"").is_err());
}
