use tessera_core::WidgetError;
use tessera_core::cell::Rgb;

use super::parse_panel_color;

#[test]
fn opaque_color() {
    let (rgb, alpha) = parse_panel_color("#102030").unwrap();
    assert_eq!(rgb, Rgb { r: 0x10, g: 0x20, b: 0x30 });
    assert_eq!(alpha, 1.0);
}

#[test]
fn color_with_alpha() {
    let (rgb, alpha) = parse_panel_color("ff0000/0.25").unwrap();
    assert_eq!(rgb, Rgb { r: 255, g: 0, b: 0 });
    assert_eq!(alpha, 0.25);
}

#[test]
fn malformed_payloads_are_payload_errors() {
    for bad in ["", "red", "#12345", "#123456/2", "#123456/x"] {
        let err = parse_panel_color(bad).unwrap_err();
        assert!(matches!(err, WidgetError::Payload(_)), "{bad}: {err:?}");
    }
}
