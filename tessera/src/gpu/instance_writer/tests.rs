use super::{FLAG_TEXTURED, INSTANCE_STRIDE, InstanceWriter};

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_ne_bytes(raw)
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_ne_bytes(raw)
}

#[test]
fn each_push_adds_one_stride() {
    let mut w = InstanceWriter::new();
    assert!(w.is_empty());
    w.push_rect(0.0, 0.0, 1.0, 1.0, [1.0; 4]);
    w.push_glyph([0.0; 2], [1.0; 2], [0.0; 2], [0.5; 2], [1.0; 4]);
    w.push_image(0.0, 0.0, 4.0, 4.0, [1.0; 4]);
    assert_eq!(w.count(), 3);
    assert_eq!(w.as_bytes().len(), 3 * INSTANCE_STRIDE as usize);
}

#[test]
fn rect_fill_is_premultiplied() {
    let mut w = InstanceWriter::new();
    w.push_rect(3.0, 4.0, 10.0, 20.0, [1.0, 0.5, 0.0, 0.5]);
    let b = w.as_bytes();
    assert_eq!(f32_at(b, 0), 3.0);
    assert_eq!(f32_at(b, 4), 4.0);
    assert_eq!(f32_at(b, 8), 10.0);
    assert_eq!(f32_at(b, 12), 20.0);
    assert_eq!(f32_at(b, 48), 0.5);
    assert_eq!(f32_at(b, 52), 0.25);
    assert_eq!(f32_at(b, 60), 0.5);
    assert_eq!(u32_at(b, 64), 0);
}

#[test]
fn image_spans_whole_texture() {
    let mut w = InstanceWriter::new();
    w.push_image(0.0, 0.0, 8.0, 8.0, [1.0; 4]);
    let b = w.as_bytes();
    assert_eq!(f32_at(b, 16), 0.0);
    assert_eq!(f32_at(b, 24), 1.0);
    assert_eq!(f32_at(b, 28), 1.0);
    assert_eq!(u32_at(b, 64), FLAG_TEXTURED);
}

#[test]
fn append_concatenates_and_clear_empties() {
    let mut a = InstanceWriter::new();
    a.push_rect(1.0, 0.0, 1.0, 1.0, [1.0; 4]);
    let mut b = InstanceWriter::new();
    b.push_rect(2.0, 0.0, 1.0, 1.0, [1.0; 4]);
    b.push_rect(3.0, 0.0, 1.0, 1.0, [1.0; 4]);

    a.append(&b);
    assert_eq!(a.count(), 3);
    assert_eq!(f32_at(a.as_bytes(), 2 * INSTANCE_STRIDE as usize), 3.0);

    a.clear();
    assert!(a.is_empty());
    assert_eq!(a.count(), 0);
}
