use super::*;

#[test]
fn rng_is_deterministic_and_in_unit_range() {
    let mut a = Rng64::new(7);
    let mut b = Rng64::new(7);
    for _ in 0..64 {
        let x = a.next_f64_01();
        assert_eq!(x, b.next_f64_01());
        assert!((0.0..1.0).contains(&x));
    }
}

#[test]
fn hsv_roundtrip_primary_colors() {
    for (r, g, b) in [
        (1.0, 0.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
        (0.2, 0.4, 0.6),
    ] {
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (r2, g2, b2) = hsv_to_rgb(h, s, v);
        assert!((r - r2).abs() < 1e-9);
        assert!((g - g2).abs() < 1e-9);
        assert!((b - b2).abs() < 1e-9);
    }
}

#[test]
fn hsv_gray_has_zero_hue_and_saturation() {
    assert_eq!(rgb_to_hsv(0.5, 0.5, 0.5), (0.0, 0.0, 0.5));
    let (h, _, _) = rgb_to_hsv(0.0, 0.0, 1.0);
    assert!((h - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn clean_name_replaces_path_characters() {
    assert_eq!(clean_name("Body/Mat 01"), "Body_Mat_01");
    assert_eq!(clean_name("Mat.001"), "Mat.001");
}

#[test]
fn luminance_weights_sum_to_one() {
    assert!((luminance([1.0, 1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
}
