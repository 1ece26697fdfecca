use super::*;

#[test]
fn resolution_parses_width_height_pair() {
    let r: Resolution = "1280-720".parse().unwrap();
    assert_eq!(r.width, 1280);
    assert_eq!(r.height, 720);
    assert_eq!(r.to_string(), "1280-720");
}

#[test]
fn resolution_single_value_broadcasts_to_square() {
    let r: Resolution = "512".parse().unwrap();
    assert_eq!(r, Resolution::new(512, 512).unwrap());
}

#[test]
fn resolution_rejects_garbage() {
    assert!("".parse::<Resolution>().is_err());
    assert!("12x12".parse::<Resolution>().is_err());
    assert!("1-2-3".parse::<Resolution>().is_err());
    assert!("0-10".parse::<Resolution>().is_err());
}

#[test]
fn frame_file_names_are_zero_padded() {
    assert_eq!(FrameIndex(7).file_name(4), "0007.jpg");
    assert_eq!(FrameIndex(249).file_name(5), "00249.jpg");
}

#[test]
fn to_rgb8_clamps_out_of_range_values() {
    let f = RgbFrame::new(1, 2, vec![-0.5, 0.0, 0.5, 1.0, 2.0, f32::NAN]).unwrap();
    assert_eq!(f.to_rgb8(), vec![0, 0, 128, 255, 255, 0]);
}

#[test]
fn frame_rejects_wrong_buffer_length() {
    assert!(RgbFrame::new(2, 2, vec![0.0; 11]).is_err());
}
