use super::*;
use rand::SeedableRng as _;

fn t(values: &[f32]) -> ImageParams {
    ImageParams::new(vec![1, 1, 1, values.len(), 1], values.to_vec()).unwrap()
}

#[test]
fn new_rejects_mismatched_shape() {
    assert!(ImageParams::new(vec![2, 2], vec![0.0; 3]).is_err());
    assert!(ImageParams::new(vec![], vec![]).is_err());
}

#[test]
fn arithmetic_is_elementwise() {
    let a = t(&[1.0, 2.0, 3.0]);
    let b = t(&[0.5, 0.5, -1.0]);
    assert_eq!(a.sub(&b).unwrap().to_vec().unwrap(), vec![0.5, 1.5, 4.0]);
    assert_eq!(
        a.add_scaled(&b, 2.0).unwrap().to_vec().unwrap(),
        vec![2.0, 3.0, 1.0]
    );
    assert_eq!(
        a.blend(0.5, &b, 0.5).unwrap().to_vec().unwrap(),
        vec![0.75, 1.25, 1.0]
    );
    assert_eq!(a.sub(&b).unwrap().shape(), &[1, 1, 1, 3, 1]);
}

#[test]
fn shape_mismatch_is_rejected() {
    let a = t(&[1.0, 2.0]);
    let b = t(&[1.0, 2.0, 3.0]);
    assert!(a.sub(&b).is_err());
    assert!(a.blend(1.0, &b, 1.0).is_err());
}

#[test]
fn from_tensor_copies_values_and_shape() {
    let var = candle_core::Var::from_tensor(t(&[1.0, -2.0]).tensor()).unwrap();
    let snap = ImageParams::from_tensor(var.as_tensor()).unwrap();
    var.set(t(&[9.0, 9.0]).tensor()).unwrap();
    assert_eq!(snap, t(&[1.0, -2.0]));
}

#[test]
fn serde_keeps_the_shape_and_data_layout() {
    let p = ImageParams::new(vec![1, 2, 1, 2, 1], vec![0.5, 1.0, -1.0, 2.0]).unwrap();
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["shape"], serde_json::json!([1, 2, 1, 2, 1]));
    assert_eq!(json["data"], serde_json::json!([0.5, 1.0, -1.0, 2.0]));
    let back: ImageParams = serde_json::from_value(json).unwrap();
    assert_eq!(back, p);

    let bad = serde_json::json!({"shape": [3], "data": [1.0]});
    assert!(serde_json::from_value::<ImageParams>(bad).is_err());
}

#[test]
fn non_finite_values_are_detected() {
    assert!(t(&[1.0, 2.0]).is_finite().unwrap());
    assert!(!t(&[1.0, f32::NAN]).is_finite().unwrap());
    assert!(!t(&[f32::INFINITY]).is_finite().unwrap());
}

#[test]
fn noise_covers_only_interior_axes() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let noise = NoiseField::sample(&[1, 3, 4, 5, 2], 0.02, &mut rng).unwrap();
    assert_eq!((noise.rows, noise.cols), (4, 5));
    assert_eq!(noise.tensor().dims(), &[4, 5]);
    let values = noise.to_vec().unwrap();
    assert!(values.iter().any(|v| *v != 0.0));
    assert!(values.iter().all(|v| v.abs() < 0.2));
}

#[test]
fn noise_needs_four_axes() {
    let params = ImageParams::zeros(vec![3, 3]).unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    assert!(NoiseField::sample(params.shape(), 1.0, &mut rng).is_err());
}
