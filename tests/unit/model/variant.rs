use super::*;

#[test]
fn table_order_matches_variants() {
    for v in ModelVariant::ALL {
        assert_eq!(v.name().parse::<ModelVariant>().unwrap(), v);
    }
}

#[test]
fn lookup_is_exact() {
    assert!("rn50".parse::<ModelVariant>().is_err());
    assert!("RN5".parse::<ModelVariant>().is_err());
    assert!("xRN50".parse::<ModelVariant>().is_err());
    assert_eq!("RN50x4".parse::<ModelVariant>().unwrap(), ModelVariant::Rn50x4);
}

#[test]
fn sample_scaling_follows_table() {
    assert_eq!(ModelVariant::VitB32.effective_samples(200), 200);
    assert_eq!(ModelVariant::Rn50.effective_samples(200), 100);
    assert_eq!(ModelVariant::Rn50x4.effective_samples(200), 32);
    assert_eq!(ModelVariant::Rn101.effective_samples(200), 66);
    assert_eq!(ModelVariant::Rn50x4.effective_samples(1), 1);
}

#[test]
fn only_resnet_variants_tag_outputs() {
    assert_eq!(ModelVariant::VitB32.output_suffix(), None);
    assert_eq!(ModelVariant::Rn101.output_suffix(), Some("RN101"));
    assert_eq!(ModelVariant::Rn50x4.input_size(), 288);
    assert_eq!(ModelVariant::VitB32.input_size(), 224);
}

#[test]
fn serde_uses_model_names() {
    let s = serde_json::to_string(&ModelVariant::VitB32).unwrap();
    assert_eq!(s, "\"ViT-B/32\"");
    let v: ModelVariant = serde_json::from_str("\"RN101\"").unwrap();
    assert_eq!(v, ModelVariant::Rn101);
}
