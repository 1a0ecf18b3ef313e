use mesh_adapt::adapt::{AdaptOpts, Verbosity};
use mesh_adapt::mesh_error::MeshAdaptError;

#[test]
fn missing_fields_take_defaults() {
    let opts: AdaptOpts = serde_json::from_str(
        r#"{ "min_quality_allowed": 0.2, "min_quality_desired": 0.3 }"#,
    )
    .unwrap();
    let defaults = AdaptOpts::new(3).unwrap();
    assert_eq!(opts, defaults);
}

#[test]
fn verbosity_is_snake_case() {
    let opts: AdaptOpts = serde_json::from_str(
        r#"{
            "min_quality_allowed": 0.3,
            "min_quality_desired": 0.4,
            "verbosity": "extra_stats",
            "nsliver_layers": 2,
            "max_passes": 7
        }"#,
    )
    .unwrap();
    assert_eq!(opts.verbosity, Verbosity::ExtraStats);
    assert_eq!(opts.nsliver_layers, 2);
    assert_eq!(opts.max_passes, 7);
    let json = serde_json::to_string(&Verbosity::EachRebuild).unwrap();
    assert_eq!(json, "\"each_rebuild\"");
}

#[test]
fn loaded_options_are_validated_separately() {
    let opts: AdaptOpts = serde_json::from_str(
        r#"{ "min_quality_allowed": 0.5, "min_quality_desired": 0.4 }"#,
    )
    .unwrap();
    assert!(matches!(opts.validate(), Err(MeshAdaptError::InvalidOptions(_))));
}

#[test]
fn qualities_are_required() {
    let err = serde_json::from_str::<AdaptOpts>(r#"{ "min_quality_allowed": 0.5 }"#);
    assert!(err.is_err());
}
