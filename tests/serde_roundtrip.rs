#![cfg(feature = "serde")]

use furrow::pipeline::{train, ClusterConfig, TrainConfig, TrainedModel};
use furrow::SparseVector;
use serde_json::{json, Value};

#[test]
fn trained_model_round_trips_through_json() {
    let header = ["x", "tag", "label"];
    let rows = vec![
        ["1", "red", "no"],
        ["2", "red", "no"],
        ["9", "blue", "yes"],
        ["8", "blue", "yes"],
    ];
    let config = TrainConfig::new("label", &["x", "tag"])
        .with_kinds(&["numeric", "word"])
        .with_rate(0.05)
        .with_passes(20);
    let model = train(&config, &header, rows).unwrap();

    let bytes = serde_json::to_vec(&model).unwrap();
    let restored: TrainedModel = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(restored, model);

    let row = ["9", "blue", "?"];
    assert_eq!(restored.classify_row(&row).unwrap(), model.classify_row(&row).unwrap());
}

#[test]
fn sparse_vector_with_index_past_width_is_rejected() {
    let err = serde_json::from_str::<SparseVector>(r#"{"dim":2,"entries":{"5":1.0}}"#);
    assert!(err.is_err());
}

#[test]
fn inconsistent_model_blobs_fail_to_load() {
    let header = ["x", "label"];
    let model = train(&TrainConfig::new("label", &["x"]), &header, vec![["1", "a"], ["2", "b"]])
        .unwrap();
    let doc = serde_json::to_value(&model).unwrap();

    let load = |edit: &dyn Fn(&mut Value)| {
        let mut doc = doc.clone();
        edit(&mut doc);
        serde_json::from_value::<TrainedModel>(doc)
    };
    assert!(load(&|_: &mut Value| {}).is_ok());
    assert!(load(&|d: &mut Value| d["encoder"]["num_features"] = json!(0)).is_err());
    assert!(load(&|d: &mut Value| d["encoder"]["num_features"] = json!(7)).is_err());
    assert!(load(&|d: &mut Value| d["model"]["config"]["num_categories"] = json!(3)).is_err());
    assert!(load(&|d: &mut Value| d["encoder"]["binding"]["predictors"] = json!([4])).is_err());
}

#[test]
fn configs_fill_defaults() {
    let config: TrainConfig =
        serde_json::from_str(r#"{"target": "label", "predictors": ["x"]}"#).unwrap();
    assert_eq!(config.features, 1000);
    assert_eq!(config.passes, 2);

    let cluster: ClusterConfig =
        serde_json::from_str(r#"{"algorithm": "fuzzy_k_means", "k": 3, "seeding": {"canopy": {"t1": 2.0, "t2": 1.0}}}"#)
            .unwrap();
    assert_eq!(cluster.k, 3);
    assert_eq!(cluster.measure, "squared_euclidean");
}
