//! Integration tests for model I/O

use super::*;
use crate::config::{from_json, to_json, GraphConfig};
use crate::graph::{ActivationFn, Concatenate, Dense, ModelGraph};
use crate::weights::WeightSet;
use crate::Error;
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use std::collections::HashMap;
use tempfile::tempdir;

fn mlp() -> ModelGraph {
    let mut graph = ModelGraph::new().with_name("mlp");
    graph.add_input("x", 4).unwrap();
    graph
        .add_layer(
            Box::new(Dense::new("hidden", 4, 8, ActivationFn::Relu)),
            &["x"],
        )
        .unwrap();
    graph
        .add_layer(
            Box::new(Dense::new("out", 8, 2, ActivationFn::Linear)),
            &["hidden"],
        )
        .unwrap();
    graph
}

fn feature_merge_model() -> ModelGraph {
    let mut graph = ModelGraph::new().with_name("feature-merge");
    graph.add_input("a", 1).unwrap();
    graph.add_input("b", 2).unwrap();
    graph
        .add_layer(Box::new(Concatenate::new("features")), &["a", "b"])
        .unwrap();
    graph
        .add_layer(
            Box::new(Dense::new("head", 3, 10, ActivationFn::Linear)),
            &["features"],
        )
        .unwrap();
    graph.compile("mse", "rmsprop", &["categorical_accuracy"]);
    graph
}

#[test]
fn test_save_load_preserves_config_and_weights() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mlp.guardar");
    let original = mlp();

    save_model(&original, &path, SaveFormat::Auto).unwrap();
    let loaded = load_model(&path, None).unwrap();

    assert_eq!(
        GraphConfig::from_graph(&original),
        GraphConfig::from_graph(&loaded)
    );
    assert_eq!(WeightSet::extract(&original), WeightSet::extract(&loaded));
}

#[test]
fn test_loaded_model_predicts_identically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mlp.bin");
    let original = mlp();
    save_model(&original, &path, SaveFormat::Container).unwrap();
    let loaded = load_model(&path, None).unwrap();

    let mut feeds = HashMap::new();
    feeds.insert(
        "x".to_string(),
        Array2::from_shape_fn((6, 4), |(i, j)| (i * 4 + j) as f32 * 0.1),
    );
    let orig_out = original.predict(&feeds).unwrap();
    let loaded_out = loaded.predict(&feeds).unwrap();

    assert_eq!(orig_out.shape(), loaded_out.shape());
    for (a, b) in orig_out.iter().zip(loaded_out.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_artifact_signature_valid_regardless_of_extension() {
    let dir = tempdir().unwrap();
    for file_name in ["model", "model.txt", "model.json", "model.h5"] {
        let path = dir.path().join(file_name);
        save_model(&mlp(), &path, SaveFormat::Auto).unwrap();
        assert!(is_container(&path), "artifact {file_name} failed validation");
    }
}

#[test]
fn test_directory_format_never_partially_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("experimental");
    let err = save_model(&mlp(), &path, SaveFormat::Directory);
    assert!(matches!(err, Err(Error::NotImplemented(_))));
    assert!(!path.exists());
    // The destination directory stays empty
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_feature_merge_json_round_trip_predicts_batch_of_10() {
    let model = feature_merge_model();
    let json = to_json(&model).unwrap();
    let loaded = from_json(&json, None).unwrap();

    assert_eq!(loaded.training(), model.training());

    let mut feeds = HashMap::new();
    feeds.insert(
        "a".to_string(),
        Array2::from_shape_fn((10, 1), |(i, _)| i as f32),
    );
    feeds.insert(
        "b".to_string(),
        Array2::from_shape_fn((10, 2), |(i, j)| (i + j) as f32),
    );
    let out = loaded.predict(&feeds).unwrap();
    assert_eq!(out.nrows(), 10);
}

#[test]
fn test_feature_merge_container_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("merge.guardar");
    let original = feature_merge_model();
    save_model(&original, &path, SaveFormat::Auto).unwrap();
    let loaded = load_model(&path, None).unwrap();

    let mut feeds = HashMap::new();
    feeds.insert("a".to_string(), Array2::ones((10, 1)));
    feeds.insert("b".to_string(), Array2::ones((10, 2)));

    let orig_out = original.predict(&feeds).unwrap();
    let loaded_out = loaded.predict(&feeds).unwrap();
    assert_eq!(orig_out.shape(), &[10, 10]);
    for (a, b) in orig_out.iter().zip(loaded_out.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_concurrent_saves_to_different_paths() {
    let dir = tempdir().unwrap();
    let paths: Vec<_> = (0..4).map(|i| dir.path().join(format!("m{i}.bin"))).collect();

    std::thread::scope(|scope| {
        for path in &paths {
            scope.spawn(move || {
                let model = mlp();
                save_model(&model, path, SaveFormat::Auto).unwrap();
            });
        }
    });

    for path in &paths {
        assert!(is_container(path));
        load_model(path, None).unwrap();
    }
}
