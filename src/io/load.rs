//! Model loading functionality

use super::container;
use crate::config::GraphConfig;
use crate::graph::{LayerConstructor, LayerRegistry, ModelGraph};
use crate::weights::WeightSet;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a model from a persisted artifact.
///
/// The artifact's format is detected from its on-disk signature, never from
/// the path's extension. A readable file whose signature matches no known
/// backend fails with [`Error::UnrecognizedFormat`]; an unreadable or missing
/// file fails with [`Error::Io`].
///
/// `custom_objects` supplies constructors for layer types the persisted
/// config references that are not in the built-in registry.
///
/// # Example
///
/// ```no_run
/// use guardar::io::load_model;
///
/// let model = load_model("model.guardar", None).unwrap();
/// println!("Loaded model: {:?}", model.name());
/// ```
pub fn load_model(
    path: impl AsRef<Path>,
    custom_objects: Option<&HashMap<String, LayerConstructor>>,
) -> Result<ModelGraph> {
    let path = path.as_ref();
    if path.is_dir() {
        // Only the experimental directory format produces directories, and it
        // has no reader
        return Err(Error::UnrecognizedFormat(format!(
            "`{}` is a directory, not a recognized artifact",
            path.display()
        )));
    }
    let data = std::fs::read(path)?;
    if !container::matches_signature(&data) {
        return Err(Error::UnrecognizedFormat(format!(
            "`{}` does not match any known artifact signature",
            path.display()
        )));
    }
    let (header, weights) = container::decode(&data)?;
    let registry = LayerRegistry::builtin().with_custom(custom_objects);
    rehydrate(&header.graph, &weights, &registry)
}

/// Reconstruct a runnable model from a config and matching weights.
///
/// Builds the graph skeleton through `registry`, allocates variables at their
/// declared shapes, assigns the stored weights, and verifies the rebuilt
/// graph still declares the same input contract the config names.
pub fn rehydrate(
    config: &GraphConfig,
    weights: &WeightSet,
    registry: &LayerRegistry,
) -> Result<ModelGraph> {
    let mut graph = config.build(registry)?;
    weights.assign(&mut graph)?;
    for input in &config.inputs {
        if graph.layer(input).is_none() {
            return Err(Error::Graph(format!(
                "rehydrated model lost input `{input}`"
            )));
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ActivationFn, Dense};
    use crate::io::{save_model, SaveFormat};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn small_model() -> ModelGraph {
        let mut graph = ModelGraph::new().with_name("small");
        graph.add_input("x", 2).unwrap();
        graph
            .add_layer(
                Box::new(Dense::new("out", 2, 1, ActivationFn::Linear)),
                &["x"],
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let original = small_model();
        save_model(&original, &path, SaveFormat::Auto).unwrap();

        let loaded = load_model(&path, None).unwrap();
        assert_eq!(loaded.name(), Some("small"));
        assert_eq!(loaded.inputs(), original.inputs());

        let orig_weights = WeightSet::extract(&original);
        let loaded_weights = WeightSet::extract(&loaded);
        assert_eq!(orig_weights, loaded_weights);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = load_model("no_such_artifact.bin", None);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_unrecognized_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"this\": \"is json, not a container\"}")
            .unwrap();
        file.flush().unwrap();

        let result = load_model(file.path(), None);
        assert!(matches!(result, Err(Error::UnrecognizedFormat(_))));
    }

    #[test]
    fn test_load_directory_is_unrecognized() {
        let dir = tempdir().unwrap();
        let result = load_model(dir.path(), None);
        assert!(matches!(result, Err(Error::UnrecognizedFormat(_))));
    }

    #[test]
    fn test_rehydrate_composes_build_and_assign() {
        let original = small_model();
        let config = GraphConfig::from_graph(&original);
        let weights = WeightSet::extract(&original);

        let rebuilt = rehydrate(&config, &weights, &LayerRegistry::builtin()).unwrap();
        assert_eq!(WeightSet::extract(&rebuilt), weights);
    }

    #[test]
    fn test_rehydrate_shape_mismatch_surfaces() {
        let original = small_model();
        let config = GraphConfig::from_graph(&original);
        let mut weights = WeightSet::extract(&original);
        weights.layers[1].tensors[0].shape = vec![3, 3];
        weights.layers[1].tensors[0].data = vec![0.0; 9];

        let result = rehydrate(&config, &weights, &LayerRegistry::builtin());
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }
}
