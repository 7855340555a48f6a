//! Model saving functionality

use super::container;
use super::format::SaveFormat;
use crate::graph::ModelGraph;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Save a model to `path` in the requested format.
///
/// `SaveFormat::Auto` always writes the container format, regardless of the
/// path's extension. The write is atomic: bytes go to a temporary file in the
/// destination directory which is renamed into place on success, so no
/// partially written artifact is ever observable.
///
/// # Example
///
/// ```no_run
/// use guardar::graph::{ActivationFn, Dense, ModelGraph};
/// use guardar::io::{save_model, SaveFormat};
///
/// let mut model = ModelGraph::new().with_name("mlp");
/// model.add_input("x", 4).unwrap();
/// model
///     .add_layer(Box::new(Dense::new("out", 4, 2, ActivationFn::Relu)), &["x"])
///     .unwrap();
///
/// save_model(&model, "model.guardar", SaveFormat::Auto).unwrap();
/// ```
pub fn save_model(model: &ModelGraph, path: impl AsRef<Path>, format: SaveFormat) -> Result<()> {
    let path = path.as_ref();
    match format.resolve() {
        SaveFormat::Container => save_container(model, path),
        SaveFormat::Directory => Err(Error::NotImplemented(
            "saving as the directory format is still experimental".to_string(),
        )),
        SaveFormat::Auto => unreachable!("Auto resolves to a concrete format"),
    }
}

fn save_container(model: &ModelGraph, path: &Path) -> Result<()> {
    let bytes = container::encode(model)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ActivationFn, Dense};
    use crate::io::is_container;
    use tempfile::tempdir;

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
    fn test_save_auto_writes_container() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model_path");
        save_model(&small_model(), &path, SaveFormat::Auto).unwrap();
        assert!(is_container(&path));
    }

    #[test]
    fn test_save_container_ignores_extension() {
        let dir = tempdir().unwrap();
        // Misleading extension: still a container
        let path = dir.path().join("model.json");
        save_model(&small_model(), &path, SaveFormat::Container).unwrap();
        assert!(is_container(&path));
    }

    #[test]
    fn test_save_directory_fails_fast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model");
        let err = save_model(&small_model(), &path, SaveFormat::Directory);
        match err {
            Err(Error::NotImplemented(msg)) => assert!(msg.contains("experimental")),
            other => panic!("expected NotImplemented, got {other:?}"),
        }
        // Nothing may be written for an unsupported format
        assert!(!path.exists());
    }

    #[test]
    fn test_save_to_missing_directory_is_io_error() {
        let result = save_model(
            &small_model(),
            "/nonexistent/directory/model.bin",
            SaveFormat::Container,
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_save_overwrites_existing_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"stale contents").unwrap();
        save_model(&small_model(), &path, SaveFormat::Auto).unwrap();
        assert!(is_container(&path));
    }
}
