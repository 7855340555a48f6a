//! Layer constructor registry
//!
//! Maps serialized type identifiers to constructors. Built-in types are always
//! available; user-defined types can be supplied per call (`custom_objects`) or
//! registered process-wide at startup. Unknown names fail closed with
//! [`Error::UnknownLayerType`](crate::Error::UnknownLayerType).

use super::layer::{Activation, Concatenate, Dense, Input, Layer};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Constructor for a layer type: `(layer name, config) -> layer`
pub type LayerConstructor =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Box<dyn Layer>> + Send + Sync>;

/// Wrap a constructor closure as a [`LayerConstructor`]
pub fn constructor<F>(f: F) -> LayerConstructor
where
    F: Fn(&str, &Map<String, Value>) -> Result<Box<dyn Layer>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Lookup table of layer constructors used during config deserialization
pub struct LayerRegistry {
    builders: HashMap<String, LayerConstructor>,
}

impl LayerRegistry {
    /// Registry containing only the built-in layer types
    pub fn builtin() -> Self {
        let mut builders: HashMap<String, LayerConstructor> = HashMap::new();
        builders.insert(
            "Input".to_string(),
            constructor(|name, config| Ok(Box::new(Input::from_config(name, config)?))),
        );
        builders.insert(
            "Dense".to_string(),
            constructor(|name, config| Ok(Box::new(Dense::from_config(name, config)?))),
        );
        builders.insert(
            "Activation".to_string(),
            constructor(|name, config| Ok(Box::new(Activation::from_config(name, config)?))),
        );
        builders.insert(
            "Concatenate".to_string(),
            constructor(|name, config| Ok(Box::new(Concatenate::from_config(name, config)?))),
        );
        Self { builders }
    }

    /// Merge caller-supplied constructors. Built-in names cannot be shadowed.
    pub fn with_custom(mut self, custom: Option<&HashMap<String, LayerConstructor>>) -> Self {
        if let Some(custom) = custom {
            for (class_name, builder) in custom {
                self.builders
                    .entry(class_name.clone())
                    .or_insert_with(|| builder.clone());
            }
        }
        self
    }

    /// Instantiate a layer by its serialized type identifier.
    ///
    /// Lookup order: this registry's table (built-ins plus per-call custom
    /// objects), then the process-wide custom table.
    pub fn construct(
        &self,
        class_name: &str,
        name: &str,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn Layer>> {
        if let Some(builder) = self.builders.get(class_name) {
            return (**builder)(name, config);
        }
        if let Some(builder) = registered_custom(class_name) {
            return (*builder)(name, config);
        }
        Err(Error::UnknownLayerType(class_name.to_string()))
    }

    /// Whether a type identifier resolves to a constructor
    pub fn contains(&self, class_name: &str) -> bool {
        self.builders.contains_key(class_name) || registered_custom(class_name).is_some()
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn custom_table() -> &'static RwLock<HashMap<String, LayerConstructor>> {
    static TABLE: OnceLock<RwLock<HashMap<String, LayerConstructor>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a custom layer type process-wide.
///
/// Intended for startup-time registration; the table is append-only and safe
/// for concurrent reads during save/load.
pub fn register_custom_layer(class_name: impl Into<String>, builder: LayerConstructor) {
    custom_table()
        .write()
        .expect("custom layer table poisoned")
        .insert(class_name.into(), builder);
}

fn registered_custom(class_name: &str) -> Option<LayerConstructor> {
    custom_table()
        .read()
        .expect("custom layer table poisoned")
        .get(class_name)
        .cloned()
}
