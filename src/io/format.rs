//! Persistence format selection

use serde::{Deserialize, Serialize};

/// Requested persistence backend for [`save_model`](crate::io::save_model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFormat {
    /// Let the library choose. Currently always resolves to [`Container`],
    /// regardless of the target path's extension. This is deliberate policy:
    /// callers expecting extension-based inference must pick a format
    /// explicitly.
    ///
    /// [`Container`]: SaveFormat::Container
    Auto,

    /// Single self-describing binary file bundling config and weights
    Container,

    /// Structured multi-file format separating graph definition, weights,
    /// and metadata. Experimental: saving fails fast with
    /// [`Error::NotImplemented`](crate::Error::NotImplemented).
    Directory,
}

impl SaveFormat {
    /// Resolve `Auto` to the concrete default backend
    pub fn resolve(self) -> SaveFormat {
        match self {
            SaveFormat::Auto => SaveFormat::Container,
            other => other,
        }
    }

}

impl Default for SaveFormat {
    fn default() -> Self {
        SaveFormat::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_to_container() {
        assert_eq!(SaveFormat::Auto.resolve(), SaveFormat::Container);
        assert_eq!(SaveFormat::Container.resolve(), SaveFormat::Container);
        assert_eq!(SaveFormat::Directory.resolve(), SaveFormat::Directory);
    }

    #[test]
    fn test_default_is_auto() {
        assert_eq!(SaveFormat::default(), SaveFormat::Auto);
    }
}
