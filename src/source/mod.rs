mod error;

use std::path::{Path, PathBuf};

pub use error::SourceError;

use crate::NodeDef;

/// Where a tree definition comes from.
#[derive(Debug, Clone)]
pub enum TreeSource {
    /// A definition built in code; nothing to parse.
    Definition(NodeDef),
    /// JSON text.
    Json(String),
    /// Path to a JSON file.
    JsonFile(PathBuf),
    /// YAML text.
    #[cfg(feature = "yaml")]
    Yaml(String),
    /// Path to a YAML file.
    #[cfg(feature = "yaml")]
    YamlFile(PathBuf),
}

impl TreeSource {
    /// Build a source from a format tag (`json`, `jsonfile`, `yaml`,
    /// `yamlfile`) and the text or path it applies to.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownFormat`] for any other tag.
    pub fn from_format(format: &str, root: impl Into<String>) -> Result<Self, SourceError> {
        let root = root.into();
        match format {
            "json" => Ok(TreeSource::Json(root)),
            "jsonfile" => Ok(TreeSource::JsonFile(PathBuf::from(root))),
            #[cfg(feature = "yaml")]
            "yaml" => Ok(TreeSource::Yaml(root)),
            #[cfg(feature = "yaml")]
            "yamlfile" => Ok(TreeSource::YamlFile(PathBuf::from(root))),
            other => Err(SourceError::UnknownFormat(other.to_owned())),
        }
    }

    /// Parse the source into a definition.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a file cannot be read or the text does not
    /// describe a node.
    pub fn load(self) -> Result<NodeDef, SourceError> {
        match self {
            TreeSource::Definition(def) => Ok(def),
            TreeSource::Json(text) => Ok(serde_json::from_str(&text)?),
            TreeSource::JsonFile(path) => Ok(serde_json::from_str(&read(&path)?)?),
            #[cfg(feature = "yaml")]
            TreeSource::Yaml(text) => Ok(serde_yaml::from_str(&text)?),
            #[cfg(feature = "yaml")]
            TreeSource::YamlFile(path) => Ok(serde_yaml::from_str(&read(&path)?)?),
        }
    }
}

fn read(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_owned(),
        source,
    })
}

impl From<NodeDef> for TreeSource {
    fn from(def: NodeDef) -> Self {
        TreeSource::Definition(def)
    }
}
