//! Per-method metadata produced by the dex extraction step.
//!
//! The file shape is `{"dexInfo": {"<class>": [{"mangle", "ret", "args"}]}}`.
//! Class and method order is kept as encountered in the file.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One native method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Native symbol name (`Java_com_example_Foo_bar`).
    pub mangle: String,
    /// Return type spelling.
    pub ret: String,
    /// Argument type spellings, in order.
    pub args: Vec<String>,
}

impl MethodDescriptor {
    /// The C prototype for this method, without the trailing `;`.
    pub fn prototype(&self) -> String {
        format!("{} {}({})", self.ret, self.mangle, self.args.join(","))
    }
}

/// Parsed metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    #[serde(rename = "dexInfo")]
    pub dex_info: IndexMap<String, Vec<MethodDescriptor>>,
}

impl MethodMetadata {
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse a metadata file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| Error::Metadata {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `(class, method)` pairs in file order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &MethodDescriptor)> {
        self.dex_info
            .iter()
            .flat_map(|(class, methods)| methods.iter().map(move |m| (class.as_str(), m)))
    }

    /// Total number of methods.
    pub fn len(&self) -> usize {
        self.dex_info.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
