//! Pipeline configuration.

use jnisig_types::ParserOptions;
use std::path::{Path, PathBuf};

/// Number of leading reserved slots in `JNINativeInterface_`.
pub const JNI_RESERVED_SLOTS: usize = 4;

/// Metadata class whose methods resolve functions but get no prototype.
pub const COMMON_CLASS: &str = "__COMMON__";

/// Short-name prefix of C++ `JNIEnv` dispatch stubs.
pub const DISPATCH_PREFIX: &str = "_JNIEnv::";

/// Name of the JNI function table struct.
pub const INTERFACE_STRUCT: &str = "JNINativeInterface_";

/// Unit name of the base header.
pub const BASE_UNIT: &str = "jni.h";

/// Unit name of the header extended with synthesized prototypes.
pub const EXTENDED_UNIT: &str = "jni_ext.h";

/// Configuration for a [`JniHelper`](crate::JniHelper) run.
#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Header to load instead of searching.
    pub header_path: Option<PathBuf>,
    /// Metadata file to use instead of prompting.
    pub metadata_path: Option<PathBuf>,
    /// Locations tried, in order, for the default header.
    pub search_paths: Vec<PathBuf>,
    pub common_class: String,
    pub dispatch_prefix: String,
    pub interface_struct: String,
    pub parser_options: ParserOptions,
    /// Run the dispatch stub fixer after applying signatures.
    pub fix_dispatch: bool,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            header_path: None,
            metadata_path: None,
            search_paths: default_search_paths(),
            common_class: COMMON_CLASS.to_string(),
            dispatch_prefix: DISPATCH_PREFIX.to_string(),
            interface_struct: INTERFACE_STRUCT.to_string(),
            parser_options: ParserOptions::jni(),
            fix_dispatch: true,
        }
    }
}

impl HelperConfig {
    pub fn with_header(mut self, path: impl Into<PathBuf>) -> Self {
        self.header_path = Some(path.into());
        self
    }

    pub fn with_metadata(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_fix_dispatch(mut self, enabled: bool) -> Self {
        self.fix_dispatch = enabled;
        self
    }

    /// First existing header candidate: the explicit path, then the search
    /// paths.
    pub fn locate_header(&self) -> Option<PathBuf> {
        self.header_path
            .iter()
            .chain(&self.search_paths)
            .find(|p| p.is_file())
            .cloned()
    }
}

/// `headers/jni.h` next to the executable, in its parent directory, and in
/// the current directory.
pub fn default_search_paths() -> Vec<PathBuf> {
    let relative = Path::new("headers").join("jni.h");
    let mut paths = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(&relative));
        if let Some(parent) = dir.parent() {
            paths.push(parent.join(&relative));
        }
    }
    paths.push(relative);
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HelperConfig::default();
        assert_eq!(config.common_class, "__COMMON__");
        assert_eq!(config.dispatch_prefix, "_JNIEnv::");
        assert_eq!(config.interface_struct, "JNINativeInterface_");
        assert!(config.parser_options.declspec);
        assert!(config.fix_dispatch);
        assert!(config
            .search_paths
            .last()
            .is_some_and(|p| p.ends_with("headers/jni.h")));
    }

    #[test]
    fn test_locate_header_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("mine.h");
        let fallback = dir.path().join("jni.h");
        std::fs::write(&explicit, "").unwrap();
        std::fs::write(&fallback, "").unwrap();

        let config = HelperConfig::default()
            .with_search_paths(vec![fallback.clone()])
            .with_header(&explicit);
        assert_eq!(config.locate_header(), Some(explicit));

        let config = config.with_header(dir.path().join("missing.h"));
        assert_eq!(config.locate_header(), Some(fallback));

        let config = HelperConfig::default().with_search_paths(vec![]);
        assert_eq!(config.locate_header(), None);
    }
}
