//! Header loader.

use crate::config::{HelperConfig, BASE_UNIT};
use crate::database::Platform;
use crate::declarations::parse_declarations;
use crate::prompt::FilePrompt;
use jnisig_types::ParsedUnit;
use std::path::PathBuf;

/// The loaded base JNI header.
#[derive(Debug, Clone)]
pub struct Header {
    /// Where the header was read from.
    pub path: PathBuf,
    /// Header source text.
    pub text: String,
    /// The header parsed on its own, as validation.
    pub unit: ParsedUnit,
}

/// Locate, read and validate the base header.
///
/// The configured locations are tried first, then the operator is asked.
/// Returns `None` if no header was chosen, it cannot be read, or it does
/// not parse.
pub fn load_header<P>(config: &HelperConfig, platform: &Platform, prompt: &mut P) -> Option<Header>
where
    P: FilePrompt + ?Sized,
{
    if let Some(explicit) = &config.header_path {
        if !explicit.is_file() {
            log::warn!("header {} not found", explicit.display());
        }
    }

    let path = match config.locate_header() {
        Some(path) => path,
        None => match prompt.choose_file("jni.h not found, choose one", "File") {
            Some(path) => path,
            None => {
                log::info!("no JNI header chosen, stop");
                return None;
            }
        },
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("cannot read header {}: {}", path.display(), e);
            return None;
        }
    };

    let unit = parse_declarations(&text, BASE_UNIT, platform, config.parser_options)?;
    log::info!("init_header done.");
    log::debug!("header loaded from {}", path.display());

    Some(Header { path, text, unit })
}
