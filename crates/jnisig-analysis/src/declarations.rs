//! Declaration parser adapter.

use crate::database::Platform;
use jnisig_types::{parse_source, ParsedUnit, ParserOptions};

/// Parse `source` as the unit `unit_name` for `platform`.
///
/// On failure every diagnostic is logged verbatim and `None` is returned;
/// a failed unit never yields partial results.
pub fn parse_declarations(
    source: &str,
    unit_name: &str,
    platform: &Platform,
    options: ParserOptions,
) -> Option<ParsedUnit> {
    match parse_source(source, unit_name, options, platform.arch) {
        Ok(unit) => {
            let stats = unit.stats();
            log::debug!(
                "parsed {}: {} types, {} typedefs, {} functions",
                unit_name,
                stats.type_count,
                stats.typedef_count,
                stats.function_count
            );
            Some(unit)
        }
        Err(failure) => {
            log::error!("parse error:");
            for diagnostic in &failure.diagnostics {
                log::error!("{}", diagnostic);
            }
            None
        }
    }
}
