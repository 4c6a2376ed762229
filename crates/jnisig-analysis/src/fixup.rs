//! Dispatch stub fixer.
//!
//! C++ JNI code calls through inline `_JNIEnv::Method` wrappers that read a
//! slot of `JNINativeInterface_` and tail-call it. When those wrappers are
//! emitted out of line they get analyzed with whatever type the analysis
//! guessed. The fixer gives each one the type of the slot it forwards to.

use crate::config::{HelperConfig, JNI_RESERVED_SLOTS};
use crate::database::AnalysisDatabase;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use jnisig_types::{CType, ParsedUnit};
use serde::Serialize;

/// Outcome of one fixer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixReport {
    /// Dispatch stubs found in the binary.
    pub stubs: usize,
    /// Stubs that received a type.
    pub fixed: usize,
    /// Slot names with no interface member.
    pub unresolved: Vec<String>,
}

/// Map interface slot names to their function types.
///
/// The first [`JNI_RESERVED_SLOTS`] members are skipped. The value for each
/// member is the first child of its declared type, which for a slot
/// declared `ret (JNICALL *name)(...)` is the function type itself.
pub fn build_sig_map(unit: &ParsedUnit, struct_name: &str) -> Result<IndexMap<String, CType>> {
    let entry = unit
        .get_entry(struct_name)
        .ok_or_else(|| Error::InterfaceStructMissing(struct_name.to_string()))?;
    let CType::Struct(iface) = unit.resolve(&entry.ty) else {
        return Err(Error::InterfaceStructMissing(struct_name.to_string()));
    };

    if iface.fields.len() < JNI_RESERVED_SLOTS {
        return Err(Error::InterfaceStructTooSmall {
            name: struct_name.to_string(),
            members: iface.fields.len(),
            required: JNI_RESERVED_SLOTS,
        });
    }

    let mut map = IndexMap::new();
    for field in &iface.fields[JNI_RESERVED_SLOTS..] {
        match field.field_type.children().first() {
            Some(&ty) => {
                map.insert(field.name.clone(), ty.clone());
            }
            None => log::warn!("member {} of {} is not a slot", field.name, struct_name),
        }
    }
    Ok(map)
}

/// Type every `_JNIEnv::` stub from the interface struct in `unit`.
///
/// A binary with no stubs, or a missing unit, is a no-op. A stub whose slot
/// is not in the interface is reported and skipped. Types are assigned
/// without requesting re-analysis.
pub fn fix_dispatch_stubs<D>(
    db: &mut D,
    unit: Option<&ParsedUnit>,
    config: &HelperConfig,
) -> Result<FixReport>
where
    D: AnalysisDatabase + ?Sized,
{
    let prefix = config.dispatch_prefix.as_str();
    let stubs: Vec<_> = db
        .functions()?
        .into_iter()
        .filter(|f| f.short_name.starts_with(prefix))
        .collect();

    let mut report = FixReport {
        stubs: stubs.len(),
        ..FixReport::default()
    };
    if stubs.is_empty() {
        log::info!("not cpp library, skip");
        return Ok(report);
    }
    let Some(unit) = unit else {
        log::debug!("no parsed signatures, skip {} dispatch stubs", stubs.len());
        return Ok(report);
    };

    let sig_map = build_sig_map(unit, &config.interface_struct)?;
    log::info!("loaded {} JNI interface", sig_map.len());

    for stub in &stubs {
        let slot = &stub.short_name[prefix.len()..];
        let Some(ty) = sig_map.get(slot) else {
            log::warn!("no signature for {}", slot);
            report.unresolved.push(slot.to_string());
            continue;
        };
        db.set_function_type(stub.start, ty)?;
        log::info!("cpp fix 0x{:x} {}", stub.start, stub.short_name);
        report.fixed += 1;
    }

    Ok(report)
}
