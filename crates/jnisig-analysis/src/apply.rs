//! Signature applier.

use crate::config::{HelperConfig, EXTENDED_UNIT};
use crate::database::AnalysisDatabase;
use crate::declarations::parse_declarations;
use crate::error::Result;
use crate::metadata::MethodMetadata;
use crate::prompt::FilePrompt;
use crate::synthesize::synthesize;
use jnisig_types::ParsedUnit;
use serde::Serialize;

/// Counts from one signature application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// User types defined or overwritten.
    pub types_defined: usize,
    /// Functions that received a type.
    pub functions_typed: usize,
    /// Metadata methods with no function in the binary.
    pub methods_missing: usize,
    /// Mangles that replaced an earlier function map entry.
    pub duplicate_mangles: usize,
    /// Prototype lines added to the extended unit.
    pub prototypes_synthesized: usize,
}

/// A successful application: the extended unit and what was done with it.
#[derive(Debug, Clone)]
pub struct Applied {
    pub unit: ParsedUnit,
    pub report: ApplyReport,
}

/// Choose the metadata file and apply it.
///
/// The configured metadata path is used if set, otherwise the operator is
/// asked. Returns `Ok(None)` if no file was chosen or the extended unit did
/// not parse; nothing is written to the database in either case.
pub fn apply_signatures<D, P>(
    db: &mut D,
    prompt: &mut P,
    header: &str,
    config: &HelperConfig,
) -> Result<Option<Applied>>
where
    D: AnalysisDatabase + ?Sized,
    P: FilePrompt + ?Sized,
{
    let path = match &config.metadata_path {
        Some(path) => path.clone(),
        None => match prompt.choose_file("signature.json from extract_jni.py", "File") {
            Some(path) => path,
            None => {
                log::info!("no metadata chosen, skip applying signatures");
                return Ok(None);
            }
        },
    };

    let metadata = MethodMetadata::load(&path)?;
    log::debug!("loaded {} methods from {}", metadata.len(), path.display());
    apply_metadata(db, header, &metadata, config)
}

/// Apply already loaded metadata.
pub fn apply_metadata<D>(
    db: &mut D,
    header: &str,
    metadata: &MethodMetadata,
    config: &HelperConfig,
) -> Result<Option<Applied>>
where
    D: AnalysisDatabase + ?Sized,
{
    let synthesis = synthesize(header, metadata, &config.common_class, |name| {
        db.functions_by_name(name)
    })?;

    let platform = db.platform();
    let Some(unit) =
        parse_declarations(&synthesis.source, EXTENDED_UNIT, &platform, config.parser_options)
    else {
        return Ok(None);
    };

    let mut report = ApplyReport {
        methods_missing: synthesis.missing,
        duplicate_mangles: synthesis.duplicates,
        prototypes_synthesized: synthesis.prototypes,
        ..ApplyReport::default()
    };

    for entry in unit.types() {
        db.define_user_type(&entry.name, &entry.ty)?;
        report.types_defined += 1;
    }

    for proto in unit.functions() {
        let Some(func) = synthesis.function_map.get(&proto.name) else {
            continue;
        };
        let ty = proto.function_type();
        log::info!("fix 0x{:x} {} -> {}", func.start, proto.name, ty);
        db.set_function_type(func.start, &ty)?;
        db.reanalyze(func.start)?;
        report.functions_typed += 1;
    }

    Ok(Some(Applied { unit, report }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::prompt::{NoPrompt, ScriptedPrompt};
    use jnisig_types::CType;

    const HEADER: &str = "typedef int jint;\n\
        struct _jobject;\n\
        typedef struct _jobject *jobject;\n\
        struct JNINativeInterface_;\n\
        typedef const struct JNINativeInterface_ *JNIEnv;\n";

    const META: &str = r#"{"dexInfo": {"Foo": [
        {"mangle": "Java_Foo_bar", "ret": "jint", "args": ["JNIEnv*", "jobject"]}
    ]}}"#;

    #[test]
    fn test_apply_types_function() {
        let mut db = MemoryDatabase::default().with_function(0x1000, "Java_Foo_bar");
        let meta = MethodMetadata::from_json(META).unwrap();

        let applied = apply_metadata(&mut db, HEADER, &meta, &HelperConfig::default())
            .unwrap()
            .unwrap();

        assert_eq!(applied.unit.name(), "jni_ext.h");
        assert_eq!(applied.report.functions_typed, 1);
        assert_eq!(applied.report.types_defined, applied.unit.types().count());
        assert_eq!(db.reanalysis_count(0x1000), 1);

        let Some(CType::Function(f)) = db.function_type(0x1000) else {
            panic!("function not typed");
        };
        assert_eq!(*f.return_type, CType::named("jint"));
        assert_eq!(
            f.parameters[0].param_type,
            CType::ptr(CType::named("JNIEnv"))
        );
        assert_eq!(f.parameters[1].param_type, CType::named("jobject"));
        assert!(db.user_type("jobject").is_some());
    }

    #[test]
    fn test_parse_failure_writes_nothing() {
        let mut db = MemoryDatabase::default().with_function(0x1000, "Java_Foo_bar");
        let meta = MethodMetadata::from_json(
            r#"{"dexInfo": {"Foo": [
                {"mangle": "Java_Foo_bar", "ret": "jstring", "args": []}
            ]}}"#,
        )
        .unwrap();

        let applied = apply_metadata(&mut db, HEADER, &meta, &HelperConfig::default()).unwrap();
        assert!(applied.is_none());
        assert_eq!(db.user_types().count(), 0);
        assert!(db.function_type(0x1000).is_none());
    }

    #[test]
    fn test_no_metadata_chosen() {
        let mut db = MemoryDatabase::default();
        let applied =
            apply_signatures(&mut db, &mut NoPrompt, HEADER, &HelperConfig::default()).unwrap();
        assert!(applied.is_none());
    }

    #[test]
    fn test_metadata_from_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signature.json");
        std::fs::write(&path, META).unwrap();

        let mut db = MemoryDatabase::default().with_function(0x1000, "Java_Foo_bar");
        let mut prompt = ScriptedPrompt::new([Some(path)]);
        let applied = apply_signatures(&mut db, &mut prompt, HEADER, &HelperConfig::default())
            .unwrap()
            .unwrap();

        assert_eq!(applied.report.functions_typed, 1);
        assert_eq!(prompt.asked(), ["signature.json from extract_jni.py"]);
    }

    #[test]
    fn test_malformed_metadata_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signature.json");
        std::fs::write(&path, r#"{"classes": []}"#).unwrap();

        let config = HelperConfig::default().with_metadata(&path);
        let mut db = MemoryDatabase::default();
        assert!(apply_signatures(&mut db, &mut NoPrompt, HEADER, &config).is_err());
    }
}
