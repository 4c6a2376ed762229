//! Declaration synthesis from method metadata.
//!
//! Builds the extended compilation unit: the base header followed by one
//! prototype line per native method that resolves to a function in the
//! binary. Pure over its inputs; the database is reached only through the
//! lookup closure.

use crate::database::{DatabaseError, Function};
use crate::metadata::MethodMetadata;
use indexmap::IndexMap;

/// Output of [`synthesize`].
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// `header + "\n"` followed by the synthesized prototype lines.
    pub source: String,
    /// Mangled name to the resolved binary function.
    pub function_map: IndexMap<String, Function>,
    /// Number of prototype lines appended.
    pub prototypes: usize,
    /// Methods with no function in the binary.
    pub missing: usize,
    /// Methods whose mangle replaced an earlier map entry.
    pub duplicates: usize,
}

/// Synthesize the extended source for `metadata`.
///
/// Methods are visited in file order. A method whose mangle has no function
/// is skipped. The first matching function is recorded under the mangle;
/// a later method with the same mangle replaces the entry. Methods of
/// `common_class` are recorded but contribute no prototype.
pub fn synthesize<F>(
    header: &str,
    metadata: &MethodMetadata,
    common_class: &str,
    mut lookup: F,
) -> Result<Synthesis, DatabaseError>
where
    F: FnMut(&str) -> Result<Vec<Function>, DatabaseError>,
{
    let mut out = Synthesis {
        source: format!("{}\n", header),
        ..Synthesis::default()
    };

    for (class, method) in metadata.methods() {
        let Some(func) = lookup(&method.mangle)?.into_iter().next() else {
            log::debug!("{} not in binary, skip", method.mangle);
            out.missing += 1;
            continue;
        };

        if let Some(previous) = out.function_map.insert(method.mangle.clone(), func) {
            log::warn!(
                "duplicate mangle {} (was 0x{:x}), last entry wins",
                method.mangle,
                previous.start
            );
            out.duplicates += 1;
        }

        if class == common_class {
            continue;
        }
        out.source.push_str(&method.prototype());
        out.source.push_str(";\n");
        out.prototypes += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AnalysisDatabase, MemoryDatabase};

    fn metadata() -> MethodMetadata {
        MethodMetadata::from_json(
            r#"{"dexInfo": {
                "Foo": [
                    {"mangle": "Java_Foo_bar", "ret": "jint", "args": ["JNIEnv*", "jobject"]},
                    {"mangle": "Java_Foo_gone", "ret": "void", "args": ["JNIEnv*", "jclass"]}
                ],
                "__COMMON__": [
                    {"mangle": "JNI_OnLoad", "ret": "jint", "args": ["JavaVM*", "void*"]}
                ]
            }}"#,
        )
        .unwrap()
    }

    fn database() -> MemoryDatabase {
        MemoryDatabase::default()
            .with_function(0x1000, "Java_Foo_bar")
            .with_function(0x2000, "JNI_OnLoad")
    }

    #[test]
    fn test_synthesized_source() {
        let db = database();
        let out = synthesize("typedef int jint;", &metadata(), "__COMMON__", |name| {
            db.functions_by_name(name)
        })
        .unwrap();

        assert_eq!(
            out.source,
            "typedef int jint;\njint Java_Foo_bar(JNIEnv*,jobject);\n"
        );
        assert_eq!(out.prototypes, 1);
        assert_eq!(out.missing, 1);
        assert_eq!(out.duplicates, 0);
    }

    #[test]
    fn test_common_methods_are_mapped() {
        let db = database();
        let out = synthesize("", &metadata(), "__COMMON__", |name| db.functions_by_name(name))
            .unwrap();

        let mapped: Vec<_> = out.function_map.keys().map(String::as_str).collect();
        assert_eq!(mapped, vec!["Java_Foo_bar", "JNI_OnLoad"]);
        assert!(!out.source.contains("JNI_OnLoad"));
        assert!(!out.function_map.contains_key("Java_Foo_gone"));
    }

    #[test]
    fn test_duplicate_mangle_last_wins() {
        let meta = MethodMetadata::from_json(
            r#"{"dexInfo": {
                "A": [{"mangle": "Java_X_f", "ret": "void", "args": []}],
                "B": [{"mangle": "Java_X_f", "ret": "void", "args": []}]
            }}"#,
        )
        .unwrap();
        let mut calls = 0;
        let out = synthesize("", &meta, "__COMMON__", |name| {
            calls += 1;
            Ok(vec![Function::new(0x100 * calls, name)])
        })
        .unwrap();

        assert_eq!(out.duplicates, 1);
        assert_eq!(out.function_map["Java_X_f"].start, 0x200);
        assert_eq!(out.prototypes, 2);
    }

    #[test]
    fn test_first_match_is_recorded() {
        let meta = MethodMetadata::from_json(
            r#"{"dexInfo": {"A": [{"mangle": "Java_X_f", "ret": "void", "args": []}]}}"#,
        )
        .unwrap();
        let out = synthesize("", &meta, "__COMMON__", |name| {
            Ok(vec![Function::new(0x10, name), Function::new(0x20, name)])
        })
        .unwrap();
        assert_eq!(out.function_map["Java_X_f"].start, 0x10);
    }

    #[test]
    fn test_lookup_error_propagates() {
        let result = synthesize("", &metadata(), "__COMMON__", |_| {
            Err(DatabaseError::Backend("closed".to_string()))
        });
        assert!(result.is_err());
    }
}
