//! # jnisig-analysis
//!
//! JNI signature recovery over an analysis database.
//!
//! The pipeline has three steps, run in order by [`JniHelper`]:
//!
//! 1. Load and validate the base JNI header ([`load_header`]).
//! 2. Synthesize prototypes for the native methods listed in the metadata,
//!    parse them together with the header, define every parsed type and
//!    type every resolved function ([`apply_signatures`]).
//! 3. Give each out-of-line `_JNIEnv::` wrapper the type of the
//!    `JNINativeInterface_` slot it forwards to ([`fix_dispatch_stubs`]).
//!
//! The database and the file prompt are traits, so any host can drive the
//! pipeline. [`MemoryDatabase`] is an in-memory implementation.
//!
//! # Example
//!
//! ```
//! use jnisig_analysis::{apply_metadata, HelperConfig, MemoryDatabase, MethodMetadata};
//!
//! let header = "typedef int jint;\ntypedef void *jobject;\ntypedef void *JNIEnv;";
//! let meta = MethodMetadata::from_json(
//!     r#"{"dexInfo": {"Foo": [{"mangle": "Java_Foo_bar", "ret": "jint", "args": ["JNIEnv*", "jobject"]}]}}"#,
//! ).unwrap();
//!
//! let mut db = MemoryDatabase::default().with_function(0x1000, "Java_Foo_bar");
//! let applied = apply_metadata(&mut db, header, &meta, &HelperConfig::default()).unwrap().unwrap();
//! assert_eq!(applied.report.functions_typed, 1);
//! assert!(db.function_type(0x1000).is_some());
//! ```

pub mod apply;
pub mod config;
pub mod database;
pub mod declarations;
pub mod error;
pub mod fixup;
pub mod header;
pub mod helper;
pub mod metadata;
pub mod prompt;
pub mod synthesize;

pub use apply::{apply_metadata, apply_signatures, Applied, ApplyReport};
pub use config::{
    default_search_paths, HelperConfig, BASE_UNIT, COMMON_CLASS, DISPATCH_PREFIX, EXTENDED_UNIT,
    INTERFACE_STRUCT, JNI_RESERVED_SLOTS,
};
pub use database::{AnalysisDatabase, DatabaseError, Function, MemoryDatabase, Platform};
pub use declarations::parse_declarations;
pub use error::{Error, Result};
pub use fixup::{build_sig_map, fix_dispatch_stubs, FixReport};
pub use header::{load_header, Header};
pub use helper::{JniHelper, RunReport};
pub use metadata::{MethodDescriptor, MethodMetadata};
pub use prompt::{FilePrompt, NoPrompt, ScriptedPrompt};
pub use synthesize::{synthesize, Synthesis};
