//! # jnisig-types
//!
//! C type model and declaration parsing for jnisig.
//!
//! This crate provides:
//! - C type representation (structs, unions, enums, functions, named references)
//! - [`ParsedUnit`], the ordered type and function tables of one source unit
//! - A C declaration parser covering JNI headers, with structured diagnostics
//!
//! # Example
//!
//! ```
//! use jnisig_types::{parse_source, ArchInfo, ParserOptions};
//!
//! let src = "typedef int jint;\ntypedef void *jobject;\njint Java_Foo_bar(void *, jobject);";
//! let unit = parse_source(src, "jni_ext.h", ParserOptions::jni(), ArchInfo::lp64()).unwrap();
//!
//! let f = unit.get_function("Java_Foo_bar").unwrap();
//! assert_eq!(f.signature.parameters.len(), 2);
//! ```

pub mod parser;
pub mod types;
pub mod unit;

pub use parser::{
    parse_header, parse_source, Diagnostic, ParseError, ParseFailure, ParseResult, Parser,
    ParserOptions,
};
pub use types::*;
pub use unit::{FunctionEntry, ParsedUnit, TypeEntry, TypeKind, UnitStats};
