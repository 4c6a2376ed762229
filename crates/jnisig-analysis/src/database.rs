//! The analysis database seam.
//!
//! The pipeline never owns the binary analysis; it reads discovered
//! functions from an [`AnalysisDatabase`] and writes types back into it.
//! [`MemoryDatabase`] is the in-process implementation used by tests and
//! dry runs.

use indexmap::IndexMap;
use jnisig_formats::{Architecture, Endianness, Symbol};
use jnisig_types::{ArchInfo, CType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors reported by a database backend.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// No function starts at the address.
    #[error("no function at {0:#x}")]
    UnknownFunction(u64),

    /// The backend failed.
    #[error("database backend error: {0}")]
    Backend(String),
}

/// Target platform of the analyzed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Architecture name (`arm64`, `arm`, ...).
    pub name: String,
    /// Data model used to lay out parsed types.
    pub arch: ArchInfo,
}

impl Platform {
    pub fn new(name: impl Into<String>, arch: ArchInfo) -> Self {
        Self {
            name: name.into(),
            arch,
        }
    }

    /// Platform for an ELF architecture.
    pub fn from_architecture(arch: Architecture, endianness: Endianness) -> Self {
        Self::new(arch.name(), arch.data_model(endianness))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::from_architecture(Architecture::Arm64, Endianness::Little)
    }
}

/// A function discovered in the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Start address.
    pub start: u64,
    /// Raw (mangled) symbol name.
    pub raw_name: String,
    /// Demangled qualified name, or the raw name.
    pub short_name: String,
}

impl Function {
    pub fn new(start: u64, raw_name: impl Into<String>) -> Self {
        let raw_name = raw_name.into();
        Self {
            start,
            short_name: jnisig_demangle::short_name(&raw_name),
            raw_name,
        }
    }

    pub fn from_symbol(symbol: &Symbol) -> Self {
        Self::new(symbol.address, &symbol.name)
    }

    /// Returns true if either name equals `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.raw_name == name || self.short_name == name
    }
}

/// Operations the signature pipeline needs from a binary analysis session.
pub trait AnalysisDatabase {
    /// Target platform.
    fn platform(&self) -> Platform;

    /// All functions, in stable enumeration order.
    ///
    /// There is one entry per symbol name: aliases of the same code (for
    /// example folded identical natives) share `start`.
    fn functions(&self) -> Result<Vec<Function>, DatabaseError>;

    /// Functions whose raw or short symbol name equals `name` exactly.
    fn functions_by_name(&self, name: &str) -> Result<Vec<Function>, DatabaseError> {
        Ok(self
            .functions()?
            .into_iter()
            .filter(|f| f.has_name(name))
            .collect())
    }

    /// Define or overwrite a named user type.
    fn define_user_type(&mut self, name: &str, ty: &CType) -> Result<(), DatabaseError>;

    /// Assign a type to the function starting at `start`.
    fn set_function_type(&mut self, start: u64, ty: &CType) -> Result<(), DatabaseError>;

    /// Request re-analysis of the function starting at `start`.
    fn reanalyze(&mut self, start: u64) -> Result<(), DatabaseError>;

    /// Open a unit of work covering one pipeline step.
    fn begin_step(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    /// Close the current step, keeping its changes if `keep` is set and
    /// discarding them otherwise.
    fn end_step(&mut self, keep: bool) -> Result<(), DatabaseError> {
        let _ = keep;
        Ok(())
    }
}

/// In-memory analysis database.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    platform: Platform,
    functions: Vec<Function>,
    user_types: IndexMap<String, CType>,
    function_types: HashMap<u64, CType>,
    reanalysis: HashMap<u64, usize>,
    checkpoint: Option<Box<MemoryDatabase>>,
}

impl MemoryDatabase {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Add a function symbol. A second name at `start` is kept as an alias.
    pub fn add_function(&mut self, start: u64, raw_name: impl Into<String>) {
        let function = Function::new(start, raw_name);
        if !self.functions.contains(&function) {
            self.functions.push(function);
        }
    }

    /// Builder form of [`add_function`](Self::add_function).
    pub fn with_function(mut self, start: u64, raw_name: impl Into<String>) -> Self {
        self.add_function(start, raw_name);
        self
    }

    /// Type assigned to the function at `start`, if any.
    pub fn function_type(&self, start: u64) -> Option<&CType> {
        self.function_types.get(&start)
    }

    /// User type defined under `name`, if any.
    pub fn user_type(&self, name: &str) -> Option<&CType> {
        self.user_types.get(name)
    }

    /// User types in definition order.
    pub fn user_types(&self) -> impl Iterator<Item = (&str, &CType)> {
        self.user_types.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn has_function(&self, start: u64) -> bool {
        self.functions.iter().any(|f| f.start == start)
    }

    /// How many times the function at `start` was re-analyzed.
    pub fn reanalysis_count(&self, start: u64) -> usize {
        self.reanalysis.get(&start).copied().unwrap_or(0)
    }
}

impl AnalysisDatabase for MemoryDatabase {
    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    fn functions(&self) -> Result<Vec<Function>, DatabaseError> {
        Ok(self.functions.clone())
    }

    fn define_user_type(&mut self, name: &str, ty: &CType) -> Result<(), DatabaseError> {
        self.user_types.insert(name.to_string(), ty.clone());
        Ok(())
    }

    fn set_function_type(&mut self, start: u64, ty: &CType) -> Result<(), DatabaseError> {
        if !self.has_function(start) {
            return Err(DatabaseError::UnknownFunction(start));
        }
        self.function_types.insert(start, ty.clone());
        Ok(())
    }

    fn reanalyze(&mut self, start: u64) -> Result<(), DatabaseError> {
        if !self.has_function(start) {
            return Err(DatabaseError::UnknownFunction(start));
        }
        *self.reanalysis.entry(start).or_default() += 1;
        Ok(())
    }

    fn begin_step(&mut self) -> Result<(), DatabaseError> {
        let mut saved = self.clone();
        saved.checkpoint = None;
        self.checkpoint = Some(Box::new(saved));
        Ok(())
    }

    fn end_step(&mut self, keep: bool) -> Result<(), DatabaseError> {
        if let Some(saved) = self.checkpoint.take() {
            if !keep {
                *self = *saved;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names() {
        let f = Function::new(0x1000, "_ZN7_JNIEnv13CallIntMethodEP8_jobjectP10_jmethodIDz");
        assert_eq!(f.short_name, "_JNIEnv::CallIntMethod");
        assert!(f.has_name("_JNIEnv::CallIntMethod"));
        assert!(f.has_name("_ZN7_JNIEnv13CallIntMethodEP8_jobjectP10_jmethodIDz"));

        let g = Function::new(0x2000, "Java_Foo_bar");
        assert_eq!(g.short_name, "Java_Foo_bar");
    }

    #[test]
    fn test_functions_by_name() {
        let db = MemoryDatabase::default()
            .with_function(0x1000, "Java_Foo_bar")
            .with_function(0x2000, "Java_Foo_baz");

        let found = db.functions_by_name("Java_Foo_baz").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, 0x2000);
        assert!(db.functions_by_name("Java_Foo_qux").unwrap().is_empty());
    }

    #[test]
    fn test_aliases_share_address() {
        let mut db = MemoryDatabase::default()
            .with_function(0x1000, "Java_Foo_a")
            .with_function(0x1000, "Java_Foo_b")
            .with_function(0x1000, "Java_Foo_b");

        assert_eq!(db.functions().unwrap().len(), 2);
        assert_eq!(db.functions_by_name("Java_Foo_a").unwrap()[0].start, 0x1000);
        assert_eq!(db.functions_by_name("Java_Foo_b").unwrap()[0].start, 0x1000);

        db.set_function_type(0x1000, &CType::int()).unwrap();
        assert_eq!(db.function_type(0x1000), Some(&CType::int()));
    }

    #[test]
    fn test_mutations() {
        let mut db = MemoryDatabase::default().with_function(0x1000, "f");

        db.define_user_type("jint", &CType::int()).unwrap();
        db.set_function_type(0x1000, &CType::void()).unwrap();
        db.reanalyze(0x1000).unwrap();
        db.reanalyze(0x1000).unwrap();

        assert_eq!(db.user_type("jint"), Some(&CType::int()));
        assert_eq!(db.function_type(0x1000), Some(&CType::void()));
        assert_eq!(db.reanalysis_count(0x1000), 2);
        assert_eq!(db.reanalysis_count(0x2000), 0);
    }

    #[test]
    fn test_discarded_step_restores_state() {
        let mut db = MemoryDatabase::default().with_function(0x1000, "f");

        db.begin_step().unwrap();
        db.define_user_type("jint", &CType::int()).unwrap();
        db.end_step(true).unwrap();

        db.begin_step().unwrap();
        db.set_function_type(0x1000, &CType::void()).unwrap();
        db.reanalyze(0x1000).unwrap();
        db.end_step(false).unwrap();

        assert_eq!(db.user_type("jint"), Some(&CType::int()));
        assert_eq!(db.function_type(0x1000), None);
        assert_eq!(db.reanalysis_count(0x1000), 0);
    }

    #[test]
    fn test_unknown_function() {
        let mut db = MemoryDatabase::default();
        assert!(matches!(
            db.set_function_type(0x10, &CType::void()),
            Err(DatabaseError::UnknownFunction(0x10))
        ));
        assert!(db.reanalyze(0x10).is_err());
    }

    #[test]
    fn test_platform_from_architecture() {
        let p = Platform::from_architecture(Architecture::Arm, Endianness::Little);
        assert_eq!(p.name, "arm");
        assert_eq!(p.arch.pointer_size, 4);
        assert_eq!(Platform::default().arch.pointer_size, 8);
    }
}
