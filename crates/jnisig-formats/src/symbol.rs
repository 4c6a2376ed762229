//! Symbol representation.

use serde::{Deserialize, Serialize};

/// A symbol from the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Raw symbol name as stored in the string table.
    pub name: String,
    /// Address of the symbol.
    pub address: u64,
    /// Size of the symbol (0 if unknown).
    pub size: u64,
    /// Type of symbol.
    pub kind: SymbolKind,
    /// Symbol binding.
    pub binding: SymbolBinding,
    /// Section index (None for undefined symbols).
    pub section_index: Option<u32>,
}

impl Symbol {
    /// Returns true if this symbol is defined in the binary.
    pub fn is_defined(&self) -> bool {
        self.section_index.is_some()
    }

    /// Returns true if this is a function symbol.
    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }
}

/// Symbol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    None,
    Object,
    Function,
    Section,
    File,
    Common,
    Tls,
    Other(u8),
}

/// Symbol binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolBinding {
    Local,
    Global,
    Weak,
    Other(u8),
}
