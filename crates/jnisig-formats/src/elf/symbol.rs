//! ELF symbol table parsing.

use super::header::ElfClass;
use super::reader::Reader;
use crate::{Endianness, ParseError, Symbol, SymbolBinding, SymbolKind};

// Symbol binding (upper 4 bits of st_info)
const STB_LOCAL: u8 = 0;
const STB_GLOBAL: u8 = 1;
const STB_WEAK: u8 = 2;

// Symbol type (lower 4 bits of st_info)
const STT_NOTYPE: u8 = 0;
const STT_OBJECT: u8 = 1;
const STT_FUNC: u8 = 2;
const STT_SECTION: u8 = 3;
const STT_FILE: u8 = 4;
const STT_COMMON: u8 = 5;
const STT_TLS: u8 = 6;

// Special section indices
pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xfff1;

/// A raw symbol table entry.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    /// Symbol name (index into string table).
    pub st_name: u32,
    /// Symbol info (type and binding).
    pub st_info: u8,
    /// Section index.
    pub st_shndx: u16,
    /// Symbol value (address).
    pub st_value: u64,
    /// Symbol size.
    pub st_size: u64,
}

impl SymbolEntry {
    /// Size of one entry for the given class.
    pub fn entry_size(class: ElfClass) -> usize {
        match class {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    /// Parse a symbol entry from bytes.
    pub fn parse(data: &[u8], class: ElfClass, endianness: Endianness) -> Result<Self, ParseError> {
        let r = Reader::new(data, endianness, "symbol");
        match class {
            ElfClass::Elf32 => Ok(Self {
                st_name: r.u32(0)?,
                st_value: r.u32(4)? as u64,
                st_size: r.u32(8)? as u64,
                st_info: r.u8(12)?,
                st_shndx: r.u16(14)?,
            }),
            ElfClass::Elf64 => Ok(Self {
                st_name: r.u32(0)?,
                st_info: r.u8(4)?,
                st_shndx: r.u16(6)?,
                st_value: r.u64(8)?,
                st_size: r.u64(16)?,
            }),
        }
    }

    /// Returns the symbol binding.
    pub fn binding(&self) -> SymbolBinding {
        match self.st_info >> 4 {
            STB_LOCAL => SymbolBinding::Local,
            STB_GLOBAL => SymbolBinding::Global,
            STB_WEAK => SymbolBinding::Weak,
            other => SymbolBinding::Other(other),
        }
    }

    /// Returns the symbol type.
    pub fn kind(&self) -> SymbolKind {
        match self.st_info & 0xf {
            STT_NOTYPE => SymbolKind::None,
            STT_OBJECT => SymbolKind::Object,
            STT_FUNC => SymbolKind::Function,
            STT_SECTION => SymbolKind::Section,
            STT_FILE => SymbolKind::File,
            STT_COMMON => SymbolKind::Common,
            STT_TLS => SymbolKind::Tls,
            other => SymbolKind::Other(other),
        }
    }

    /// Converts this entry to a Symbol.
    pub fn to_symbol(&self, name: String) -> Symbol {
        Symbol {
            name,
            address: self.st_value,
            size: self.st_size,
            kind: self.kind(),
            binding: self.binding(),
            section_index: if self.st_shndx == SHN_UNDEF || self.st_shndx == SHN_ABS {
                None
            } else {
                Some(self.st_shndx as u32)
            },
        }
    }
}
