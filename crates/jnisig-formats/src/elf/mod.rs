//! ELF (Executable and Linkable Format) parser.
//!
//! Supports 32-bit and 64-bit files of either byte order. Only the parts
//! needed to enumerate function symbols are parsed: the header, section
//! headers, and the `.symtab` / `.dynsym` symbol tables.

mod header;
mod reader;
mod section;
mod symbol;

pub use header::{ElfClass, ElfHeader, ElfType, Machine, ELF_MAGIC};
pub use section::SectionHeader;
pub use symbol::SymbolEntry;

use crate::{Architecture, Endianness, ParseError, Symbol};
use jnisig_types::ArchInfo;
use std::collections::HashSet;

/// A parsed ELF binary.
#[derive(Debug)]
pub struct Elf<'a> {
    /// Raw bytes of the file.
    data: &'a [u8],
    /// Parsed ELF header.
    pub header: ElfHeader,
    /// Section headers.
    pub sections: Vec<SectionHeader>,
    /// Parsed symbols from all symbol tables, in table order.
    symbols: Vec<Symbol>,
}

impl<'a> Elf<'a> {
    /// Parse an ELF file from raw bytes.
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        let header = ElfHeader::parse(data)?;
        let mut sections = Self::parse_section_headers(data, &header)?;

        let shstrndx = header.e_shstrndx as usize;
        let section_names = sections
            .get(shstrndx)
            .filter(|_| shstrndx > 0)
            .and_then(|s| s.data(data))
            .map(StringTable::new)
            .unwrap_or_else(StringTable::empty);
        for section in &mut sections {
            if let Some(name) = section_names.get(section.sh_name as usize) {
                section.name = name.to_string();
            }
        }

        let symbols = Self::parse_symbols(data, &sections, &header)?;

        Ok(Self {
            data,
            header,
            sections,
            symbols,
        })
    }

    fn parse_section_headers(
        data: &[u8],
        header: &ElfHeader,
    ) -> Result<Vec<SectionHeader>, ParseError> {
        let mut sections = Vec::with_capacity(header.e_shnum as usize);
        let entsize = header.e_shentsize as usize;
        let mut offset = usize::try_from(header.e_shoff).map_err(|_| {
            ParseError::invalid_structure("section header table", header.e_shoff, "offset too large")
        })?;

        for _ in 0..header.e_shnum {
            let end = offset.saturating_add(entsize);
            if end > data.len() {
                return Err(ParseError::too_short(end, data.len()));
            }
            let section = SectionHeader::parse(&data[offset..end], header.class, header.endianness)?;
            sections.push(section);
            offset = end;
        }

        Ok(sections)
    }

    fn parse_symbols(
        data: &[u8],
        sections: &[SectionHeader],
        header: &ElfHeader,
    ) -> Result<Vec<Symbol>, ParseError> {
        let mut symbols = Vec::new();
        let min_entry = SymbolEntry::entry_size(header.class);

        for section in sections.iter().filter(|s| s.is_symbol_table()) {
            let Some(strtab) = sections
                .get(section.sh_link as usize)
                .and_then(|s| s.data(data))
                .map(StringTable::new)
            else {
                continue;
            };
            let Some(table) = section.data(data) else {
                continue;
            };

            let entry_size = section.sh_entsize as usize;
            if entry_size < min_entry {
                return Err(ParseError::invalid_structure(
                    "symbol table",
                    section.sh_offset,
                    format!("entry size {} smaller than {}", entry_size, min_entry),
                ));
            }

            for chunk in table.chunks_exact(entry_size) {
                let entry = SymbolEntry::parse(chunk, header.class, header.endianness)?;
                let name = strtab.get(entry.st_name as usize).unwrap_or("").to_string();
                symbols.push(entry.to_symbol(name));
            }
        }

        Ok(symbols)
    }

    /// Raw file bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the architecture for this ELF.
    pub fn architecture(&self) -> Architecture {
        self.header.architecture()
    }

    /// Returns the byte order.
    pub fn endianness(&self) -> Endianness {
        self.header.endianness
    }

    /// C data model for laying out types for this binary.
    pub fn data_model(&self) -> ArchInfo {
        self.architecture().data_model(self.endianness())
    }

    /// All symbols, in symbol table order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Defined, named function symbols from `.symtab` and `.dynsym`.
    ///
    /// Symbols that appear in both tables are reported once. On 32-bit ARM
    /// the Thumb bit is cleared from addresses.
    pub fn functions(&self) -> Vec<Symbol> {
        let thumb = self.architecture() == Architecture::Arm;
        let mut seen = HashSet::new();
        let mut functions = Vec::new();

        for sym in &self.symbols {
            if !sym.is_function() || !sym.is_defined() || sym.name.is_empty() {
                continue;
            }
            let mut sym = sym.clone();
            if thumb {
                sym.address &= !1;
            }
            if seen.insert((sym.address, sym.name.clone())) {
                functions.push(sym);
            }
        }

        functions
    }

    /// Find a section by name.
    pub fn section_by_name(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// String table helper.
#[derive(Debug)]
struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn empty() -> Self {
        Self { data: &[] }
    }

    fn get(&self, offset: usize) -> Option<&'a str> {
        let remaining = self.data.get(offset..)?;
        let end = remaining.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&remaining[..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_table() {
        let table = StringTable::new(b"\0.text\0foo\0");
        assert_eq!(table.get(0), Some(""));
        assert_eq!(table.get(1), Some(".text"));
        assert_eq!(table.get(7), Some("foo"));
        assert_eq!(table.get(100), None);
        assert_eq!(StringTable::empty().get(0), None);
    }
}
