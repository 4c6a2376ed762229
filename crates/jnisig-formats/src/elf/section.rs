//! ELF section header parsing.

use super::header::ElfClass;
use super::reader::Reader;
use crate::{Endianness, ParseError};

pub const SHT_NULL: u32 = 0;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_DYNSYM: u32 = 11;

pub const SHF_EXECINSTR: u64 = 0x4;

/// A parsed section header.
#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// Section name (resolved from the section name string table).
    pub name: String,
    /// Section name (index into string table).
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    /// Link to another section (string table for symbol tables).
    pub sh_link: u32,
    /// Entry size (for tables).
    pub sh_entsize: u64,
}

impl SectionHeader {
    /// Parse a section header from bytes.
    pub fn parse(data: &[u8], class: ElfClass, endianness: Endianness) -> Result<Self, ParseError> {
        let r = Reader::new(data, endianness, "section header");
        match class {
            ElfClass::Elf32 => Ok(Self {
                name: String::new(),
                sh_name: r.u32(0)?,
                sh_type: r.u32(4)?,
                sh_flags: r.u32(8)? as u64,
                sh_addr: r.u32(12)? as u64,
                sh_offset: r.u32(16)? as u64,
                sh_size: r.u32(20)? as u64,
                sh_link: r.u32(24)?,
                sh_entsize: r.u32(36)? as u64,
            }),
            ElfClass::Elf64 => Ok(Self {
                name: String::new(),
                sh_name: r.u32(0)?,
                sh_type: r.u32(4)?,
                sh_flags: r.u64(8)?,
                sh_addr: r.u64(16)?,
                sh_offset: r.u64(24)?,
                sh_size: r.u64(32)?,
                sh_link: r.u32(40)?,
                sh_entsize: r.u64(56)?,
            }),
        }
    }

    /// File bytes of this section, if in bounds. NOBITS sections have none.
    pub fn data<'a>(&self, file: &'a [u8]) -> Option<&'a [u8]> {
        if self.sh_type == SHT_NOBITS {
            return None;
        }
        let start = usize::try_from(self.sh_offset).ok()?;
        let end = start.checked_add(usize::try_from(self.sh_size).ok()?)?;
        file.get(start..end)
    }

    /// Returns true for `.symtab` and `.dynsym`.
    pub fn is_symbol_table(&self) -> bool {
        self.sh_type == SHT_SYMTAB || self.sh_type == SHT_DYNSYM
    }

    pub fn is_executable(&self) -> bool {
        self.sh_flags & SHF_EXECINSTR != 0
    }
}
