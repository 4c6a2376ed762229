//! ELF header parsing.

use super::reader::Reader;
use crate::{Architecture, Endianness, ParseError};

/// ELF magic bytes.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class (32-bit or 64-bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

/// ELF file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfType {
    None,
    Relocatable,
    Executable,
    SharedObject,
    Core,
    Other(u16),
}

impl From<u16> for ElfType {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Relocatable,
            2 => Self::Executable,
            3 => Self::SharedObject,
            4 => Self::Core,
            other => Self::Other(other),
        }
    }
}

/// Machine architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    None,
    X86,
    X86_64,
    Arm,
    Arm64,
    RiscV,
    Other(u16),
}

impl Machine {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::None,
            3 => Self::X86,
            40 => Self::Arm,
            62 => Self::X86_64,
            183 => Self::Arm64,
            243 => Self::RiscV,
            other => Self::Other(other),
        }
    }
}

/// Parsed ELF header. Only the fields needed to find section headers are kept.
#[derive(Debug, Clone)]
pub struct ElfHeader {
    pub class: ElfClass,
    pub endianness: Endianness,
    pub file_type: ElfType,
    pub machine: Machine,
    /// Entry point virtual address.
    pub e_entry: u64,
    /// Section header table file offset.
    pub e_shoff: u64,
    /// Section header table entry size.
    pub e_shentsize: u16,
    /// Section header table entry count.
    pub e_shnum: u16,
    /// Section name string table index.
    pub e_shstrndx: u16,
}

impl ElfHeader {
    const EI_NIDENT: usize = 16;
    const ELF32_HEADER_SIZE: usize = 52;
    const ELF64_HEADER_SIZE: usize = 64;

    /// Parse an ELF header from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::EI_NIDENT {
            return Err(ParseError::too_short(Self::EI_NIDENT, data.len()));
        }

        if data[0..4] != ELF_MAGIC {
            return Err(ParseError::invalid_magic("ELF", &data[0..4]));
        }

        let class = match data[4] {
            1 => ElfClass::Elf32,
            2 => ElfClass::Elf64,
            other => {
                return Err(ParseError::invalid_structure(
                    "ELF header",
                    4,
                    format!("invalid ELF class: {}", other),
                ))
            }
        };

        let endianness = match data[5] {
            1 => Endianness::Little,
            2 => Endianness::Big,
            other => {
                return Err(ParseError::invalid_structure(
                    "ELF header",
                    5,
                    format!("invalid endianness: {}", other),
                ))
            }
        };

        let header_size = match class {
            ElfClass::Elf32 => Self::ELF32_HEADER_SIZE,
            ElfClass::Elf64 => Self::ELF64_HEADER_SIZE,
        };
        if data.len() < header_size {
            return Err(ParseError::too_short(header_size, data.len()));
        }

        let r = Reader::new(data, endianness, "ELF header");
        let file_type = ElfType::from(r.u16(16)?);
        let machine = Machine::from_u16(r.u16(18)?);

        match class {
            ElfClass::Elf32 => Ok(Self {
                class,
                endianness,
                file_type,
                machine,
                e_entry: r.u32(24)? as u64,
                e_shoff: r.u32(32)? as u64,
                e_shentsize: r.u16(46)?,
                e_shnum: r.u16(48)?,
                e_shstrndx: r.u16(50)?,
            }),
            ElfClass::Elf64 => Ok(Self {
                class,
                endianness,
                file_type,
                machine,
                e_entry: r.u64(24)?,
                e_shoff: r.u64(40)?,
                e_shentsize: r.u16(58)?,
                e_shnum: r.u16(60)?,
                e_shstrndx: r.u16(62)?,
            }),
        }
    }

    /// Returns the architecture for this ELF.
    pub fn architecture(&self) -> Architecture {
        match (self.machine, self.class) {
            (Machine::X86_64, _) => Architecture::X86_64,
            (Machine::X86, _) => Architecture::X86,
            (Machine::Arm64, _) => Architecture::Arm64,
            (Machine::Arm, _) => Architecture::Arm,
            (Machine::RiscV, ElfClass::Elf64) => Architecture::RiscV64,
            (Machine::RiscV, ElfClass::Elf32) => Architecture::RiscV32,
            (Machine::Other(m), _) => Architecture::Unknown(m),
            (Machine::None, _) => Architecture::Unknown(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elf64_header() {
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(&ELF_MAGIC);
        data[4] = 2;
        data[5] = 1;
        data[6] = 1;
        // Type: shared object
        data[16] = 3;
        // Machine: aarch64 (183)
        data[18] = 183;
        data[40..48].copy_from_slice(&0x2000u64.to_le_bytes());
        data[60] = 5;

        let header = ElfHeader::parse(&data).unwrap();
        assert_eq!(header.class, ElfClass::Elf64);
        assert_eq!(header.endianness, Endianness::Little);
        assert_eq!(header.file_type, ElfType::SharedObject);
        assert_eq!(header.e_shoff, 0x2000);
        assert_eq!(header.e_shnum, 5);
        assert_eq!(header.architecture(), Architecture::Arm64);
    }

    #[test]
    fn test_parse_elf32_big_endian_header() {
        let mut data = vec![0u8; 52];
        data[0..4].copy_from_slice(&ELF_MAGIC);
        data[4] = 1;
        data[5] = 2;
        // Machine: ARM (40), big-endian
        data[19] = 40;
        data[32..36].copy_from_slice(&0x100u32.to_be_bytes());

        let header = ElfHeader::parse(&data).unwrap();
        assert_eq!(header.class, ElfClass::Elf32);
        assert_eq!(header.endianness, Endianness::Big);
        assert_eq!(header.e_shoff, 0x100);
        assert_eq!(header.architecture(), Architecture::Arm);
    }

    #[test]
    fn test_reject_invalid_magic() {
        let result = ElfHeader::parse(b"NOT_AN_ELF_FILE!");
        assert!(matches!(result, Err(ParseError::InvalidMagic { .. })));
    }

    #[test]
    fn test_reject_too_short() {
        let result = ElfHeader::parse(b"\x7fELF");
        assert!(matches!(result, Err(ParseError::TooShort { .. })));

        let mut data = vec![0u8; 20];
        data[0..4].copy_from_slice(&ELF_MAGIC);
        data[4] = 2;
        data[5] = 1;
        assert!(matches!(
            ElfHeader::parse(&data),
            Err(ParseError::TooShort { expected: 64, .. })
        ));
    }

    #[test]
    fn test_reject_bad_class() {
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(&ELF_MAGIC);
        data[4] = 9;
        assert!(matches!(
            ElfHeader::parse(&data),
            Err(ParseError::InvalidStructure { offset: 4, .. })
        ));
    }
}
