//! Architecture identification and data models.

use crate::ParseError;
use jnisig_types::ArchInfo;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CPU architectures found in Android native libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    /// x86-64 / AMD64
    X86_64,
    /// 32-bit x86
    X86,
    /// ARM 64-bit (AArch64)
    Arm64,
    /// ARM 32-bit
    Arm,
    /// RISC-V 64-bit
    RiscV64,
    /// RISC-V 32-bit
    RiscV32,
    /// Unknown ELF machine
    Unknown(u16),
}

impl Architecture {
    /// Returns the pointer size in bytes for this architecture.
    pub fn pointer_size(&self) -> usize {
        match self {
            Self::X86_64 | Self::Arm64 | Self::RiscV64 => 8,
            Self::X86 | Self::Arm | Self::RiscV32 => 4,
            Self::Unknown(_) => 8,
        }
    }

    /// Returns whether this is a 64-bit architecture.
    pub fn is_64bit(&self) -> bool {
        self.pointer_size() == 8
    }

    /// Returns the name of this architecture.
    pub fn name(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
            Self::RiscV64 => "riscv64",
            Self::RiscV32 => "riscv32",
            Self::Unknown(_) => "unknown",
        }
    }

    /// C data model used to lay out JNI structures for this architecture.
    pub fn data_model(&self, endianness: Endianness) -> ArchInfo {
        let base = match self {
            Self::X86 => ArchInfo::ilp32_i386(),
            Self::Arm | Self::RiscV32 => ArchInfo::ilp32(),
            Self::X86_64 | Self::Arm64 | Self::RiscV64 | Self::Unknown(_) => ArchInfo::lp64(),
        };
        ArchInfo {
            big_endian: endianness == Endianness::Big,
            ..base
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(machine) => write!(f, "unknown({})", machine),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for Architecture {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            "x86" | "i386" | "i686" => Ok(Self::X86),
            "arm64" | "aarch64" | "arm64-v8a" => Ok(Self::Arm64),
            "arm" | "armv7" | "armeabi-v7a" | "thumb2" => Ok(Self::Arm),
            "riscv64" => Ok(Self::RiscV64),
            "riscv32" => Ok(Self::RiscV32),
            _ => Err(ParseError::UnknownArchitecture(s.to_string())),
        }
    }
}

/// Byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}
