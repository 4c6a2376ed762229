//! # jnisig-formats
//!
//! ELF parsing for jnisig: reads the architecture and the defined function
//! symbols of a native library, which seed an analysis session.

pub mod arch;
pub mod elf;
pub mod error;
pub mod symbol;

pub use arch::{Architecture, Endianness};
pub use elf::{Elf, ElfClass, ElfHeader, ElfType, Machine};
pub use error::ParseError;
pub use symbol::{Symbol, SymbolBinding, SymbolKind};
