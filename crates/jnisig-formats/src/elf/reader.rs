//! Bounds-checked, endian-aware field reads.

use crate::{Endianness, ParseError};

#[derive(Clone, Copy)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    endianness: Endianness,
    context: &'static str,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], endianness: Endianness, context: &'static str) -> Self {
        Self {
            data,
            endianness,
            context,
        }
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], ParseError> {
        offset
            .checked_add(N)
            .and_then(|end| self.data.get(offset..end))
            .and_then(|slice| slice.try_into().ok())
            .ok_or(ParseError::TruncatedData {
                expected: offset.saturating_add(N),
                actual: self.data.len(),
                context: self.context,
            })
    }

    pub(crate) fn u8(&self, offset: usize) -> Result<u8, ParseError> {
        Ok(self.bytes::<1>(offset)?[0])
    }

    pub(crate) fn u16(&self, offset: usize) -> Result<u16, ParseError> {
        let bytes = self.bytes(offset)?;
        Ok(match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    pub(crate) fn u32(&self, offset: usize) -> Result<u32, ParseError> {
        let bytes = self.bytes(offset)?;
        Ok(match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        })
    }

    pub(crate) fn u64(&self, offset: usize) -> Result<u64, ParseError> {
        let bytes = self.bytes(offset)?;
        Ok(match self.endianness {
            Endianness::Little => u64::from_le_bytes(bytes),
            Endianness::Big => u64::from_be_bytes(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endianness() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(Reader::new(&data, Endianness::Little, "t").u16(0).unwrap(), 0x3412);
        assert_eq!(Reader::new(&data, Endianness::Big, "t").u32(0).unwrap(), 0x12345678);
    }

    #[test]
    fn test_out_of_bounds() {
        let data = [0u8; 4];
        let reader = Reader::new(&data, Endianness::Little, "symbol");
        assert!(matches!(
            reader.u64(0),
            Err(ParseError::TruncatedData { context: "symbol", .. })
        ));
        assert!(reader.u8(usize::MAX).is_err());
    }
}
