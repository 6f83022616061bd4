use crate::error::{PpttError, PpttResult};

/// The `ByteWriter` trait provides bounds-checked little-endian writes of
/// u8/u16/u32 fields into a u8 slice. The table structures are packed, so all
/// fields are written byte by byte rather than through typed references.
pub(crate) trait ByteWriter {
    fn write8(&mut self, index: usize, value: u8) -> PpttResult<()>;
    fn write16(&mut self, index: usize, value: u16) -> PpttResult<()>;
    fn write32(&mut self, index: usize, value: u32) -> PpttResult<()>;
    fn write_bytes(&mut self, index: usize, bytes: &[u8]) -> PpttResult<()>;
    fn write32_with(&mut self, index: &mut usize, value: u32) -> PpttResult<()>;
}

impl ByteWriter for [u8] {
    fn write8(&mut self, index: usize, value: u8) -> PpttResult<()> {
        self.write_bytes(index, &[value])
    }

    fn write16(&mut self, index: usize, value: u16) -> PpttResult<()> {
        self.write_bytes(index, &value.to_le_bytes())
    }

    fn write32(&mut self, index: usize, value: u32) -> PpttResult<()> {
        self.write_bytes(index, &value.to_le_bytes())
    }

    fn write_bytes(&mut self, index: usize, bytes: &[u8]) -> PpttResult<()> {
        let len = self.len();
        match index.checked_add(bytes.len()) {
            Some(end) if end <= len => {
                self[index..end].copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(PpttError::BufferOverflow { index, len }),
        }
    }

    fn write32_with(&mut self, index: &mut usize, value: u32) -> PpttResult<()> {
        self.write32(*index, value)?;
        *index += core::mem::size_of::<u32>();
        Ok(())
    }
}
