//! Bounds-checked reading over the flat metadata buffers
//!
//! The value table is walked with a [`MetadataCursor`]; every string it
//! references is an offset into the name table, resolved through a
//! [`NameTable`]. Layout knowledge lives here and in the writer only.

use crate::entry::{flags, MetadataEntry, PropertyEntry};
use crate::error::DecodeError;

/// Read-only view over the name table
#[derive(Debug, Clone, Copy)]
pub struct NameTable<'a> {
    buffer: &'a [u8],
}

impl<'a> NameTable<'a> {
    /// Wrap a name table buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    /// Read the length-prefixed name stored at `offset`
    pub fn name_at(&self, offset: u32) -> Result<String, DecodeError> {
        let mut cursor = MetadataCursor::new(self.buffer);
        cursor.seek(offset as usize);
        let len = cursor.read_u16()? as usize;
        let bytes = cursor.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(offset as usize))
    }
}

/// Cursor over a little-endian metadata buffer
pub struct MetadataCursor<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> MetadataCursor<'a> {
    /// Create a cursor at offset 0
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Create a cursor at `position`
    pub fn at(buffer: &'a [u8], position: usize) -> Self {
        Self { buffer, position }
    }

    /// Get the current position in the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the remaining bytes in the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Seek to a specific position
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    // ===== Primitives =====

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .buffer
            .get(self.position)
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        self.position += 1;
        Ok(byte)
    }

    /// Read a 16-bit unsigned integer (little-endian)
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a 32-bit unsigned integer (little-endian)
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borrow the next `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(count)
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        if end > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    // ===== Entries =====

    /// Read a method entry: name, signature, parameter count, flags
    pub fn read_method_entry(&mut self, names: &NameTable<'_>, is_static: bool) -> Result<MetadataEntry, DecodeError> {
        let name = names.name_at(self.read_u32()?)?;
        let signature = names.name_at(self.read_u32()?)?;
        let param_count = self.read_u16()? as usize;
        let bits = self.read_u8()?;
        Ok(MetadataEntry::method(name, signature, param_count)
            .with_static(is_static)
            .with_final(bits & flags::FINAL != 0))
    }

    /// Read an extension function entry: a method entry followed by its declaring type
    pub fn read_extension_entry(&mut self, names: &NameTable<'_>) -> Result<MetadataEntry, DecodeError> {
        let entry = self.read_method_entry(names, false)?;
        let declaring = names.name_at(self.read_u32()?)?;
        Ok(entry.with_extension(declaring))
    }

    /// Read a field entry: name, signature, flags
    pub fn read_field_entry(&mut self, names: &NameTable<'_>, is_static: bool) -> Result<MetadataEntry, DecodeError> {
        let name = names.name_at(self.read_u32()?)?;
        let signature = names.name_at(self.read_u32()?)?;
        let bits = self.read_u8()?;
        Ok(MetadataEntry::field(name, signature)
            .with_static(is_static)
            .with_final(bits & flags::FINAL != 0))
    }

    /// Read a property entry: name, then optional getter and setter method entries
    pub fn read_property_entry(&mut self, names: &NameTable<'_>) -> Result<PropertyEntry, DecodeError> {
        let name = names.name_at(self.read_u32()?)?;
        let getter = if self.read_u16()? != 0 {
            Some(self.read_method_entry(names, false)?)
        } else {
            None
        };
        let setter = if self.read_u16()? != 0 {
            Some(self.read_method_entry(names, false)?)
        } else {
            None
        };
        Ok(PropertyEntry { name, getter, setter })
    }

    /// Read a u16 count followed by that many entries
    pub fn read_section<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.read_u16()? as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }
}
