//! Little-endian cursor over logger payloads

use std::fmt;

/// A read ran past the end of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    pub required: usize,
    pub available: usize,
}

impl fmt::Display for ShortRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "needed {} bytes but only {} available",
            self.required, self.available
        )
    }
}

/// Sequential little-endian reader; every read either succeeds whole or
/// leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, ShortRead> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.take(N)?;
            let mut buffer = [0u8; N];
            buffer.copy_from_slice(bytes);
            Ok(<$ty>::from_le_bytes(buffer))
        }
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, count: usize) -> Result<&'a [u8], ShortRead> {
        if count > self.remaining() {
            return Err(ShortRead {
                required: count,
                available: self.remaining(),
            });
        }
        let data = self.data;
        let slice = &data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ShortRead> {
        self.take(count).map(|_| ())
    }

    /// Everything not yet read
    pub fn rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let slice = &data[self.pos..];
        self.pos = data.len();
        slice
    }

    /// A u32 length prefix followed by that many bytes
    pub fn length_prefixed(&mut self) -> Result<&'a [u8], ShortRead> {
        let start = self.pos;
        let len = self.u32()? as usize;
        self.take(len).inspect_err(|_| self.pos = start)
    }

    pub fn u8(&mut self) -> Result<u8, ShortRead> {
        Ok(self.take(1)?[0])
    }

    read_le!(u16, u16);
    read_le!(u32, u32);
    read_le!(i16, i16);
    read_le!(i32, i32);
    read_le!(i64, i64);
    read_le!(f64, f64);

    /// Unsigned 24-bit value, as used by extended temperature PGNs
    pub fn u24(&mut self) -> Result<u32, ShortRead> {
        let bytes = self.take(3)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
    }
}
