//! Little-endian stream helpers.

use std::io::{Read, Write};

use super::aligned::{AlignedBuffer, Zeroable};
use super::error::NetworkError;

/// Fixed-width integers stored little-endian on disk.
pub(crate) trait LeInt: Zeroable {
    const SIZE: usize;
    fn from_le(bytes: &[u8]) -> Self;
    fn put_le(self, out: &mut Vec<u8>);
}

macro_rules! le_int {
    ($($t:ty),*) => {
        $(
            impl LeInt for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn from_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }

                #[inline]
                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

le_int!(u8, i8, i16, i32);

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32, NetworkError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<(), NetworkError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Fill `dst` from the stream; fails with `Truncated` if it runs dry.
pub(crate) fn read_into<T: LeInt, R: Read>(
    reader: &mut R,
    dst: &mut AlignedBuffer<T>,
) -> Result<(), NetworkError> {
    let mut bytes = vec![0u8; dst.len() * T::SIZE];
    reader.read_exact(&mut bytes)?;
    for (slot, chunk) in dst.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        *slot = T::from_le(chunk);
    }
    Ok(())
}

pub(crate) fn write_from<T: LeInt, W: Write>(
    writer: &mut W,
    src: &[T],
) -> Result<(), NetworkError> {
    let mut bytes = Vec::with_capacity(src.len() * T::SIZE);
    for &v in src {
        v.put_le(&mut bytes);
    }
    writer.write_all(&bytes)?;
    Ok(())
}

/// Succeeds only if the stream has no bytes left.
pub(crate) fn expect_eof<R: Read>(reader: &mut R) -> Result<(), NetworkError> {
    let mut probe = [0u8; 1];
    loop {
        match reader.read(&mut probe) {
            Ok(0) => return Ok(()),
            Ok(_) => return Err(NetworkError::TrailingBytes),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
}
