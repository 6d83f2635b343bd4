//! Non-volatile byte storage trait
//!
//! The persistence layer only needs to read and write byte ranges at fixed
//! offsets. Erase granularity, wear and caching belong to the implementation.

/// Errors that can occur with storage access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Range extends past the end of the device
    OutOfRange,
    /// Underlying device reported a failure
    Io,
}

/// Byte addressable non-volatile storage
pub trait NvStorage {
    /// Total size in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

/// RAM-backed storage
///
/// Starts out erased (all `0xFF`), like fresh flash. Used on the host and as
/// the write-back shadow in front of real flash.
#[derive(Debug, Clone)]
pub struct RamStorage<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStorage<N> {
    /// Create an erased storage area
    pub const fn new() -> Self {
        Self { bytes: [0xFF; N] }
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw contents, mutable
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn range(offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfRange)?;
        if end > N {
            return Err(StorageError::OutOfRange);
        }
        Ok(offset..end)
    }
}

impl<const N: usize> NvStorage for RamStorage<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_erased() {
        let storage = RamStorage::<16>::new();
        assert!(storage.as_bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_write_then_read() {
        let mut storage = RamStorage::<16>::new();
        storage.write(4, &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 3];
        storage.read(4, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_out_of_range() {
        let mut storage = RamStorage::<16>::new();
        let mut buf = [0u8; 4];
        assert_eq!(storage.read(14, &mut buf), Err(StorageError::OutOfRange));
        assert_eq!(storage.write(usize::MAX, &[0]), Err(StorageError::OutOfRange));
        // Nothing was written
        assert!(storage.as_bytes().iter().all(|&b| b == 0xFF));
    }
}
