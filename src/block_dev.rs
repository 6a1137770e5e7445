use crate::config::BLOCK_SIZE;
use crate::error::Result;

/// Fixed-size block I/O capability consumed by the engine.
///
/// Addresses are absolute block indices into the container; the engine never
/// hands a byte offset to the device.
pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks the device can address.
    fn num_blocks(&self) -> usize;

    /// Reads one block into `buf`.
    fn read_block(&self, block_id: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes one block from `buf`.
    fn write_block(&self, block_id: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()>;

    /// Pushes any buffered writes down to stable storage.
    fn flush(&self) -> Result<()>;

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}
