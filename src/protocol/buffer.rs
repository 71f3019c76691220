/// Module that implements the byte buffer backing packet framing and
/// payloads.
use crate::{Result, WorldgateError};
use anyhow::bail;
use byteorder::{ByteOrder, LittleEndian};

/// A growable linear buffer with independent read and write cursors,
/// satisfying `read_pos <= write_pos <= capacity`. Writing grows the
/// capacity on demand; the backing allocation never shrinks while the owning
/// connection lives. Payload primitives are little-endian.
#[derive(Clone, Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl ByteBuffer {
    pub fn new() -> ByteBuffer {
        ByteBuffer::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> ByteBuffer {
        ByteBuffer {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Wrap an already filled byte sequence for reading.
    pub fn from_vec(data: Vec<u8>) -> ByteBuffer {
        let write_pos = data.len();
        ByteBuffer {
            data,
            read_pos: 0,
            write_pos,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Unread bytes between the two cursors.
    pub fn remaining(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Bytes writable before the buffer has to grow.
    pub fn space_left(&self) -> usize {
        self.data.len() - self.write_pos
    }

    /// Set the capacity to `n` bytes without clearing data. The underlying
    /// allocation is kept when shrinking.
    pub fn resize(&mut self, n: usize) {
        self.data.resize(n, 0);
        if self.write_pos > n {
            self.write_pos = n;
        }
        if self.read_pos > n {
            self.read_pos = n;
        }
    }

    /// Reset both cursors, retaining the capacity.
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.data[self.write_pos..self.write_pos + bytes.len()].copy_from_slice(bytes);
        self.write_pos += bytes.len();
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.write(&bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write(&bytes);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut bytes = [0; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.write(&bytes);
    }

    pub fn write_i32(&mut self, value: i32) {
        let mut bytes = [0; 4];
        LittleEndian::write_i32(&mut bytes, value);
        self.write(&bytes);
    }

    pub fn write_f32(&mut self, value: f32) {
        let mut bytes = [0; 4];
        LittleEndian::write_f32(&mut bytes, value);
        self.write(&bytes);
    }

    /// Write a NUL terminated UTF-8 string.
    pub fn write_cstring(&mut self, value: &str) {
        self.write(value.as_bytes());
        self.write_u8(0);
    }

    pub fn read(&mut self, out: &mut [u8]) -> Result<()> {
        let bytes = self.read_slice(out.len())?;
        out.copy_from_slice(bytes);
        Ok(())
    }

    /// Borrow the next `len` unread bytes and advance the read cursor.
    pub fn read_slice(&mut self, len: usize) -> Result<&[u8]> {
        if self.remaining() < len {
            bail!(WorldgateError::ShortRead);
        }
        let slice = &self.data[self.read_pos..self.read_pos + len];
        self.read_pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_slice(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_slice(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_slice(8)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_slice(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_slice(4)?))
    }

    /// Read a NUL terminated UTF-8 string.
    pub fn read_cstring(&mut self) -> Result<String> {
        let unread = &self.data[self.read_pos..self.write_pos];
        match unread.iter().position(|&b| b == 0) {
            Some(end) => {
                let value = std::str::from_utf8(&unread[..end])?.to_string();
                self.read_pos += end + 1;
                Ok(value)
            }
            None => bail!(WorldgateError::ShortRead),
        }
    }

    /// All unread bytes without advancing the read cursor.
    pub fn read_ptr(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    /// Advance the read cursor without copying.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        if self.remaining() < len {
            bail!(WorldgateError::ShortRead);
        }
        self.read_pos += len;
        Ok(())
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.write_pos + additional;
        if needed > self.data.len() {
            let doubled = self.data.len() * 2;
            self.data.resize(needed.max(doubled).max(64), 0);
        }
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        ByteBuffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorldgateError;

    #[test]
    fn test_primitive_round_trips() -> Result<()> {
        let mut buffer = ByteBuffer::new();
        buffer.write_u8(0xAB);
        buffer.write_u16(0xBEEF);
        buffer.write_u32(0xDEAD_BEEF);
        buffer.write_u64(0x0123_4567_89AB_CDEF);
        buffer.write_i32(-42);
        buffer.write_f32(0.5);

        assert_eq!(buffer.read_u8()?, 0xAB);
        assert_eq!(buffer.read_u16()?, 0xBEEF);
        assert_eq!(buffer.read_u32()?, 0xDEAD_BEEF);
        assert_eq!(buffer.read_u64()?, 0x0123_4567_89AB_CDEF);
        assert_eq!(buffer.read_i32()?, -42);
        assert_eq!(buffer.read_f32()?, 0.5);
        assert_eq!(buffer.remaining(), 0);
        Ok(())
    }

    #[test]
    fn test_primitives_are_little_endian() {
        let mut buffer = ByteBuffer::new();
        buffer.write_u32(0xDEAD_BEEF);
        assert_eq!(buffer.read_ptr(), &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_cstring_round_trip() -> Result<()> {
        let mut buffer = ByteBuffer::new();
        buffer.write_cstring("TESTER");
        buffer.write_u8(0x77);

        assert_eq!(buffer.read_cstring()?, "TESTER");
        assert_eq!(buffer.read_u8()?, 0x77);
        Ok(())
    }

    #[test]
    fn test_unterminated_cstring_is_a_short_read() {
        let mut buffer = ByteBuffer::from_vec(b"TESTER".to_vec());
        let error = buffer.read_cstring().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<WorldgateError>(),
            Some(WorldgateError::ShortRead)
        ));
    }

    #[test]
    fn test_reading_past_write_cursor_fails() {
        let mut buffer = ByteBuffer::new();
        buffer.write_u16(7);

        let error = buffer.read_u32().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<WorldgateError>(),
            Some(WorldgateError::ShortRead)
        ));
    }

    #[test]
    fn test_write_grows_capacity() {
        let mut buffer = ByteBuffer::with_capacity(2);
        buffer.write(&[0u8; 100]);
        assert!(buffer.capacity() >= 100);
        assert_eq!(buffer.remaining(), 100);
    }

    #[test]
    fn test_clear_retains_capacity() {
        let mut buffer = ByteBuffer::with_capacity(32);
        buffer.write(&[1, 2, 3]);
        buffer.clear();

        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(buffer.space_left(), 32);
    }

    #[test]
    fn test_resize_keeps_data() -> Result<()> {
        let mut buffer = ByteBuffer::with_capacity(4);
        buffer.write(&[9, 8]);
        buffer.resize(16);

        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.read_u8()?, 9);
        assert_eq!(buffer.read_u8()?, 8);
        Ok(())
    }

    #[test]
    fn test_staged_fill_via_space_left() {
        // The framing code fills fixed staging buffers up to their capacity.
        let mut stage = ByteBuffer::with_capacity(6);
        stage.write(&[1, 2, 3, 4]);
        assert_eq!(stage.space_left(), 2);
        stage.write(&[5, 6]);
        assert_eq!(stage.space_left(), 0);
        assert_eq!(stage.read_ptr(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_skip_advances_read_cursor() -> Result<()> {
        let mut buffer = ByteBuffer::from_vec(vec![1, 2, 3, 4]);
        buffer.skip(2)?;
        assert_eq!(buffer.read_u8()?, 3);
        assert!(buffer.skip(2).is_err());
        Ok(())
    }
}
