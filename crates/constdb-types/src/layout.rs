use crate::mode::{Mode, CDB64_MAGIC};

/// Number of independent hash tables in every file.
pub const NUM_BUCKETS: usize = 256;

/// Byte width of length fields and pointers in the standard format.
const BASE_FIELD_SIZE: usize = 4;

/// Field widths and region sizes derived from a [`Mode`].
///
/// On-disk layout:
/// ```text
/// [0 .. header_size)            header table: 256 x (bucket offset, slot count)
/// [header_size .. bucket0)      records: keylen | datalen | key | value
/// [bucket0 .. end)              slot tables: hash | record offset
/// [end .. end + 8)              "cdb64:01", 64-bit files only
/// ```
/// All integers are little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    mode: Mode,
    length_size: usize,
    hashptr_size: usize,
}

impl Layout {
    pub const fn new(mode: Mode) -> Self {
        let scale = match mode {
            Mode::Bits32 => 1,
            Mode::Bits64 => 2,
        };
        Self {
            mode,
            length_size: BASE_FIELD_SIZE * scale,
            hashptr_size: BASE_FIELD_SIZE * scale,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Width of a key or value length field.
    pub fn length_size(&self) -> usize {
        self.length_size
    }

    /// Width of a pointer or stored hash field.
    pub fn hashptr_size(&self) -> usize {
        self.hashptr_size
    }

    /// Width of one slot-table entry (and of one header-table entry).
    pub fn slot_size(&self) -> usize {
        self.hashptr_size + self.length_size
    }

    /// Width of the `keylen | datalen` prefix on each record.
    pub fn record_header_size(&self) -> usize {
        2 * self.length_size
    }

    /// Size of the header table region at the start of the file.
    pub fn hash_size(&self) -> usize {
        NUM_BUCKETS * self.slot_size()
    }

    /// Bytes appended after the slot tables.
    pub fn trailer(&self) -> Option<&'static [u8]> {
        match self.mode {
            Mode::Bits32 => None,
            Mode::Bits64 => Some(CDB64_MAGIC),
        }
    }

    /// Largest value a length or pointer field can hold.
    pub fn max_field_value(&self) -> u64 {
        match self.mode {
            Mode::Bits32 => u64::from(u32::MAX),
            Mode::Bits64 => u64::MAX,
        }
    }

    /// Append `value` as a little-endian field of `width` bytes.
    ///
    /// The caller guarantees `value` fits in `width`.
    pub fn put_field(buf: &mut Vec<u8>, width: usize, value: u64) {
        buf.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    /// Read a little-endian field of `width` bytes from the front of `bytes`.
    pub fn get_field(bytes: &[u8], width: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&bytes[..width]);
        u64::from_le_bytes(buf)
    }

    /// Encode a record's `keylen | datalen` prefix.
    pub fn encode_record_header(&self, buf: &mut Vec<u8>, key_len: u64, value_len: u64) {
        Self::put_field(buf, self.length_size, key_len);
        Self::put_field(buf, self.length_size, value_len);
    }

    /// Decode a record prefix into `(key_len, value_len)`.
    pub fn decode_record_header(&self, bytes: &[u8]) -> (u64, u64) {
        let key_len = Self::get_field(bytes, self.length_size);
        let value_len = Self::get_field(&bytes[self.length_size..], self.length_size);
        (key_len, value_len)
    }

    /// Encode one slot: stored hash then record offset.
    pub fn encode_slot(&self, buf: &mut Vec<u8>, hash: u64, record_offset: u64) {
        Self::put_field(buf, self.hashptr_size, hash);
        Self::put_field(buf, self.length_size, record_offset);
    }

    /// Decode one slot into `(hash, record_offset)`.
    pub fn decode_slot(&self, bytes: &[u8]) -> (u64, u64) {
        let hash = Self::get_field(bytes, self.hashptr_size);
        let record_offset = Self::get_field(&bytes[self.hashptr_size..], self.length_size);
        (hash, record_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_32() {
        let layout = Layout::new(Mode::Bits32);
        assert_eq!(layout.length_size(), 4);
        assert_eq!(layout.hashptr_size(), 4);
        assert_eq!(layout.slot_size(), 8);
        assert_eq!(layout.record_header_size(), 8);
        assert_eq!(layout.hash_size(), 2048);
        assert!(layout.trailer().is_none());
        assert_eq!(layout.max_field_value(), u32::MAX as u64);
    }

    #[test]
    fn widths_64() {
        let layout = Layout::new(Mode::Bits64);
        assert_eq!(layout.length_size(), 8);
        assert_eq!(layout.hashptr_size(), 8);
        assert_eq!(layout.slot_size(), 16);
        assert_eq!(layout.hash_size(), 256 * 2 * 8);
        assert_eq!(layout.trailer(), Some(&b"cdb64:01"[..]));
    }

    #[test]
    fn slot_bytes_are_little_endian() {
        let layout = Layout::new(Mode::Bits32);
        let mut buf = Vec::new();
        layout.encode_slot(&mut buf, 0x0102_0304, 2048);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0x00, 0x08, 0x00, 0x00]);
        assert_eq!(layout.decode_slot(&buf), (0x0102_0304, 2048));
    }

    #[test]
    fn record_header_64() {
        let layout = Layout::new(Mode::Bits64);
        let mut buf = Vec::new();
        layout.encode_record_header(&mut buf, 3, 1 << 40);
        assert_eq!(buf.len(), 16);
        assert_eq!(layout.decode_record_header(&buf), (3, 1 << 40));
    }
}
