use encoding_rs::WINDOWS_1252;

use crate::error::TabError;

/// Mirror of the primitive parser. The full byte image accumulates in
/// memory; nothing touches the filesystem until the image is complete, so a
/// failed write never leaves a truncated file behind.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Emit `n` zero bytes.
    pub fn write_placeholder(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    fn encode(s: &str) -> Result<Vec<u8>, TabError> {
        let (cow, _, had_errors) = WINDOWS_1252.encode(s);
        if had_errors {
            return Err(TabError::Encoding(format!(
                "cannot encode {s:?} as windows-1252"
            )));
        }
        Ok(cow.into_owned())
    }

    /// Byte-prefixed string inside a fixed field of `field_size` bytes,
    /// with `padding` reproduced after the text and any shortfall
    /// zero-filled.
    pub fn write_padded_string(
        &mut self,
        s: &str,
        padding: &[u8],
        field_size: usize,
    ) -> Result<(), TabError> {
        let bytes = Self::encode(s)?;
        let text_len = bytes.len().min(field_size);
        self.write_u8(text_len as u8);
        self.write_bytes(&bytes[..text_len]);
        let mut remaining = field_size - text_len;
        let pad = &padding[..padding.len().min(remaining)];
        self.write_bytes(pad);
        remaining -= pad.len();
        self.write_placeholder(remaining);
        Ok(())
    }

    /// Byte-prefixed string inside a zero-padded fixed field.
    pub fn write_byte_size_string(&mut self, s: &str, field_size: usize) -> Result<(), TabError> {
        self.write_padded_string(s, &[], field_size)
    }

    /// [i32 string_len][string_len bytes]
    pub fn write_int_size_string(&mut self, s: &str) -> Result<(), TabError> {
        let bytes = Self::encode(s)?;
        self.write_i32(bytes.len() as i32);
        self.write_bytes(&bytes);
        Ok(())
    }

    /// [i32 string_len + 1][u8 string_len][string_len bytes]
    ///
    /// The leading field is derived from the actual length so empty and
    /// one-character strings round-trip.
    pub fn write_int_byte_size_string(&mut self, s: &str) -> Result<(), TabError> {
        let bytes = Self::encode(s)?;
        if bytes.len() > u8::MAX as usize {
            return Err(TabError::UnsupportedFeature(format!(
                "string of {} bytes does not fit a byte-prefixed field",
                bytes.len()
            )));
        }
        self.write_i32(bytes.len() as i32 + 1);
        self.write_u8(bytes.len() as u8);
        self.write_bytes(&bytes);
        Ok(())
    }
}
