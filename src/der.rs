//! Minimal DER TLV framing.
//!
//! [`CredentialCodec`](crate::codec) only ever needs three ASN.1 shapes —
//! `SEQUENCE`, `OCTET STRING`, `INTEGER` — to frame the synthetic blobs it
//! hands to the underlying store. Certificate and parameter parsing stay
//! opaque byte blobs elsewhere in this crate, so a full ASN.1 stack would be
//! overkill; this module hand-writes just those three shapes, definite-length
//! form only.

use std::fmt;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

#[derive(Debug)]
pub enum DerError {
    Truncated,
    UnexpectedTag { expected: u8, found: u8 },
    InvalidLength,
    TrailingData,
}

impl fmt::Display for DerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "DER value is truncated"),
            Self::UnexpectedTag { expected, found } => {
                write!(f, "expected DER tag 0x{expected:02x}, found 0x{found:02x}")
            }
            Self::InvalidLength => write!(f, "DER length field is invalid"),
            Self::TrailingData => write!(f, "DER value has unconsumed trailing bytes"),
        }
    }
}

impl std::error::Error for DerError {}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let significant = &bytes[first_nonzero..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn decode_length(data: &[u8], pos: &mut usize) -> Result<usize, DerError> {
    let first = *data.get(*pos).ok_or(DerError::Truncated)?;
    *pos += 1;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let count = (first & 0x7f) as usize;
    if count == 0 || count > std::mem::size_of::<usize>() {
        return Err(DerError::InvalidLength);
    }
    let bytes = data.get(*pos..*pos + count).ok_or(DerError::Truncated)?;
    *pos += count;
    let mut len = 0usize;
    for b in bytes {
        len = (len << 8) | *b as usize;
    }
    Ok(len)
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 8);
    out.push(tag);
    encode_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Encode a DER `OCTET STRING`.
pub fn encode_octet_string(bytes: &[u8]) -> Vec<u8> {
    tlv(TAG_OCTET_STRING, bytes)
}

/// Encode a DER `INTEGER` (minimal-length two's-complement, as DER requires).
pub fn encode_integer(value: i64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1
        && ((bytes[0] == 0x00 && bytes[1] & 0x80 == 0)
            || (bytes[0] == 0xff && bytes[1] & 0x80 != 0))
    {
        bytes.remove(0);
    }
    tlv(TAG_INTEGER, &bytes)
}

/// Encode a DER `SEQUENCE` from already-encoded child TLVs.
pub fn encode_sequence(children: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for child in children {
        body.extend_from_slice(child);
    }
    tlv(TAG_SEQUENCE, &body)
}

/// A cursor over a byte slice that peels off one DER TLV at a time.
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn finish(&self) -> Result<(), DerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DerError::TrailingData)
        }
    }

    /// Read the next TLV, returning its tag and content slice.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), DerError> {
        let tag = *self.data.get(self.pos).ok_or(DerError::Truncated)?;
        self.pos += 1;
        let len = decode_length(self.data, &mut self.pos)?;
        let content = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(DerError::Truncated)?;
        self.pos += len;
        Ok((tag, content))
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8], DerError> {
        let (tag, content) = self.read_tlv()?;
        if tag != TAG_OCTET_STRING {
            return Err(DerError::UnexpectedTag { expected: TAG_OCTET_STRING, found: tag });
        }
        Ok(content)
    }

    pub fn read_integer(&mut self) -> Result<i64, DerError> {
        let (tag, content) = self.read_tlv()?;
        if tag != TAG_INTEGER {
            return Err(DerError::UnexpectedTag { expected: TAG_INTEGER, found: tag });
        }
        if content.is_empty() {
            return Err(DerError::InvalidLength);
        }
        let negative = content[0] & 0x80 != 0;
        let mut value: i64 = if negative { -1 } else { 0 };
        for byte in content {
            value = (value << 8) | *byte as i64;
        }
        Ok(value)
    }

    /// Read a `SEQUENCE` and return a reader scoped to its content.
    pub fn read_sequence(&mut self) -> Result<TlvReader<'a>, DerError> {
        let (tag, content) = self.read_tlv()?;
        if tag != TAG_SEQUENCE {
            return Err(DerError::UnexpectedTag { expected: TAG_SEQUENCE, found: tag });
        }
        Ok(TlvReader::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_string_roundtrips() {
        let encoded = encode_octet_string(b"hello world");
        let mut reader = TlvReader::new(&encoded);
        assert_eq!(reader.read_octet_string().unwrap(), b"hello world");
        reader.finish().unwrap();
    }

    #[test]
    fn integer_roundtrips_small_and_large() {
        for value in [0i64, 1, 127, 128, 255, 256, 65536, i64::MAX, i64::MIN, -1, -129] {
            let encoded = encode_integer(value);
            let mut reader = TlvReader::new(&encoded);
            assert_eq!(reader.read_integer().unwrap(), value, "value={value}");
        }
    }

    #[test]
    fn sequence_of_mixed_children_roundtrips() {
        let seq = encode_sequence(&[
            encode_octet_string(b"hash"),
            encode_octet_string(b"salt"),
            encode_integer(4096),
        ]);
        let mut outer = TlvReader::new(&seq);
        let mut inner = outer.read_sequence().unwrap();
        assert_eq!(inner.read_octet_string().unwrap(), b"hash");
        assert_eq!(inner.read_octet_string().unwrap(), b"salt");
        assert_eq!(inner.read_integer().unwrap(), 4096);
        inner.finish().unwrap();
        outer.finish().unwrap();
    }

    #[test]
    fn long_length_form_used_past_127_bytes() {
        let long = vec![0x42u8; 200];
        let encoded = encode_octet_string(&long);
        assert_eq!(encoded[1] & 0x80, 0x80, "should use long-form length");
        let mut reader = TlvReader::new(&encoded);
        assert_eq!(reader.read_octet_string().unwrap(), long.as_slice());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let mut reader = TlvReader::new(&[0x04, 0x05, 0x01, 0x02]);
        assert!(matches!(reader.read_octet_string(), Err(DerError::Truncated)));
    }

    #[test]
    fn wrong_tag_is_rejected() {
        let encoded = encode_integer(7);
        let mut reader = TlvReader::new(&encoded);
        assert!(matches!(
            reader.read_octet_string(),
            Err(DerError::UnexpectedTag { expected: TAG_OCTET_STRING, found: TAG_INTEGER })
        ));
    }
}
