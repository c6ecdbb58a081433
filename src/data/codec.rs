//! Byte encoding of stored vectors.
//!
//! Fixed-width types are packed big-endian back to back. Strings are a
//! sequence of `u32` big-endian byte lengths, each followed by that many
//! UTF-8 bytes, so an element may contain any character (tabs included).

use crate::data::model::{Element, PrimitiveType};
use crate::error::{DecodeError, EncodeError};

const LEN_PREFIX: usize = 4;

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Encode strings with a length prefix per element.
pub fn encode_strings<S: AsRef<str>>(strings: &[S]) -> Result<Vec<u8>, EncodeError> {
    let total: usize = strings.iter().map(|s| LEN_PREFIX + s.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for (index, s) in strings.iter().enumerate() {
        push_string(&mut out, s.as_ref(), index)?;
    }
    Ok(out)
}

fn push_string(out: &mut Vec<u8>, s: &str, index: usize) -> Result<(), EncodeError> {
    let len = u32::try_from(s.len()).map_err(|_| EncodeError::Oversized {
        index,
        len: s.len(),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Decode a length-prefixed string payload exactly.
pub fn decode_strings(data: &[u8]) -> Result<Vec<String>, DecodeError> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let prefix = take(data, offset, LEN_PREFIX)?;
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        offset += LEN_PREFIX;

        let len = u32::from_be_bytes(len_bytes) as usize;
        let body = take(data, offset, len)?;
        let s = std::str::from_utf8(body)
            .map_err(|_| DecodeError::InvalidUtf8 { index: out.len() })?;
        out.push(s.to_string());
        offset += len;
    }
    Ok(out)
}

fn take(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], DecodeError> {
    let available = data.len() - offset;
    if needed > available {
        return Err(DecodeError::Truncated {
            offset,
            needed,
            available,
        });
    }
    Ok(&data[offset..offset + needed])
}

// ---------------------------------------------------------------------------
// Any representation
// ---------------------------------------------------------------------------

/// Decode a payload according to its declared representation.
pub fn decode(data: &[u8], representation: PrimitiveType) -> Result<Vec<Element>, DecodeError> {
    let Some(width) = representation.width() else {
        return Ok(decode_strings(data)?.into_iter().map(Element::Text).collect());
    };

    if data.len() % width != 0 {
        return Err(DecodeError::Misaligned {
            len: data.len(),
            width,
            representation,
        });
    }

    data.chunks_exact(width)
        .enumerate()
        .map(|(index, chunk)| decode_fixed(chunk, representation, index))
        .collect()
}

fn decode_fixed(
    chunk: &[u8],
    representation: PrimitiveType,
    index: usize,
) -> Result<Element, DecodeError> {
    let element = match representation {
        PrimitiveType::Double => Element::Double(f64::from_be_bytes(array(chunk))),
        PrimitiveType::Float => Element::Float(f32::from_be_bytes(array(chunk))),
        PrimitiveType::Int => Element::Int(i32::from_be_bytes(array(chunk))),
        PrimitiveType::Long => Element::Long(i64::from_be_bytes(array(chunk))),
        PrimitiveType::Boolean => Element::Bool(chunk[0] != 0),
        PrimitiveType::Char => {
            let unit = u16::from_be_bytes(array(chunk));
            let c = char::from_u32(u32::from(unit))
                .ok_or(DecodeError::InvalidChar { index, unit })?;
            Element::Char(c)
        }
        PrimitiveType::String => unreachable!("strings have no fixed width"),
    };
    Ok(element)
}

fn array<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Encode `f64` values as a DOUBLE payload.
pub fn encode_doubles(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Encode elements as a payload of `representation`, the exact inverse
/// of [`decode`].
///
/// Every element must be of that representation, and CHAR elements must
/// fit a single UTF-16 code unit.
pub fn encode(
    elements: &[Element],
    representation: PrimitiveType,
) -> Result<Vec<u8>, EncodeError> {
    let width = representation.width().unwrap_or(LEN_PREFIX);
    let mut out = Vec::with_capacity(elements.len() * width);
    for (index, element) in elements.iter().enumerate() {
        let found = element.primitive_type();
        if found != representation {
            return Err(EncodeError::KindMismatch {
                index,
                expected: representation,
                found,
            });
        }
        match element {
            Element::Text(s) => push_string(&mut out, s, index)?,
            Element::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            Element::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            Element::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Element::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            Element::Bool(b) => out.push(u8::from(*b)),
            Element::Char(c) => {
                let unit = u16::try_from(u32::from(*c))
                    .map_err(|_| EncodeError::CharOutsideBmp { index, ch: *c })?;
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
    Ok(out)
}
