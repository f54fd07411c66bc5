/// Reader and writer for the serialized tensor files holding layer weights.
///
/// # Layout
/// ```text
/// bytes  0-7:      preamble (magic + version), presence only
/// bytes  8-9:      header length L (little-endian u16)
/// bytes 10..10+L:  ASCII header, a dict literal containing e.g.
///                  {'descr': '<f4', 'fortran_order': False, 'shape': (128, 784), }
/// bytes 10+L..:    row-major little-endian f32 payload
/// ```
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::tensor::tensor::{element_count, Tensor};

const PREAMBLE: &[u8; 8] = b"\x93NUMPY\x01\x00";
const HEADER_START: usize = 10;
const HEADER_ALIGN: usize = 64;

fn shape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"'shape'\s*:\s*\(\s*(\d+)\s*,?\s*(?:(\d+)\s*,?\s*)?\)")
            .expect("shape pattern is valid")
    })
}

fn descr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("descr pattern is valid"))
}

/// Decodes a single tensor file.
///
/// The shape is reported in header order, so `(128, 784)` yields `[128, 784]`.
pub fn parse_tensor(bytes: &[u8]) -> Result<Tensor, ParseError> {
    if bytes.len() < HEADER_START {
        return Err(ParseError::Truncated { needed: HEADER_START, actual: bytes.len() });
    }

    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let payload_start = HEADER_START + header_len;
    if bytes.len() < payload_start {
        return Err(ParseError::Truncated { needed: payload_start, actual: bytes.len() });
    }

    let header = std::str::from_utf8(&bytes[HEADER_START..payload_start])
        .map_err(|_| ParseError::HeaderEncoding)?;

    if let Some(caps) = descr_regex().captures(header) {
        let descr = &caps[1];
        if descr != "<f4" {
            return Err(ParseError::UnsupportedDtype { descr: descr.to_owned() });
        }
    }
    if header.contains("'fortran_order': True") {
        return Err(ParseError::FortranOrder);
    }

    let shape = parse_shape(header)?;

    let payload = &bytes[payload_start..];
    if payload.len() % 4 != 0 {
        return Err(ParseError::RaggedPayload { bytes: payload.len() });
    }
    let data: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Tensor::new(shape, data)
}

fn parse_shape(header: &str) -> Result<Vec<usize>, ParseError> {
    let missing = || ParseError::MissingShape { header: header.trim_end().to_owned() };
    let caps = shape_regex().captures(header).ok_or_else(missing)?;

    let mut shape = Vec::with_capacity(2);
    for group in [caps.get(1), caps.get(2)].into_iter().flatten() {
        shape.push(group.as_str().parse::<usize>().map_err(|_| missing())?);
    }
    Ok(shape)
}

/// Encodes a tensor in the same format `parse_tensor` reads.
pub fn encode_tensor(tensor: &Tensor) -> Vec<u8> {
    let shape = match tensor.shape() {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {}, }}", shape);

    // Pad with spaces so the payload starts on an aligned offset; the header
    // always ends in a newline.
    let unpadded = HEADER_START + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(HEADER_START + header.len() + tensor.len() * 4);
    out.extend_from_slice(PREAMBLE);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in tensor.data() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    debug_assert_eq!(element_count(tensor.shape()), Some(tensor.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(header: &str, data: &[f32]) -> Vec<u8> {
        let mut out = PREAMBLE.to_vec();
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for v in data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn shape_variants() {
        assert_eq!(parse_shape("{'shape': (784,), }").unwrap(), vec![784]);
        assert_eq!(parse_shape("{'shape': (128, 784), }").unwrap(), vec![128, 784]);
        assert_eq!(parse_shape("{'shape':(3,4)}").unwrap(), vec![3, 4]);
        assert!(parse_shape("{'shape': (), }").is_err());
    }

    #[test]
    fn header_is_aligned() {
        let bytes = encode_tensor(&Tensor::zeros(vec![128, 784]));
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((HEADER_START + header_len) % HEADER_ALIGN, 0);
        assert_eq!(bytes[HEADER_START + header_len - 1], b'\n');
    }

    #[test]
    fn rejects_other_dtypes() {
        let bytes = raw("{'descr': '<f8', 'fortran_order': False, 'shape': (1,), }", &[0.0, 0.0]);
        assert!(matches!(parse_tensor(&bytes), Err(ParseError::UnsupportedDtype { .. })));
    }

    #[test]
    fn rejects_fortran_order() {
        let bytes = raw("{'descr': '<f4', 'fortran_order': True, 'shape': (1, 2), }", &[0.0, 0.0]);
        assert!(matches!(parse_tensor(&bytes), Err(ParseError::FortranOrder)));
    }

    #[test]
    fn header_without_descr_is_accepted() {
        let bytes = raw("{'shape': (2,)}", &[1.5, -2.0]);
        let tensor = parse_tensor(&bytes).unwrap();
        assert_eq!(tensor.data(), &[1.5, -2.0]);
    }
}
