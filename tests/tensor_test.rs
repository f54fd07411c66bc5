use ferrite_digit::{encode_tensor, parse_tensor, ParseError, Tensor};

#[test]
fn round_trip_vector() {
    let tensor = Tensor::new(vec![5], vec![0.0, -1.5, 2.25, f32::MAX, 1e-7]).unwrap();
    let decoded = parse_tensor(&encode_tensor(&tensor)).unwrap();
    assert_eq!(decoded.shape(), &[5]);
    assert_eq!(decoded, tensor);
}

#[test]
fn round_trip_matrix_keeps_header_order() {
    let data: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
    let tensor = Tensor::new(vec![3, 4], data).unwrap();
    let decoded = parse_tensor(&encode_tensor(&tensor)).unwrap();
    assert_eq!(decoded.shape(), &[3, 4]);
    assert_eq!(decoded.data(), tensor.data());
}

#[test]
fn tensor_new_checks_length() {
    let err = Tensor::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
    assert!(matches!(err, ParseError::LengthMismatch { expected: 6, actual: 5, .. }));
}

fn with_header(header: &str, payload: &[f32]) -> Vec<u8> {
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for v in payload {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

#[test]
fn missing_shape_is_a_parse_error() {
    let bytes = with_header("{'descr': '<f4', 'fortran_order': False, }", &[1.0]);
    assert!(matches!(parse_tensor(&bytes), Err(ParseError::MissingShape { .. })));
}

#[test]
fn payload_length_must_match_shape() {
    let bytes = with_header("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }", &[1.0, 2.0, 3.0]);
    assert!(matches!(
        parse_tensor(&bytes),
        Err(ParseError::LengthMismatch { expected: 4, actual: 3, .. })
    ));
}

#[test]
fn truncated_files_are_rejected() {
    assert!(matches!(parse_tensor(b"\x93NUM"), Err(ParseError::Truncated { .. })));

    let mut bytes = with_header("{'shape': (1,), }", &[]);
    bytes[8] = 200; // header length now past the end
    assert!(matches!(parse_tensor(&bytes), Err(ParseError::Truncated { .. })));
}

#[test]
fn partial_float_is_rejected() {
    let mut bytes = with_header("{'shape': (1,), }", &[1.0]);
    bytes.push(0);
    assert!(matches!(parse_tensor(&bytes), Err(ParseError::RaggedPayload { bytes: 5 })));
}

#[cfg(target_pointer_width = "64")]
#[test]
fn oversized_shape_is_rejected_not_wrapped() {
    // 2^32 * 2^32 wraps to 0 in usize arithmetic; an empty payload must not
    // pass as a tensor of that shape.
    let bytes = with_header("{'descr': '<f4', 'fortran_order': False, 'shape': (4294967296, 4294967296), }", &[]);
    match parse_tensor(&bytes) {
        Err(ParseError::ShapeOverflow { shape }) => assert_eq!(shape, vec![4294967296, 4294967296]),
        other => panic!("expected ShapeOverflow, got {:?}", other),
    }
}

#[cfg(target_pointer_width = "64")]
#[test]
fn large_shape_without_data_is_a_length_mismatch() {
    let bytes = with_header("{'descr': '<f4', 'fortran_order': False, 'shape': (100000, 100000), }", &[]);
    assert!(matches!(
        parse_tensor(&bytes),
        Err(ParseError::LengthMismatch { expected: 10_000_000_000, actual: 0, .. })
    ));
}

#[test]
fn overflowing_shape_is_rejected_by_constructor() {
    let err = Tensor::new(vec![usize::MAX, 2], vec![]).unwrap_err();
    assert!(matches!(err, ParseError::ShapeOverflow { .. }));
}
