mod common;

use ferrite_digit::{validate_layers, EngineError, LayerShape, LayerTensors, Tensor};

use common::{random_layers, zero_layers, SMALL_WIDTHS};

#[test]
fn consistent_chain_validates() {
    let shapes = validate_layers(&zero_layers(&SMALL_WIDTHS)).unwrap();
    assert_eq!(shapes.len(), 8);
    assert_eq!(shapes[0], LayerShape { inputs: 784, outputs: 32 });
    assert_eq!(shapes[7], LayerShape { inputs: 12, outputs: 10 });
}

#[test]
fn bias_width_mismatch_names_the_layer() {
    let mut layers = random_layers(&SMALL_WIDTHS, 11);
    layers[4].biases = Tensor::zeros(vec![17]);

    match validate_layers(&layers) {
        Err(EngineError::ShapeMismatch { layer, weights, biases }) => {
            assert_eq!(layer, 4);
            assert_eq!(weights, vec![16, 24]);
            assert_eq!(biases, vec![17]);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn chain_break_is_a_shape_mismatch() {
    let mut layers = zero_layers(&SMALL_WIDTHS);
    // Layer 2 expects 32 inputs; feed it a layer expecting 30.
    layers[2] = LayerTensors {
        weights: Tensor::zeros(vec![24, 30]),
        biases: Tensor::zeros(vec![24]),
    };
    assert!(matches!(
        validate_layers(&layers),
        Err(EngineError::ShapeMismatch { layer: 2, .. })
    ));
}

#[test]
fn ranks_are_enforced() {
    let layers = vec![LayerTensors {
        weights: Tensor::zeros(vec![10]),
        biases: Tensor::zeros(vec![10]),
    }];
    assert!(matches!(validate_layers(&layers), Err(EngineError::ShapeMismatch { layer: 0, .. })));

    let layers = vec![LayerTensors {
        weights: Tensor::zeros(vec![10, 4]),
        biases: Tensor::zeros(vec![10, 1]),
    }];
    assert!(validate_layers(&layers).is_err());
}

#[test]
fn empty_chain_is_rejected() {
    assert!(validate_layers(&[]).unwrap_err().is_construction_error());
}
