#![allow(dead_code)]

use ferrite_digit::loader::{tensor_file_name, TensorKind};
use ferrite_digit::{encode_tensor, EngineConfig, GpuContext, LayerTensors, MemorySource, Tensor, LAYER_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 784 → ... → 10 with small hidden layers, 8 layers in total.
pub const SMALL_WIDTHS: [usize; LAYER_COUNT + 1] = [784, 32, 32, 24, 24, 16, 16, 12, 10];

pub fn zero_layers(widths: &[usize]) -> Vec<LayerTensors> {
    widths
        .windows(2)
        .map(|w| LayerTensors {
            weights: Tensor::zeros(vec![w[1], w[0]]),
            biases: Tensor::zeros(vec![w[1]]),
        })
        .collect()
}

pub fn random_layers(widths: &[usize], seed: u64) -> Vec<LayerTensors> {
    let mut rng = StdRng::seed_from_u64(seed);
    widths
        .windows(2)
        .map(|w| {
            let (inputs, outputs) = (w[0], w[1]);
            let scale = (2.0 / inputs as f32).sqrt();
            let weights = (0..inputs * outputs).map(|_| rng.gen_range(-1.0..1.0) * scale).collect();
            let biases = (0..outputs).map(|_| rng.gen_range(-0.1..0.1)).collect();
            LayerTensors {
                weights: Tensor::new(vec![outputs, inputs], weights).unwrap(),
                biases: Tensor::new(vec![outputs], biases).unwrap(),
            }
        })
        .collect()
}

pub fn memory_source(layers: &[LayerTensors]) -> MemorySource {
    let mut source = MemorySource::new();
    for (i, layer) in layers.iter().enumerate() {
        source.insert(tensor_file_name(i, TensorKind::Weight), encode_tensor(&layer.weights));
        source.insert(tensor_file_name(i, TensorKind::Bias), encode_tensor(&layer.biases));
    }
    source
}

/// `relu(W·x + b)` per layer on the host, for comparison with the device.
pub fn reference_forward(layers: &[LayerTensors], input: &[f32]) -> Vec<f32> {
    let mut current = input.to_vec();
    for layer in layers {
        let outputs = layer.biases.len();
        let inputs = current.len();
        let w = layer.weights.data();
        current = (0..outputs)
            .map(|i| {
                let sum = (0..inputs).fold(0.0f32, |acc, j| current[j].mul_add(w[i * inputs + j], acc));
                (sum + layer.biases.data()[i]).max(0.0)
            })
            .collect();
    }
    current
}

pub fn test_config() -> EngineConfig {
    EngineConfig { allow_software_adapter: true, ..EngineConfig::default() }
}

/// Opens a device for tests marked `#[ignore = "needs a compute adapter"]`.
///
/// Those tests run with `cargo test -- --ignored` on a machine with a GPU
/// (or a software adapter, which `test_config` allows); without one they
/// fail here rather than pass vacuously.
pub fn require_gpu() -> GpuContext {
    match pollster::block_on(GpuContext::probe(&test_config())) {
        Ok(ctx) => ctx,
        Err(e) => panic!("no compute adapter for a GPU test: {}", e),
    }
}

/// Source holding an all-zero `SMALL_WIDTHS` network.
pub fn zero_source() -> MemorySource {
    memory_source(&zero_layers(&SMALL_WIDTHS))
}
