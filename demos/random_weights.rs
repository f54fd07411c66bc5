/// Writes a randomly initialized weight set for the 8-layer digit classifier.
///
/// Architecture: 784 → 256 → 256 → 128 → 128 → 64 → 64 → 32 → 10 (all ReLU)
/// Init:         He-uniform weights in ±sqrt(6 / fan_in), zero biases
///
/// Run with:
///   cargo run --example random_weights -- assets/mnist-weights [seed]
///
/// The output is untrained: predictions are meaningless, but the studio and
/// CLI can be exercised end to end without a trained model. The same seed
/// always writes the same files.

use std::path::PathBuf;

use ferrite_digit::loader::{tensor_file_name, TensorKind};
use ferrite_digit::{encode_tensor, Tensor, LAYER_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTHS: [usize; LAYER_COUNT + 1] = [784, 256, 256, 128, 128, 64, 64, 32, 10];
const DEFAULT_SEED: u64 = 0x5eed;

/// `[outputs, inputs]` weights drawn uniformly from `±sqrt(6 / inputs)`,
/// which has the He variance `2 / inputs`.
fn he_uniform(outputs: usize, inputs: usize, rng: &mut StdRng) -> Tensor {
    let limit = (6.0 / inputs as f32).sqrt();
    let data = (0..outputs * inputs).map(|_| rng.gen_range(-limit..limit)).collect();
    Tensor::new(vec![outputs, inputs], data).expect("data length matches shape")
}

fn main() {
    let mut args = std::env::args().skip(1);
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("assets/mnist-weights"));
    let seed = match args.next() {
        Some(s) => s.parse::<u64>().unwrap_or_else(|_| panic!("seed must be an integer, got '{}'", s)),
        None => DEFAULT_SEED,
    };
    std::fs::create_dir_all(&out_dir).expect("Failed to create weights directory");

    let mut rng = StdRng::seed_from_u64(seed);
    for (layer, pair) in WIDTHS.windows(2).enumerate() {
        let (inputs, outputs) = (pair[0], pair[1]);

        let files = [
            (TensorKind::Weight, he_uniform(outputs, inputs, &mut rng)),
            (TensorKind::Bias, Tensor::zeros(vec![outputs])),
        ];
        for (kind, tensor) in &files {
            let path = out_dir.join(tensor_file_name(layer, *kind));
            std::fs::write(&path, encode_tensor(tensor))
                .unwrap_or_else(|e| panic!("Cannot write '{}': {}", path.display(), e));
        }
        println!("  layer{}: {:>4} → {:<4}", layer, inputs, outputs);
    }

    println!("\nWeights (seed {}) written to {}", seed, out_dir.display());
}
