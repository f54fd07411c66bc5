use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{LoadCause, LoadError};
use crate::loader::source::WeightSource;
use crate::tensor::{parse_tensor, Tensor};

/// Number of dense layers in the classifier: weight/bias pairs `layer0..=layer7`.
pub const LAYER_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    Weight,
    Bias,
}

/// Deterministic file name for one layer tensor, e.g. `layer3.bias.npy`.
pub fn tensor_file_name(layer: usize, kind: TensorKind) -> String {
    let kind = match kind {
        TensorKind::Weight => "weight",
        TensorKind::Bias => "bias",
    };
    format!("layer{}.{}.npy", layer, kind)
}

/// Parsed weights and biases for one layer, as read from disk. Shapes are not
/// validated here; the network builder does that.
#[derive(Debug, Clone)]
pub struct LayerTensors {
    pub weights: Tensor,
    pub biases: Tensor,
}

/// Fetches and parses all `LAYER_COUNT` weight/bias pairs concurrently.
///
/// Returns only when every file has been fetched and parsed. The first
/// failure (in layer order) aborts the load; nothing partial is returned.
pub fn load_layers(source: &dyn WeightSource) -> Result<Vec<LayerTensors>, LoadError> {
    let t_start = Instant::now();
    info!(source = %source.describe(), layers = LAYER_COUNT, "loading layer tensors");

    let results: Vec<(Result<Tensor, LoadError>, Result<Tensor, LoadError>)> =
        thread::scope(|scope| {
            let handles: Vec<_> = (0..LAYER_COUNT)
                .map(|layer| {
                    let weights = scope.spawn(move || fetch_tensor(source, layer, TensorKind::Weight));
                    let biases = scope.spawn(move || fetch_tensor(source, layer, TensorKind::Bias));
                    (layer, weights, biases)
                })
                .collect();

            handles
                .into_iter()
                .map(|(layer, weights, biases)| {
                    (
                        join_fetch(weights, layer, TensorKind::Weight),
                        join_fetch(biases, layer, TensorKind::Bias),
                    )
                })
                .collect()
        });

    let mut layers = Vec::with_capacity(LAYER_COUNT);
    for (weights, biases) in results {
        layers.push(LayerTensors { weights: weights?, biases: biases? });
    }

    info!(elapsed_ms = t_start.elapsed().as_millis() as u64, "layer tensors loaded");
    Ok(layers)
}

fn fetch_tensor(source: &dyn WeightSource, layer: usize, kind: TensorKind) -> Result<Tensor, LoadError> {
    let file = tensor_file_name(layer, kind);
    let bytes = match source.fetch(&file) {
        Ok(b) => b,
        Err(e) => return Err(LoadError { file, cause: LoadCause::Fetch(e) }),
    };
    match parse_tensor(&bytes) {
        Ok(tensor) => {
            debug!(file = %file, shape = ?tensor.shape(), "parsed tensor");
            Ok(tensor)
        }
        Err(e) => Err(LoadError { file, cause: LoadCause::Parse(e) }),
    }
}

fn join_fetch(
    handle: thread::ScopedJoinHandle<'_, Result<Tensor, LoadError>>,
    layer: usize,
    kind: TensorKind,
) -> Result<Tensor, LoadError> {
    handle.join().unwrap_or_else(|_| {
        Err(LoadError {
            file: tensor_file_name(layer, kind),
            cause: LoadCause::Fetch(std::io::Error::new(
                std::io::ErrorKind::Other,
                "fetch thread panicked",
            )),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_layer_index() {
        assert_eq!(tensor_file_name(0, TensorKind::Weight), "layer0.weight.npy");
        assert_eq!(tensor_file_name(7, TensorKind::Bias), "layer7.bias.npy");
    }
}
