use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::error::{EngineError, Result};
use crate::gpu::{DenseProgram, GpuContext};
use crate::loader::LayerTensors;
use crate::network::network::{GpuLayer, GpuNetwork, LayerShape};

const F32_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Checks every layer's shapes before anything is allocated.
///
/// Weights are `[outputs, inputs]`, biases `[outputs]`, and each layer's
/// `inputs` must equal the previous layer's `outputs`.
pub fn validate_layers(layers: &[LayerTensors]) -> Result<Vec<LayerShape>> {
    if layers.is_empty() {
        return Err(EngineError::ShapeMismatch { layer: 0, weights: vec![], biases: vec![] });
    }

    let mut shapes: Vec<LayerShape> = Vec::with_capacity(layers.len());
    for (index, layer) in layers.iter().enumerate() {
        let mismatch = || EngineError::ShapeMismatch {
            layer: index,
            weights: layer.weights.shape().to_vec(),
            biases: layer.biases.shape().to_vec(),
        };

        let (outputs, inputs) = match (layer.weights.shape(), layer.biases.shape()) {
            (&[out, inp], &[bias]) if out == bias && out > 0 && inp > 0 => (out, inp),
            _ => return Err(mismatch()),
        };
        if let Some(prev) = shapes.last() {
            if prev.outputs != inputs {
                return Err(mismatch());
            }
        }
        shapes.push(LayerShape { inputs, outputs });
    }
    Ok(shapes)
}

/// Validates `layers`, then allocates per-layer buffers, links them into an
/// input→output chain and compiles the shared dense program.
///
/// On any shape error nothing is allocated. Validation or out-of-memory
/// errors raised by the device while building are returned as
/// `EngineError::Device` and everything allocated so far is released.
pub async fn build_network(ctx: &GpuContext, layers: &[LayerTensors], workgroup_size: u32) -> Result<GpuNetwork> {
    let shapes = validate_layers(layers)?;
    let device = &ctx.device;

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let network = allocate(device, layers, &shapes, workgroup_size);
    let validation = device.pop_error_scope().await;
    let out_of_memory = device.pop_error_scope().await;

    if let Some(err) = validation.or(out_of_memory) {
        warn!(error = %err, "device rejected network construction");
        network.release();
        return Err(EngineError::Device(format!("network construction failed: {}", err)));
    }

    info!(
        layers = shapes.len(),
        inputs = shapes[0].inputs,
        outputs = shapes[shapes.len() - 1].outputs,
        workgroup_size,
        "network built"
    );
    Ok(network)
}

fn allocate(device: &wgpu::Device, layers: &[LayerTensors], shapes: &[LayerShape], workgroup_size: u32) -> GpuNetwork {
    let program = DenseProgram::compile(device, workgroup_size);

    let input = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("network input"),
        size: shapes[0].inputs as u64 * F32_SIZE,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut built: Vec<GpuLayer> = Vec::with_capacity(layers.len());
    for (index, (tensors, shape)) in layers.iter().zip(shapes.iter()).enumerate() {
        let weights = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("layer{} weights", index)),
            contents: bytemuck::cast_slice(tensors.weights.data()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let biases = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("layer{} biases", index)),
            contents: bytemuck::cast_slice(tensors.biases.data()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let state = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("layer{} state", index)),
            size: shape.outputs as u64 * F32_SIZE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let source = match built.last() {
            Some(prev) => &prev.state,
            None => &input,
        };

        let io_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("layer{} io", index)),
            layout: &program.io_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: source.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: state.as_entire_binding() },
            ],
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("layer{} params", index)),
            layout: &program.params_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: weights.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: biases.as_entire_binding() },
            ],
        });

        debug!(layer = index, inputs = shape.inputs, outputs = shape.outputs, "allocated layer");

        built.push(GpuLayer {
            shape: *shape,
            weights,
            biases,
            state,
            io_bind_group,
            params_bind_group,
        });
    }

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("network readback"),
        size: shapes[shapes.len() - 1].outputs as u64 * F32_SIZE,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    GpuNetwork { layers: built, input, readback, program }
}
