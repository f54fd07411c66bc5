use crate::gpu::DenseProgram;

/// Input/output widths of one dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShape {
    pub inputs: usize,
    pub outputs: usize,
}

/// Device-resident buffers and bindings for one layer.
#[derive(Debug)]
pub struct GpuLayer {
    pub shape: LayerShape,
    pub(crate) weights: wgpu::Buffer,
    pub(crate) biases: wgpu::Buffer,
    /// This layer's output; the next layer's input.
    pub(crate) state: wgpu::Buffer,
    /// {source, destination}: the global input or the previous layer's
    /// state, and `state`.
    pub(crate) io_bind_group: wgpu::BindGroup,
    /// {weights, biases}.
    pub(crate) params_bind_group: wgpu::BindGroup,
}

/// A fully built layer chain. Owns every buffer it references; dropping it
/// releases them.
#[derive(Debug)]
pub struct GpuNetwork {
    pub(crate) layers: Vec<GpuLayer>,
    pub(crate) input: wgpu::Buffer,
    /// Host-mappable copy target for the final layer's state.
    pub(crate) readback: wgpu::Buffer,
    pub(crate) program: DenseProgram,
}

impl GpuNetwork {
    pub fn layer_shapes(&self) -> Vec<LayerShape> {
        self.layers.iter().map(|l| l.shape).collect()
    }

    /// Length of the global input buffer.
    pub fn input_width(&self) -> usize {
        self.layers[0].shape.inputs
    }

    /// Length of the final layer's state buffer.
    pub fn output_width(&self) -> usize {
        self.output_layer().shape.outputs
    }

    pub(crate) fn output_layer(&self) -> &GpuLayer {
        &self.layers[self.layers.len() - 1]
    }

    /// Destroys all device buffers now rather than when the device gets
    /// around to it.
    pub fn release(self) {
        for layer in &self.layers {
            layer.weights.destroy();
            layer.biases.destroy();
            layer.state.destroy();
        }
        self.input.destroy();
        self.readback.destroy();
    }
}
