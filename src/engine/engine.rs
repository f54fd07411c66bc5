use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::gpu::{DeviceInfo, GpuContext};
use crate::loader::{load_layers, WeightSource};
use crate::network::{build_network, GpuNetwork, LayerShape};

/// Owns a built network and the device it lives on; runs forward passes.
///
/// At most one `infer` may be outstanding: the layer state buffers and the
/// readback buffer are shared by every call, so an overlapping call is
/// rejected with `EngineError::Busy` instead of corrupting them.
#[derive(Debug)]
pub struct InferenceEngine {
    context: GpuContext,
    network: GpuNetwork,
    in_flight: AtomicBool,
}

impl InferenceEngine {
    pub fn new(context: GpuContext, network: GpuNetwork) -> Self {
        InferenceEngine { context, network, in_flight: AtomicBool::new(false) }
    }

    /// Probes the device, loads every layer from `source` and builds the
    /// network. Any failure aborts; no partial engine is returned.
    pub async fn load(config: &EngineConfig, source: &dyn WeightSource) -> Result<Self> {
        config.validate()?;
        let context = GpuContext::probe(config).await?;
        let layers = load_layers(source)?;
        let network = build_network(&context, &layers, config.workgroup_size).await?;
        Ok(InferenceEngine::new(context, network))
    }

    pub fn device_info(&self) -> &DeviceInfo {
        self.context.info()
    }

    pub fn input_width(&self) -> usize {
        self.network.input_width()
    }

    pub fn output_width(&self) -> usize {
        self.network.output_width()
    }

    pub fn layer_shapes(&self) -> Vec<LayerShape> {
        self.network.layer_shapes()
    }

    /// Runs one forward pass and returns the final layer's output.
    ///
    /// Every layer is dispatched, in index order, on a single command
    /// encoder submitted to the one device queue, so layer `i` always reads
    /// layer `i - 1`'s output from this call.
    pub async fn infer(&self, input: &[f32]) -> Result<Vec<f32>> {
        let expected = self.network.input_width();
        if input.len() != expected {
            return Err(EngineError::InputShape { expected, actual: input.len() });
        }

        let _guard = InFlight::acquire(&self.in_flight).map_err(|e| {
            warn!("rejecting overlapping inference");
            e
        })?;

        let device = &self.context.device;
        let queue = &self.context.queue;
        let network = &self.network;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        queue.write_buffer(&network.input, 0, bytemuck::cast_slice(input));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("forward pass"),
        });

        for (index, layer) in network.layers.iter().enumerate() {
            let workgroups = network.program.workgroups_for(layer.shape.outputs);
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("dense layer"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&network.program.pipeline);
            pass.set_bind_group(0, &layer.io_bind_group, &[]);
            pass.set_bind_group(1, &layer.params_bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
            debug!(layer = index, workgroups, "dispatched");
        }

        let output = network.output_layer();
        encoder.copy_buffer_to_buffer(&output.state, 0, &network.readback, 0, output.state.size());
        queue.submit(Some(encoder.finish()));

        if let Some(err) = device.pop_error_scope().await {
            return Err(EngineError::Device(format!("forward pass rejected: {}", err)));
        }

        self.read_output().await
    }

    async fn read_output(&self) -> Result<Vec<f32>> {
        let slice = self.network.readback.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let _ = self.context.device.poll(wgpu::Maintain::Wait);

        match receiver.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(EngineError::Device(format!("readback failed: {}", err))),
            Err(_) => return Err(EngineError::Device("readback was cancelled".to_owned())),
        }

        let mapped = slice.get_mapped_range();
        let output = bytemuck::cast_slice::<u8, f32>(&mapped).to_vec();
        drop(mapped);
        self.network.readback.unmap();

        Ok(output)
    }

    /// Destroys the network's device buffers and drops the device.
    pub fn release(self) {
        info!("releasing inference engine");
        self.network.release();
    }
}

/// Marks an inference as outstanding for as long as it is held.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<InFlight<'a>> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| InFlight(flag))
            .map_err(|_| EngineError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
