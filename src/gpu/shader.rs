use std::borrow::Cow;

use tracing::debug;

const DENSE_TEMPLATE: &str = include_str!("dense.wgsl");

/// The single compute program shared by every layer.
///
/// Bind group 0 carries the layer's `input`/`output` buffers, bind group 1
/// its `weights`/`biases`. Which buffers are bound is decided per dispatch.
#[derive(Debug)]
pub struct DenseProgram {
    pub(crate) pipeline: wgpu::ComputePipeline,
    pub(crate) io_layout: wgpu::BindGroupLayout,
    pub(crate) params_layout: wgpu::BindGroupLayout,
    workgroup_size: u32,
}

impl DenseProgram {
    pub fn compile(device: &wgpu::Device, workgroup_size: u32) -> DenseProgram {
        let source = render_source(workgroup_size);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dense layer"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });

        let io_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dense io"),
            entries: &[storage_entry(0, true), storage_entry(1, false)],
        });
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dense params"),
            entries: &[storage_entry(0, true), storage_entry(1, true)],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dense layout"),
            bind_group_layouts: &[&io_layout, &params_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("dense pipeline"),
            layout: Some(&layout),
            module: &module,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        debug!(workgroup_size, "compiled dense program");

        DenseProgram { pipeline, io_layout, params_layout, workgroup_size }
    }

    /// Work-groups needed to cover `outputs` invocations.
    pub fn workgroups_for(&self, outputs: usize) -> u32 {
        workgroup_count(outputs, self.workgroup_size)
    }
}

fn render_source(workgroup_size: u32) -> String {
    DENSE_TEMPLATE.replace("{{ workgroup_size }}", &workgroup_size.to_string())
}

pub(crate) fn workgroup_count(outputs: usize, workgroup_size: u32) -> u32 {
    let size = workgroup_size.max(1) as usize;
    ((outputs + size - 1) / size) as u32
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
