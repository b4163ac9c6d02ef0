//! Graphics/compute pipeline builders and a shader-module-by-path cache.
//!
//! Passes never call `wgpu::Device::create_render_pipeline` directly: they
//! describe the pipeline they want as a hashable key, and [`PipelineCache`]
//! builds it once and hands back a `Copy` handle on every later call with
//! the same key. The mirror key types exist because `wgpu`'s own descriptor
//! types don't implement `Hash`/`Eq`.

use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};

/// Compute a `u64` hash of any `Hash`-able value using `FxHasher`.
#[inline]
#[must_use]
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Handle to a cached `wgpu::RenderPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineId(u32);

impl RenderPipelineId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a cached `wgpu::ComputePipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputePipelineId(u32);

impl ComputePipelineId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ─── Hashable mirrors of wgpu descriptor types ──────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateKey {
    pub color: (wgpu::BlendFactor, wgpu::BlendFactor, wgpu::BlendOperation),
    pub alpha: (wgpu::BlendFactor, wgpu::BlendFactor, wgpu::BlendOperation),
}

impl From<wgpu::BlendState> for BlendStateKey {
    fn from(b: wgpu::BlendState) -> Self {
        Self {
            color: (b.color.src_factor, b.color.dst_factor, b.color.operation),
            alpha: (b.alpha.src_factor, b.alpha.dst_factor, b.alpha.operation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorTargetKey {
    pub format: wgpu::TextureFormat,
    pub blend: Option<BlendStateKey>,
    pub write_mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilKey {
    pub format: wgpu::TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl From<wgpu::DepthStencilState> for DepthStencilKey {
    fn from(d: wgpu::DepthStencilState) -> Self {
        Self {
            format: d.format,
            depth_write_enabled: d.depth_write_enabled,
            depth_compare: d.depth_compare,
        }
    }
}

/// Describes a graphics pipeline to build or look up. The shader source is
/// identified by path rather than content, matching [`ShaderCache`]'s
/// caching key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineKey {
    pub shader_path: String,
    pub vs_entry: String,
    pub fs_entry: String,
    pub vertex_layout_id: u64,
    pub bind_group_layout_ids: smallvec::SmallVec<[u64; 4]>,
    pub topology: wgpu::PrimitiveTopology,
    pub front_face: wgpu::FrontFace,
    pub cull_mode: Option<wgpu::Face>,
    pub color_targets: smallvec::SmallVec<[ColorTargetKey; 2]>,
    pub depth_stencil: Option<DepthStencilKey>,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputePipelineKey {
    pub shader_path: String,
    pub entry_point: String,
    pub bind_group_layout_ids: smallvec::SmallVec<[u64; 4]>,
}

/// Loads WGSL source from disk and caches the compiled `wgpu::ShaderModule`
/// by path, so repeated pipeline builds referencing the same file never
/// re-read or re-parse it.
#[derive(Default)]
pub struct ShaderCache {
    modules: FxHashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached module for `path`, compiling it on first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn get_or_load(
        &mut self,
        device: &wgpu::Device,
        path: &Path,
    ) -> std::io::Result<Arc<wgpu::ShaderModule>> {
        let key = path.to_string_lossy().into_owned();
        if let Some(module) = self.modules.get(&key) {
            return Ok(Arc::clone(module));
        }
        let source = std::fs::read_to_string(path)?;
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&key),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let module = Arc::new(module);
        self.modules.insert(key, Arc::clone(&module));
        Ok(module)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.modules.remove(&path.to_string_lossy().into_owned());
    }
}

/// Central owner of every `wgpu::RenderPipeline`/`wgpu::ComputePipeline`,
/// deduplicated by [`GraphicsPipelineKey`]/[`ComputePipelineKey`].
#[derive(Default)]
pub struct PipelineCache {
    render_pipelines: Vec<wgpu::RenderPipeline>,
    compute_pipelines: Vec<wgpu::ComputePipeline>,
    graphics_lookup: FxHashMap<u64, RenderPipelineId>,
    compute_lookup: FxHashMap<u64, ComputePipelineId>,
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_render_pipeline(&self, id: RenderPipelineId) -> &wgpu::RenderPipeline {
        &self.render_pipelines[id.index()]
    }

    #[must_use]
    pub fn get_compute_pipeline(&self, id: ComputePipelineId) -> &wgpu::ComputePipeline {
        &self.compute_pipelines[id.index()]
    }

    /// Clears every cached pipeline (surface format or MSAA sample count
    /// changed). Shader modules in [`ShaderCache`] are unaffected.
    pub fn clear(&mut self) {
        self.render_pipelines.clear();
        self.compute_pipelines.clear();
        self.graphics_lookup.clear();
        self.compute_lookup.clear();
    }

    #[must_use]
    pub fn render_pipeline_count(&self) -> usize {
        self.render_pipelines.len()
    }

    #[must_use]
    pub fn compute_pipeline_count(&self) -> usize {
        self.compute_pipelines.len()
    }

    /// Looks up or builds a graphics pipeline for `key`.
    pub fn get_or_create_graphics(
        &mut self,
        device: &wgpu::Device,
        shaders: &mut ShaderCache,
        key: &GraphicsPipelineKey,
        layout: &wgpu::PipelineLayout,
        vertex_buffers: &[wgpu::VertexBufferLayout<'_>],
    ) -> std::io::Result<RenderPipelineId> {
        let hash = fx_hash_key(key);
        if let Some(&id) = self.graphics_lookup.get(&hash) {
            return Ok(id);
        }

        let module = shaders.get_or_load(device, Path::new(&key.shader_path))?;

        let blend_for = |k: &ColorTargetKey| {
            k.blend.map(|b| wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: b.color.0,
                    dst_factor: b.color.1,
                    operation: b.color.2,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: b.alpha.0,
                    dst_factor: b.alpha.1,
                    operation: b.alpha.2,
                },
            })
        };
        let color_targets: Vec<_> = key
            .color_targets
            .iter()
            .map(|k| {
                Some(wgpu::ColorTargetState {
                    format: k.format,
                    blend: blend_for(k),
                    write_mask: wgpu::ColorWrites::from_bits_truncate(k.write_mask),
                })
            })
            .collect();

        let depth_stencil = key.depth_stencil.map(|d| wgpu::DepthStencilState {
            format: d.format,
            depth_write_enabled: d.depth_write_enabled,
            depth_compare: d.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&key.shader_path),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(&key.vs_entry),
                buffers: vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(&key.fs_entry),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology,
                front_face: key.front_face,
                cull_mode: key.cull_mode,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: key.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        let id = self.push_render_pipeline(pipeline);
        self.graphics_lookup.insert(hash, id);
        Ok(id)
    }

    /// Looks up or builds a compute pipeline for `key`.
    pub fn get_or_create_compute(
        &mut self,
        device: &wgpu::Device,
        shaders: &mut ShaderCache,
        key: &ComputePipelineKey,
        layout: &wgpu::PipelineLayout,
    ) -> std::io::Result<ComputePipelineId> {
        let hash = fx_hash_key(key);
        if let Some(&id) = self.compute_lookup.get(&hash) {
            return Ok(id);
        }

        let module = shaders.get_or_load(device, Path::new(&key.shader_path))?;

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&key.shader_path),
            layout: Some(layout),
            module: &module,
            entry_point: Some(&key.entry_point),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let id = self.push_compute_pipeline(pipeline);
        self.compute_lookup.insert(hash, id);
        Ok(id)
    }

    fn push_render_pipeline(&mut self, pipeline: wgpu::RenderPipeline) -> RenderPipelineId {
        let id = RenderPipelineId(self.render_pipelines.len() as u32);
        self.render_pipelines.push(pipeline);
        id
    }

    fn push_compute_pipeline(&mut self, pipeline: wgpu::ComputePipeline) -> ComputePipelineId {
        let id = ComputePipelineId(self.compute_pipelines.len() as u32);
        self.compute_pipelines.push(pipeline);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fx_hash_is_deterministic() {
        let a = GraphicsPipelineKey {
            shader_path: "geometry.wgsl".into(),
            vs_entry: "vs_main".into(),
            fs_entry: "fs_main".into(),
            vertex_layout_id: 1,
            bind_group_layout_ids: smallvec::smallvec![1, 2],
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            color_targets: smallvec::smallvec![ColorTargetKey {
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL.bits(),
            }],
            depth_stencil: None,
            sample_count: 1,
        };
        let b = a.clone();
        assert_eq!(fx_hash_key(&a), fx_hash_key(&b));
    }
}
