//! Per-frame scene feed: uploads instance data, draw-batch metadata, and
//! the camera uniform the standard passes read every frame.
//!
//! Grounded in the donor's `ModelBufferAllocator` capacity-growth pattern
//! (`renderer/core/resources/allocator.rs`), but fixed-capacity rather than
//! growable: the spec caps static and dynamic instance counts and requires
//! overflow to warn-and-truncate rather than reallocate.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::framegraph::batch::BatchRegistry;
use crate::framegraph::resource::MAX_FRAMES_IN_FLIGHT;

pub const MAX_STATIC_INSTANCES: usize = 65536;
pub const MAX_DYNAMIC_INSTANCES: usize = 65536;
pub const CULLING_WORKGROUP_SIZE: u32 = 64;

/// Number of compute workgroups needed to cover `total_instances` at
/// [`CULLING_WORKGROUP_SIZE`] threads per group.
#[must_use]
pub fn culling_workgroup_count(total_instances: u32) -> u32 {
    total_instances.div_ceil(CULLING_WORKGROUP_SIZE)
}

/// One draw instance, 16-byte aligned for direct SSBO upload.
///
/// The model matrix is stored as a full 3×4 row-major affine transform
/// (translation included in each row's fourth component, spec §3 "Instance
/// record"); the normal matrix's three rows are full `vec3`s in their own
/// right, each followed by one 32-bit half of a bindless handle so the
/// 64-bit mesh/material handles ride along without an extra 16 bytes of
/// padding (mirrors the donor's `InstanceData`, which packs its
/// `DescriptorHandle`s into the slack after each normal row rather than
/// after the model matrix).
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Instance {
    pub model_row0: [f32; 4],
    pub model_row1: [f32; 4],
    pub model_row2: [f32; 4],
    pub normal_row0: [f32; 3],
    mesh_lo: u32,
    pub normal_row1: [f32; 3],
    mesh_hi: u32,
    pub normal_row2: [f32; 3],
    material_lo: u32,
    material_hi: u32,
    pub batch_id: u32,
    _pad: [u32; 2],
}

impl Instance {
    #[must_use]
    pub fn new(model: Mat4, normal_row0: Vec3, normal_row1: Vec3, normal_row2: Vec3, mesh: u64, material: u64, batch_id: u32) -> Self {
        let m = model.transpose().to_cols_array_2d();
        Self {
            model_row0: m[0],
            model_row1: m[1],
            model_row2: m[2],
            normal_row0: normal_row0.into(),
            mesh_lo: mesh as u32,
            normal_row1: normal_row1.into(),
            mesh_hi: (mesh >> 32) as u32,
            normal_row2: normal_row2.into(),
            material_lo: material as u32,
            material_hi: (material >> 32) as u32,
            batch_id,
            _pad: [0; 2],
        }
    }

    #[must_use]
    pub fn mesh(&self) -> u64 {
        u64::from(self.mesh_lo) | (u64::from(self.mesh_hi) << 32)
    }

    #[must_use]
    pub fn material(&self) -> u64 {
        u64::from(self.material_lo) | (u64::from(self.material_hi) << 32)
    }
}

/// Per-batch metadata uploaded alongside the instance buffer (spec §4.9
/// "Draw-batch metadata … double-buffered, written in lockstep").
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BatchMeta {
    pub first_instance: u32,
    pub instance_count: u32,
    pub _pad: [u32; 2],
}

/// Camera uniform written to the current frame's slice every frame.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub frustum_planes: [Vec4; 6],
    pub position: Vec4,
}

fn aligned_size(unaligned: u64) -> u64 {
    let alignment = wgpu::COPY_BUFFER_ALIGNMENT;
    unaligned.div_ceil(alignment) * alignment
}

/// Owns the static/dynamic instance SSBOs, the batch-metadata SSBO, and the
/// camera uniform buffer, and performs the once-per-scene-load /
/// once-per-frame uploads spec §4.9 describes.
pub struct SceneFeed {
    static_instances: wgpu::Buffer,
    dynamic_instances: wgpu::Buffer,
    batch_metadata: wgpu::Buffer,
    camera: wgpu::Buffer,
    static_uploaded: bool,
}

impl SceneFeed {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let instance_size = std::mem::size_of::<Instance>() as u64;
        let meta_size = std::mem::size_of::<BatchMeta>() as u64;
        let camera_size = std::mem::size_of::<CameraUniform>() as u64;

        let static_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-feed-static-instances"),
            size: aligned_size(instance_size * MAX_STATIC_INSTANCES as u64),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let dynamic_instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-feed-dynamic-instances"),
            size: aligned_size(instance_size * MAX_DYNAMIC_INSTANCES as u64 * MAX_FRAMES_IN_FLIGHT as u64),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let batch_metadata = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-feed-batch-metadata"),
            size: aligned_size(meta_size * MAX_DYNAMIC_INSTANCES as u64 * MAX_FRAMES_IN_FLIGHT as u64),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-feed-camera"),
            size: aligned_size(camera_size * MAX_FRAMES_IN_FLIGHT as u64),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { static_instances, dynamic_instances, batch_metadata, camera, static_uploaded: false }
    }

    #[must_use]
    pub fn static_instances(&self) -> &wgpu::Buffer {
        &self.static_instances
    }

    #[must_use]
    pub fn dynamic_instances(&self) -> &wgpu::Buffer {
        &self.dynamic_instances
    }

    #[must_use]
    pub fn batch_metadata(&self) -> &wgpu::Buffer {
        &self.batch_metadata
    }

    #[must_use]
    pub fn camera(&self) -> &wgpu::Buffer {
        &self.camera
    }

    /// Uploads the static instance set exactly once. Later calls are no-ops
    /// until [`Self::reset_static`] is called (scene reload).
    pub fn upload_static(&mut self, queue: &wgpu::Queue, instances: &[Instance]) {
        if self.static_uploaded {
            return;
        }
        let truncated = truncate_with_warning(instances, MAX_STATIC_INSTANCES, "static instances");
        queue.write_buffer(&self.static_instances, 0, bytemuck::cast_slice(truncated));
        self.static_uploaded = true;
    }

    pub fn reset_static(&mut self) {
        self.static_uploaded = false;
    }

    /// Rewrites the dynamic instance set for `slot` (the current
    /// frame-in-flight index).
    pub fn write_dynamic(&mut self, queue: &wgpu::Queue, slot: usize, instances: &[Instance]) {
        let truncated = truncate_with_warning(instances, MAX_DYNAMIC_INSTANCES, "dynamic instances");
        let offset = (slot * MAX_DYNAMIC_INSTANCES) as u64 * std::mem::size_of::<Instance>() as u64;
        queue.write_buffer(&self.dynamic_instances, offset, bytemuck::cast_slice(truncated));
    }

    /// Writes every batch's `(firstInstance, instanceCount)` into `slot`'s
    /// region, in lockstep with [`Self::write_dynamic`].
    pub fn write_batches(&mut self, queue: &wgpu::Queue, slot: usize, registry: &BatchRegistry) {
        let metas: Vec<BatchMeta> = (0..registry.batch_count())
            .map(|i| {
                let batch = crate::framegraph::batch::BatchId::from_index(i as u32);
                BatchMeta {
                    first_instance: registry.first_instance(batch),
                    instance_count: registry.instance_count(batch),
                    _pad: [0; 2],
                }
            })
            .collect();
        let offset = (slot * MAX_DYNAMIC_INSTANCES) as u64 * std::mem::size_of::<BatchMeta>() as u64;
        queue.write_buffer(&self.batch_metadata, offset, bytemuck::cast_slice(&metas));
    }

    /// Writes the camera uniform into `slot`'s region.
    pub fn write_camera(&mut self, queue: &wgpu::Queue, slot: usize, camera: &CameraUniform) {
        let offset = slot as u64 * aligned_size(std::mem::size_of::<CameraUniform>() as u64);
        queue.write_buffer(&self.camera, offset, bytemuck::bytes_of(camera));
    }
}

fn truncate_with_warning<'a>(instances: &'a [Instance], cap: usize, what: &str) -> &'a [Instance] {
    if instances.len() > cap {
        log::warn!("{what} exceeds capacity ({} > {cap}); truncating", instances.len());
        &instances[..cap]
    } else {
        instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn culling_dispatch_rounds_up() {
        assert_eq!(culling_workgroup_count(0), 0);
        assert_eq!(culling_workgroup_count(1), 1);
        assert_eq!(culling_workgroup_count(64), 1);
        assert_eq!(culling_workgroup_count(65), 2);
    }

    #[test]
    fn truncate_with_warning_caps_len() {
        let instances = vec![
            Instance::new(Mat4::IDENTITY, Vec3::X, Vec3::Y, Vec3::Z, 0, 0, 0);
            4
        ];
        let truncated = truncate_with_warning(&instances, 2, "test instances");
        assert_eq!(truncated.len(), 2);
    }

    #[test]
    fn new_preserves_translation_and_normal_rows() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let instance = Instance::new(model, Vec3::new(4.0, 5.0, 6.0), Vec3::new(7.0, 8.0, 9.0), Vec3::new(10.0, 11.0, 12.0), 0, 0, 0);

        assert_eq!(instance.model_row0[3], 1.0, "row 0's w component must carry the x translation");
        assert_eq!(instance.model_row1[3], 2.0, "row 1's w component must carry the y translation");
        assert_eq!(instance.model_row2[3], 3.0, "row 2's w component must carry the z translation");

        assert_eq!(instance.normal_row0, [4.0, 5.0, 6.0]);
        assert_eq!(instance.normal_row1, [7.0, 8.0, 9.0]);
        assert_eq!(instance.normal_row2, [10.0, 11.0, 12.0]);
    }

    #[test]
    fn mesh_and_material_handles_round_trip_through_the_packed_halves() {
        let mesh: u64 = 0x1122_3344_5566_7788;
        let material: u64 = 0xAABB_CCDD_EEFF_0011;
        let instance = Instance::new(Mat4::IDENTITY, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, mesh, material, 0);
        assert_eq!(instance.mesh(), mesh);
        assert_eq!(instance.material(), material);
    }
}
