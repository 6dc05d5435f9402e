use glam::{Mat4, Vec3};

/// Mesh vertex as laid out in the vertex buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Camera uniform buffer data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Inverse of the rotation-only view-projection, for background rays
    pub inv_view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

impl CameraUniform {
    pub fn new(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        // Strip translation so the background stays at infinity
        let mut rotation_only = view;
        rotation_only.w_axis = glam::Vec4::W;

        Self {
            view_proj: (projection * view).to_cols_array_2d(),
            inv_view_proj: (projection * rotation_only).inverse().to_cols_array_2d(),
            position: position.to_array(),
            _pad: 0.0,
        }
    }
}

/// Per-object transform and material for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    /// x: metalness, y: roughness, z: 1.0 when unlit, w: unused
    pub params: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, base_color: [f32; 3], metalness: f32, roughness: f32, unlit: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            base_color: [base_color[0], base_color[1], base_color[2], 1.0],
            params: [metalness, roughness, if unlit { 1.0 } else { 0.0 }, 0.0],
        }
    }
}

/// Frame-wide lighting parameters for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub background_intensity: f32,
    pub background_blurriness: f32,
    pub exposure: f32,
    pub _pad: f32,
}
