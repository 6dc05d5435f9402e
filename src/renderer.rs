use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::ViewerConfig;
use crate::core::{GpuContext, Viewport};
use crate::debug_panel::DebugPanel;
use crate::frame_driver::{FrameView, PanelEdits, RenderBackend, Result};
use crate::geometry::MeshData;
use crate::loaders::EnvironmentMap;
use crate::reflection::{ReflectionProbe, CUBE_FACES};
use crate::scene::{Layers, Material, ModelInstance, SceneGraph, REFLECTION_LAYER};
use crate::types::{CameraUniform, LightingUniform, ObjectUniform, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const REFLECTION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Vertex/index buffers plus the per-object uniform of one drawable
struct GpuObject {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuObject {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertices", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Indices", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Uniform", label)),
            contents: bytemuck::cast_slice(&[ObjectUniform::new(Mat4::IDENTITY, [1.0; 3], 0.0, 1.0, false)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some(&format!("{} Bind Group", label)),
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    fn write(&self, queue: &wgpu::Queue, matrix: Mat4, material: &Material) {
        let uniform = ObjectUniform::new(
            matrix,
            material.base_color,
            material.metalness,
            material.roughness,
            material.unlit,
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct CameraBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str, uniform: CameraUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }
}

/// Background and mesh pipelines for one color target format
struct Pipelines {
    background: wgpu::RenderPipeline,
    mesh: wgpu::RenderPipeline,
}

/// Cube render target the probe captures into
struct ReflectionTarget {
    cube_view: wgpu::TextureView,
    face_views: Vec<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    cameras: Vec<CameraBinding>,
}

/// Offscreen color and depth the scene is drawn into at the committed pixel ratio
struct SceneTarget {
    size: (u32, u32),
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
}

/// Fullscreen pass that scales the scene target onto the window surface
struct Blit {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

/// egui state for the debug panel overlay
struct Overlay {
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
    panel: DebugPanel,
}

pub struct SceneRenderer {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    scene_target: SceneTarget,
    blit: Blit,
    object_layout: wgpu::BindGroupLayout,
    screen_pipelines: Pipelines,
    probe_pipelines: Pipelines,
    camera: CameraBinding,
    lighting_buffer: wgpu::Buffer,
    probe_lighting_buffer: wgpu::Buffer,
    environment_bind_group: wgpu::BindGroup,
    probe_environment_bind_group: wgpu::BindGroup,
    reflection: ReflectionTarget,
    /// Aligned with `SceneGraph::objects`
    builtins: Vec<GpuObject>,
    /// Primitive index paired with its GPU buffers
    model: Vec<(usize, GpuObject)>,
    overlay: Option<Overlay>,
}

impl SceneRenderer {
    pub async fn new(
        window: Arc<Window>,
        config: &ViewerConfig,
        environment: &EnvironmentMap,
        show_panel: bool,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let (gpu, adapter) = GpuContext::for_surface(&instance, &surface).await?;
        let device = gpu.device();

        let size = window.inner_size();
        let surface_config = Self::create_surface_config(&surface, &adapter, size.width, size.height)?;
        surface.configure(device, &surface_config);

        let blit = Self::create_blit(device, surface_config.format);
        let scene_target = Self::create_scene_target(
            device,
            &blit,
            surface_config.format,
            (surface_config.width, surface_config.height),
        );

        let camera_layout = Self::uniform_layout(device, "camera_bind_group_layout");
        let object_layout = Self::uniform_layout(device, "object_bind_group_layout");
        let environment_layout = Self::create_environment_layout(device);

        let screen_pipelines = Self::create_pipelines(
            device,
            &camera_layout,
            &object_layout,
            &environment_layout,
            surface_config.format,
        );
        let probe_pipelines = Self::create_pipelines(
            device,
            &camera_layout,
            &object_layout,
            &environment_layout,
            REFLECTION_FORMAT,
        );

        let probe = ReflectionProbe::new(&config.reflection);
        let reflection = Self::create_reflection_target(device, &camera_layout, &probe);

        let lighting = LightingUniform {
            background_intensity: config.environment.intensity,
            background_blurriness: config.environment.blurriness,
            exposure: 1.0,
            _pad: 0.0,
        };
        let lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Buffer"),
            contents: bytemuck::cast_slice(&[lighting]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let probe_lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Probe Lighting Buffer"),
            contents: bytemuck::cast_slice(&[lighting]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let environment_view = Self::create_environment_texture(&gpu, environment);
        let placeholder_cube = Self::create_placeholder_cube(device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let environment_bind_group = Self::create_environment_bind_group(
            device,
            &environment_layout,
            &environment_view,
            &sampler,
            &reflection.cube_view,
            &lighting_buffer,
            "environment_bind_group",
        );
        // The probe renders into the reflection cube, so it cannot also sample it
        let probe_environment_bind_group = Self::create_environment_bind_group(
            device,
            &environment_layout,
            &environment_view,
            &sampler,
            &placeholder_cube,
            &probe_lighting_buffer,
            "probe_environment_bind_group",
        );

        let camera = CameraBinding::new(
            device,
            &camera_layout,
            "Camera Buffer",
            CameraUniform::new(Mat4::IDENTITY, Mat4::IDENTITY, glam::Vec3::ZERO),
        );

        let overlay = show_panel.then(|| {
            let egui_ctx = egui::Context::default();
            let egui_state = egui_winit::State::new(
                egui_ctx.clone(),
                egui::ViewportId::ROOT,
                &window,
                Some(window.scale_factor() as f32),
                None,
                None,
            );
            let egui_renderer =
                egui_wgpu::Renderer::new(device, surface_config.format, egui_wgpu::RendererOptions::default());
            Overlay {
                egui_renderer,
                egui_state,
                egui_ctx,
                panel: DebugPanel::new(),
            }
        });

        log::info!(
            "Renderer initialized: {}x{} {:?}, reflection {}²",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            probe.resolution
        );

        Ok(Self {
            window,
            gpu,
            surface,
            surface_config,
            scene_target,
            blit,
            object_layout,
            screen_pipelines,
            probe_pipelines,
            camera,
            lighting_buffer,
            probe_lighting_buffer,
            environment_bind_group,
            probe_environment_bind_group,
            reflection,
            builtins: Vec::new(),
            model: Vec::new(),
            overlay,
        })
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Result<wgpu::SurfaceConfiguration> {
        let surface_caps = surface.get_capabilities(adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err("Surface is not supported by the adapter".into());
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(first_format);

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_scene_target(
        device: &wgpu::Device,
        blit: &Blit,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> SceneTarget {
        let (width, height) = size;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &blit.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&blit.sampler),
                },
            ],
            label: Some("blit_bind_group"),
        });

        SceneTarget {
            size,
            color_view,
            depth_view: Self::create_depth_view(device, width, height, "Depth Texture"),
            blit_bind_group,
        }
    }

    fn create_blit(device: &wgpu::Device, format: wgpu::TextureFormat) -> Blit {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("blit_bind_group_layout"),
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Blit {
            pipeline,
            layout,
            sampler,
        }
    }

    fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(label),
        })
    }

    fn create_environment_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("environment_bind_group_layout"),
        })
    }

    fn create_environment_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        environment_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        cube_view: &wgpu::TextureView,
        lighting_buffer: &wgpu::Buffer,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(environment_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(cube_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
            label: Some(label),
        })
    }

    fn create_pipelines(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        object_layout: &wgpu::BindGroupLayout,
        environment_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Pipelines {
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
        });
        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
        });

        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[camera_layout, environment_layout],
            push_constant_ranges: &[],
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[camera_layout, object_layout, environment_layout],
            push_constant_ranges: &[],
        });

        let background = Self::create_pipeline(
            device,
            "Background Pipeline",
            &background_layout,
            &background_shader,
            &[],
            format,
            false,
        );
        let mesh = Self::create_pipeline(
            device,
            "Mesh Pipeline",
            &mesh_layout,
            &mesh_shader,
            &[Vertex::layout()],
            format,
            true,
        );

        Pipelines { background, mesh }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        buffers: &[wgpu::VertexBufferLayout],
        format: wgpu::TextureFormat,
        depth_test: bool,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth_test,
                depth_compare: if depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn create_reflection_target(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        probe: &ReflectionProbe,
    ) -> ReflectionTarget {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Reflection Cube"),
            size: wgpu::Extent3d {
                width: probe.resolution,
                height: probe.resolution,
                depth_or_array_layers: CUBE_FACES as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: REFLECTION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Reflection Cube View"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let face_views = (0..CUBE_FACES as u32)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Reflection Face View"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let cameras = probe
            .face_uniforms()
            .into_iter()
            .map(|uniform| CameraBinding::new(device, camera_layout, "Reflection Face Camera", uniform))
            .collect();

        ReflectionTarget {
            cube_view,
            face_views,
            depth_view: Self::create_depth_view(device, probe.resolution, probe.resolution, "Reflection Depth"),
            cameras,
        }
    }

    fn create_placeholder_cube(device: &wgpu::Device) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Placeholder Cube"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: CUBE_FACES as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: REFLECTION_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        })
    }

    fn create_environment_texture(gpu: &GpuContext, environment: &EnvironmentMap) -> wgpu::TextureView {
        let levels = environment.mip_chain();
        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Map"),
            size: wgpu::Extent3d {
                width: environment.width,
                height: environment.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            gpu.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Forward window events to egui; true when egui consumed the event
    pub fn handle_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.egui_state.on_window_event(&self.window, event).consumed,
            None => false,
        }
    }

    fn write_lighting(&self, buffer: &wgpu::Buffer, scene: &SceneGraph, exposure: f32) {
        let lighting = LightingUniform {
            background_intensity: scene.background.intensity,
            background_blurriness: scene.background.blurriness,
            exposure,
            _pad: 0.0,
        };
        self.gpu.queue().write_buffer(buffer, 0, bytemuck::cast_slice(&[lighting]));
    }

    /// Floor and ring light meshes never change, so they are uploaded once
    fn ensure_builtins(&mut self, scene: &SceneGraph) {
        if !self.builtins.is_empty() {
            return;
        }
        let device = self.gpu.device();
        self.builtins = scene
            .objects()
            .iter()
            .map(|object| GpuObject::new(device, &self.object_layout, object.name, &object.mesh))
            .collect();
    }

    fn builtins_on(&self, scene: &SceneGraph, camera_layers: Layers) -> Vec<&GpuObject> {
        scene
            .objects_on(camera_layers)
            .filter_map(|(index, _)| self.builtins.get(index))
            .collect()
    }

    fn write_builtins(&self, scene: &SceneGraph) {
        for (object, gpu_object) in scene.objects().iter().zip(&self.builtins) {
            gpu_object.write(self.gpu.queue(), object.transform.matrix(), &object.material);
        }
    }
}

impl Overlay {
    /// Lay out the debug panel and record its draw into `encoder`
    fn draw(
        &mut self,
        gpu: &GpuContext,
        window: &Window,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: [u32; 2],
        view: &FrameView<'_>,
    ) -> PanelEdits {
        let raw_input = self.egui_state.take_egui_input(window);
        let panel = &mut self.panel;
        let mut edits = PanelEdits::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            edits = panel.show(ctx, view);
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(gpu.device(), gpu.queue(), *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: view.viewport.scale_factor(),
        };

        self.egui_renderer
            .update_buffers(gpu.device(), gpu.queue(), encoder, &tris, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            })
            // egui-wgpu takes a 'static pass
            .forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        edits
    }
}

fn color_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn depth_attachment(view: &wgpu::TextureView) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Discard,
        }),
        stencil_ops: None,
    })
}

impl RenderBackend for SceneRenderer {
    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        let (width, height) = viewport.window_size();
        if (width, height) != (self.surface_config.width, self.surface_config.height) {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(self.gpu.device(), &self.surface_config);
            log::debug!("Surface resized to {}x{}", width, height);
        }

        let render_size = viewport.render_size();
        if render_size != self.scene_target.size {
            self.scene_target =
                Self::create_scene_target(self.gpu.device(), &self.blit, self.surface_config.format, render_size);
            log::debug!(
                "Scene target resized to {}x{} (ratio {})",
                render_size.0,
                render_size.1,
                viewport.pixel_ratio()
            );
        }
        Ok(())
    }

    fn upload_model(&mut self, model: &ModelInstance) -> Result<()> {
        let device = self.gpu.device();
        self.model = model
            .primitives()
            .iter()
            .enumerate()
            .filter(|(_, primitive)| !primitive.mesh.is_empty())
            .map(|(index, primitive)| {
                let label = format!("{} Primitive {}", model.name, index);
                (index, GpuObject::new(device, &self.object_layout, &label, &primitive.mesh))
            })
            .collect();

        log::info!("Uploaded {} primitives of {}", self.model.len(), model.name);
        Ok(())
    }

    fn capture_reflection(&mut self, scene: &SceneGraph) -> Result<()> {
        self.ensure_builtins(scene);
        self.write_builtins(scene);
        self.write_lighting(&self.probe_lighting_buffer, scene, 1.0);

        let visible = self.builtins_on(scene, Layers::only(REFLECTION_LAYER));

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Reflection Encoder"),
            });

        for (face_view, camera) in self.reflection.face_views.iter().zip(&self.reflection.cameras) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Reflection Face Pass"),
                color_attachments: &[color_attachment(face_view)],
                depth_stencil_attachment: depth_attachment(&self.reflection.depth_view),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&self.probe_pipelines.background);
            pass.set_bind_group(0, &camera.bind_group, &[]);
            pass.set_bind_group(1, &self.probe_environment_bind_group, &[]);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.probe_pipelines.mesh);
            pass.set_bind_group(0, &camera.bind_group, &[]);
            pass.set_bind_group(2, &self.probe_environment_bind_group, &[]);
            for object in &visible {
                object.draw(&mut pass);
            }
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn render(&mut self, view: &FrameView<'_>) -> Result<PanelEdits> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated; reconfiguring and skipping frame");
                self.surface.configure(self.gpu.device(), &self.surface_config);
                return Ok(PanelEdits::default());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out; skipping frame");
                return Ok(PanelEdits::default());
            }
            Err(e) => return Err(e.into()),
        };
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.gpu.queue().write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[view.camera.to_uniform()]),
        );
        self.write_lighting(&self.lighting_buffer, view.scene, view.exposure);
        self.ensure_builtins(view.scene);
        self.write_builtins(view.scene);
        if let Some(model) = view.scene.model() {
            for (index, gpu_object) in &self.model {
                let material = &model.primitives()[*index].material;
                gpu_object.write(self.gpu.queue(), model.primitive_matrix(*index), material);
            }
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[color_attachment(&self.scene_target.color_view)],
                depth_stencil_attachment: depth_attachment(&self.scene_target.depth_view),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_pipeline(&self.screen_pipelines.background);
            pass.set_bind_group(0, &self.camera.bind_group, &[]);
            pass.set_bind_group(1, &self.environment_bind_group, &[]);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.screen_pipelines.mesh);
            pass.set_bind_group(0, &self.camera.bind_group, &[]);
            pass.set_bind_group(2, &self.environment_bind_group, &[]);
            for object in self.builtins_on(view.scene, Layers::new()) {
                object.draw(&mut pass);
            }
            if view.scene.model().is_some() {
                for (_, object) in &self.model {
                    object.draw(&mut pass);
                }
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[color_attachment(&target)],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.blit.pipeline);
            pass.set_bind_group(0, &self.scene_target.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        let size = [self.surface_config.width, self.surface_config.height];
        let edits = match self.overlay.as_mut() {
            Some(overlay) => overlay.draw(&self.gpu, &self.window, &mut encoder, &target, size, view),
            None => PanelEdits::default(),
        };

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(edits)
    }
}
