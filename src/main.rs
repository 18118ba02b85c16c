use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowId};

use umbra::controls::{adjust_lights, apply_keys};
use umbra::{
    Camera, CameraControls, Catalog, Entity, EntityKind, FrameClock, GpuContext, Input, Light,
    Mat4, Material, MeshData, Quat, RenderSettings, Renderer, Scene, Transform, Vec3,
    ViewerConfig,
};

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    scene: Scene,
    camera: Camera,
    input: Input,
    clock: FrameClock,
}

struct Viewer {
    config: ViewerConfig,
    settings: RenderSettings,
    running: Option<Running>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        Self {
            settings: config.render.clone(),
            config,
            running: None,
        }
    }

    fn title(&self) -> String {
        format!("{} | {}", self.config.window.title, self.settings.summary())
    }
}

/// Ground plane, two totems, a sphere, and three lights.
fn build_scene(gpu: &GpuContext) -> Scene {
    let mut catalog = Catalog::new(gpu);

    let plane = catalog.add_mesh(gpu, "Ground", &MeshData::quad(25.0));
    let totem = catalog.add_mesh(gpu, "Totem", &MeshData::totem());
    let sphere = catalog.add_mesh(gpu, "Sphere", &MeshData::sphere(48, 24));

    let white = catalog.white();
    let tiles_albedo = catalog.texture_set(1).albedo;
    let ground = catalog.add_material(Material {
        name: "ground".into(),
        albedo_texture: white,
        relief: true,
    });
    let stone = catalog.add_material(Material {
        name: "stone".into(),
        albedo_texture: tiles_albedo,
        relief: false,
    });
    let plaster = catalog.add_material(Material {
        name: "plaster".into(),
        albedo_texture: white,
        relief: false,
    });

    let ground = catalog.add_model("ground", plane, vec![ground]);
    let totem = catalog.add_model("totem", totem, vec![stone, plaster]);
    let sphere = catalog.add_model("sphere", sphere, vec![plaster]);

    let mut scene = Scene::new(catalog);
    let ground_world = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
        * Mat4::from_scale(Vec3::new(100.0, 1.0, 100.0))
        * Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
    scene.add_entity(Entity::new(ground_world, ground, EntityKind::GroundPlane));
    for (x, angle) in [(-4.0, 0.4), (4.0, -0.4)] {
        let world = Transform::from_position(Vec3::new(x, -0.25, -2.0))
            .rotation(Quat::from_rotation_y(angle))
            .matrix();
        scene.add_entity(Entity::new(world, totem, EntityKind::Model));
    }
    let world = Transform::from_position(Vec3::new(0.0, 0.0, 3.0))
        .uniform_scale(2.0)
        .matrix();
    scene.add_entity(Entity::new(world, sphere, EntityKind::Sphere));

    scene.add_light(Light::point(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0)));
    scene.add_light(Light::point(Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 1.0)));
    scene.add_light(
        Light::directional(
            Vec3::new(0.0, 10.0, -10.0),
            Vec3::new(-0.3, -1.0, 0.5),
            Vec3::new(1.0, 0.95, 0.85),
        )
        .with_intensity(30),
    );

    log::info!(
        "Scene: {} entities, {} lights",
        scene.entities.len(),
        scene.lights.len()
    );
    scene
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        let gpu = match GpuContext::new(window.clone()) {
            Ok(gpu) => gpu,
            Err(err) => {
                log::error!("{err}");
                event_loop.exit();
                return;
            }
        };

        let scene = build_scene(&gpu);
        let renderer = Renderer::new(&gpu);
        let mut camera = Camera::default();
        camera.look_at(Vec3::ZERO);

        self.running = Some(Running {
            window,
            gpu,
            renderer,
            scene,
            camera,
            input: Input::new(),
            clock: FrameClock::new(),
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };
        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if running.gpu.resize(size.width, size.height) {
                    running.renderer.resize(&running.gpu);
                }
            }
            WindowEvent::RedrawRequested => {
                let Running {
                    window,
                    gpu,
                    renderer,
                    scene,
                    camera,
                    input,
                    clock,
                } = running;

                if input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }

                let frame = clock.tick(gpu.width(), gpu.height());
                camera.update(&CameraControls::from_input(input), frame.delta_time);

                let texture_sets = scene.catalog.texture_set_count();
                let mut changed =
                    apply_keys(&mut self.settings, texture_sets, |key| input.key_pressed(key));
                changed |= adjust_lights(&mut scene.lights, |key| input.key_pressed(key));
                if changed {
                    window.set_title(&format!(
                        "{} | {}",
                        self.config.window.title,
                        self.settings.summary()
                    ));
                }

                let matrices = camera.matrices(gpu.aspect());
                renderer.update(gpu, scene, &matrices, &self.settings);

                match gpu.surface.get_current_texture() {
                    Ok(output) => {
                        let view = output
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default());
                        renderer.render(gpu, scene, &self.settings, &view);
                        output.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::debug!("Surface lost or outdated; reconfiguring");
                        gpu.reconfigure();
                    }
                    Err(err) => log::warn!("Skipping frame: {err}"),
                }

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ViewerConfig::from_args_or_env(std::env::args().nth(1))?;
    log::info!("Starting {}", config.window.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(config);
    event_loop.run_app(&mut viewer)?;
    Ok(())
}
