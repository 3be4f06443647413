use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rlt_accel::OctreeConfig;
use rlt_core::{load_obj, AreaLight, Mesh, MeshSet};
use rlt_guide::{create_guider, GuiderConfig, GuiderKind};
use rlt_math::{Aabb, Color, Vec3};
use rlt_render::{
    cornell_box, cornell_camera, create_integrator, run, Camera, CameraConfig, IntegratorKind,
    RenderConfig, Scene,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntegratorArg {
    Path,
    Guided,
    GuidedMis,
}

impl From<IntegratorArg> for IntegratorKind {
    fn from(arg: IntegratorArg) -> Self {
        match arg {
            IntegratorArg::Path => IntegratorKind::Path,
            IntegratorArg::Guided => IntegratorKind::Guided,
            IntegratorArg::GuidedMis => IntegratorKind::GuidedMis,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GuiderArg {
    #[value(name = "qtable")]
    QTable,
    Sphere,
}

impl From<GuiderArg> for GuiderKind {
    fn from(arg: GuiderArg) -> Self {
        match arg {
            GuiderArg::QTable => GuiderKind::QTable,
            GuiderArg::Sphere => GuiderKind::Sphere,
        }
    }
}

/// Render an OBJ scene, or the built-in Cornell box, with optional path guiding.
#[derive(Debug, Parser)]
#[command(name = "rlt", version)]
struct Args {
    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// OBJ scene to render instead of the Cornell box
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Name of an OBJ mesh to turn into an area light (repeatable)
    #[arg(long = "light", value_name = "MESH")]
    lights: Vec<String>,

    /// Radiance of meshes given with --light
    #[arg(long, default_value_t = 10.0)]
    light_radiance: f32,

    #[arg(short = 'W', long)]
    width: Option<u32>,

    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,

    #[arg(long, value_enum)]
    integrator: Option<IntegratorArg>,

    #[arg(long, value_enum)]
    guider: Option<GuiderArg>,

    /// Guide table to resume learning from
    #[arg(long)]
    import: Option<PathBuf>,

    /// Where to write the learned guide table
    #[arg(long)]
    export: Option<PathBuf>,

    #[arg(short, long, default_value = "out.png")]
    output: PathBuf,

    #[arg(long)]
    seed: Option<u64>,
}

/// Everything a render needs, as read from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    render: RenderConfig,
    octree: OctreeConfig,
    integrator: IntegratorKind,
    guider_kind: GuiderKind,
    guider: GuiderConfig,
    /// Framed automatically when absent
    camera: Option<CameraConfig>,
}

impl Settings {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    fn apply(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.render.width = width;
        }
        if let Some(height) = args.height {
            self.render.height = height;
        }
        if let Some(spp) = args.spp {
            self.render.samples_per_pixel = spp;
        }
        if let Some(seed) = args.seed {
            self.render.seed = seed;
        }
        if let Some(integrator) = args.integrator {
            self.integrator = integrator.into();
        }
        if let Some(guider) = args.guider {
            self.guider_kind = guider.into();
        }
        if let Some(import) = &args.import {
            self.guider.import_path = Some(import.clone());
        }
        if let Some(export) = &args.export {
            self.guider.export_path = Some(export.clone());
        }
    }
}

/// Camera in front of the scene box, looking down -Z at its centre.
fn frame_bounds(bounds: &Aabb) -> CameraConfig {
    let center = bounds.centroid();
    let radius = 0.5 * bounds.extent().length();
    CameraConfig {
        look_from: center + Vec3::new(0.0, 0.0, 2.5 * radius.max(1e-3)),
        look_at: center,
        up: Vec3::Y,
        vfov: 45.0,
    }
}

fn load_meshes(args: &Args) -> Result<Vec<Mesh>> {
    let Some(path) = &args.obj else {
        log::info!("No --obj given, rendering the built-in Cornell box");
        return Ok(cornell_box());
    };

    let meshes = load_obj(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let light = Arc::new(AreaLight::new(Color::splat(args.light_radiance)));
    let mut lit = 0;
    let meshes: Vec<Mesh> = meshes
        .into_iter()
        .map(|mesh| {
            if args.lights.iter().any(|name| *name == mesh.name) {
                lit += 1;
                mesh.with_emitter(light.clone())
            } else {
                mesh
            }
        })
        .collect();
    if lit < args.lights.len() {
        log::warn!(
            "Only {} of the {} --light meshes were found in {}",
            lit,
            args.lights.len(),
            path.display()
        );
    }
    Ok(meshes)
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply(&args);
    settings.render.validate()?;

    let meshes = load_meshes(&args)?;
    let geometry = MeshSet::from_meshes(meshes).context("Invalid scene geometry")?;
    let scene = Scene::new(geometry, settings.octree)?;

    let camera_config = match (settings.camera, &args.obj) {
        (Some(camera), _) => camera,
        (None, None) => cornell_camera(),
        (None, Some(_)) => frame_bounds(&scene.bounding_box()),
    };
    let camera = Camera::new(&camera_config, settings.render.width, settings.render.height);

    let guider = match settings.integrator {
        IntegratorKind::Path => None,
        IntegratorKind::Guided | IntegratorKind::GuidedMis => {
            Some(create_guider(settings.guider_kind, settings.guider.clone())?)
        }
    };
    let mut integrator =
        create_integrator(settings.integrator, settings.render.max_depth, guider)?;

    let image = run(&scene, &camera, integrator.as_mut(), &settings.render)?;
    image
        .save_png(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "rlt",
            "--width",
            "64",
            "--spp",
            "4",
            "--integrator",
            "guided-mis",
            "--guider",
            "qtable",
            "--export",
            "table.qtable",
        ]);
        let mut settings: Settings =
            serde_json::from_str(r#"{"render": {"width": 10, "height": 20}, "guider_kind": "sphere"}"#)
                .unwrap();
        settings.apply(&args);

        assert_eq!(settings.render.width, 64);
        assert_eq!(settings.render.height, 20);
        assert_eq!(settings.render.samples_per_pixel, 4);
        assert_eq!(settings.integrator, IntegratorKind::GuidedMis);
        assert_eq!(settings.guider_kind, GuiderKind::QTable);
        assert_eq!(settings.guider.export_path, Some(PathBuf::from("table.qtable")));
        assert_eq!(settings.guider.import_path, None);
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::parse_from(["rlt"]);
        let mut settings = Settings::default();
        settings.apply(&args);
        assert_eq!(settings, Settings::default());
        assert_eq!(args.output, PathBuf::from("out.png"));
    }

    #[test]
    fn test_frame_bounds_sees_the_box() {
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        let camera = frame_bounds(&bounds);
        assert_eq!(camera.look_at, bounds.centroid());
        assert!(camera.look_from.z > bounds.max.z);
    }
}
