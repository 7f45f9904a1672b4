//! JSON scene loading. The file carries four top-level sections:
//! `camera`, `materials`, `objects` and `lights`, plus an optional
//! `params` block with rendering parameters.
//!
//! ```json
//! {
//!     "camera": { "position": [0, 1, -5], "look_at": [0, 1, 0], "fov": 60 },
//!     "materials": [ { "name": "white", "bsdf": "diffuse", "base_color": [0.8, 0.8, 0.8] } ],
//!     "objects": [ { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "white" } ],
//!     "lights": [ { "type": "point", "position": [0, 4, 0], "color": [30, 30, 30] } ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use serde_json::Value;

use crate::color::Spectrum;
use crate::geometry::{Mesh, Plane, Rect, Sphere};
use crate::light::{
    AreaLight, BackgroundLight, DirectionalLight, PointLight, SphereLight, SpotLight,
};
use crate::material::Material;
use crate::renderer::RenderingParams;
use crate::texture::{BitmapTexture, CheckerboardTexture, Textures};

use super::Scene;

/// Camera description; the host combines it with the frame resolution.
pub struct CameraConfig {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, -5.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 60.0f32.to_radians(),
        }
    }
}

pub struct LoadedScene {
    pub scene: Scene,
    pub camera: CameraConfig,
    pub params: RenderingParams,
}

/// Load a scene file. `data_root` resolves relative texture and mesh
/// paths.
pub fn load_scene(path: &Path, data_root: &Path) -> Result<LoadedScene> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file {}", path.display()))?;
    let root: Value = serde_json::from_str(&text)
        .with_context(|| format!("scene file {} is not valid JSON", path.display()))?;

    let camera = root
        .get("camera")
        .map(load_camera)
        .transpose()?
        .unwrap_or_default();

    let params = match root.get("params") {
        Some(v) => serde_json::from_value(v.clone()).context("invalid params block")?,
        None => RenderingParams::default(),
    };

    let mut scene = Scene::new();
    let mut material_ids = HashMap::new();

    if let Some(materials) = root.get("materials").and_then(Value::as_array) {
        for entry in materials {
            let (name, material) = load_material(entry, data_root)?;
            if material_ids.contains_key(&name) {
                bail!("duplicate material name '{}'", name);
            }
            let id = scene.add_material(material);
            material_ids.insert(name, id);
        }
    }
    if material_ids.is_empty() {
        // a default material so bare geometry still renders
        let id = scene.add_material(Material::new("default"));
        material_ids.insert("default".to_owned(), id);
    }

    if let Some(objects) = root.get("objects").and_then(Value::as_array) {
        for entry in objects {
            load_object(&mut scene, entry, &material_ids, data_root)?;
        }
    }

    if let Some(lights) = root.get("lights").and_then(Value::as_array) {
        for entry in lights {
            load_light(&mut scene, entry, data_root)?;
        }
    }

    scene.finalize();
    Ok(LoadedScene {
        scene,
        camera,
        params,
    })
}

fn load_camera(value: &Value) -> Result<CameraConfig> {
    let mut config = CameraConfig::default();
    if let Some(position) = vec3_field(value, "position") {
        config.position = position;
    }
    if let Some(look_at) = vec3_field(value, "look_at") {
        config.look_at = look_at;
    }
    if let Some(up) = vec3_field(value, "up") {
        config.up = up;
    }
    if let Some(fov) = f32_field(value, "fov") {
        if !(1.0..179.0).contains(&fov) {
            bail!("camera fov {} out of range", fov);
        }
        config.fov_y = fov.to_radians();
    }
    Ok(config)
}

fn load_material(value: &Value, data_root: &Path) -> Result<(String, Material)> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("material without a name"))?
        .to_owned();
    let mut material = Material::new(&name);

    if let Some(bsdf) = value.get("bsdf").and_then(Value::as_str) {
        if !material.set_bsdf(bsdf) {
            bail!("material '{}' uses unknown BSDF '{}'", name, bsdf);
        }
    }

    if let Some(color) = vec3_field(value, "base_color") {
        material.base_color.base = color;
    }
    if let Some(emission) = vec3_field(value, "emission") {
        material.emission.base = emission;
    }
    if let Some(roughness) = f32_field(value, "roughness") {
        material.roughness.base = roughness;
    }
    if let Some(metalness) = f32_field(value, "metalness") {
        material.metalness.base = metalness;
    }
    if let Some(ior) = f32_field(value, "ior") {
        material.ior = ior;
    }
    if let Some(k) = f32_field(value, "k") {
        material.k = k;
    }
    if let Some(dispersive) = value.get("dispersive").and_then(Value::as_bool) {
        material.is_dispersive = dispersive;
    }
    if let Some(c) = f32_field(value, "dispersion_c") {
        material.dispersion.c = c;
    }
    if let Some(d) = f32_field(value, "dispersion_d") {
        material.dispersion.d = d;
    }

    if let Some(texture) = value.get("base_color_texture") {
        material.base_color.texture = Some(Arc::new(load_texture(texture, data_root)?));
    }
    if let Some(texture) = value.get("normal_map") {
        material.normal_map = Some(Arc::new(load_texture(texture, data_root)?));
    }

    Ok((name, material))
}

fn load_texture(value: &Value, data_root: &Path) -> Result<Textures> {
    match value.get("type").and_then(Value::as_str) {
        Some("checkerboard") => {
            let color_a = vec3_field(value, "color_a").unwrap_or(Vec3::ONE);
            let color_b = vec3_field(value, "color_b").unwrap_or(Vec3::ZERO);
            let scale = f32_field(value, "scale").unwrap_or(8.0);
            Ok(CheckerboardTexture::new(color_a, color_b, scale).into())
        }
        Some("bitmap") => {
            let file = value
                .get("path")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("bitmap texture without a path"))?;
            Ok(BitmapTexture::load(&resolve_path(file, data_root))?.into())
        }
        other => bail!("unknown texture type {:?}", other),
    }
}

fn load_object(
    scene: &mut Scene,
    value: &Value,
    material_ids: &HashMap<String, u32>,
    data_root: &Path,
) -> Result<()> {
    let material = value
        .get("material")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let material_id = *material_ids
        .get(material)
        .ok_or_else(|| anyhow!("object references unknown material '{}'", material))?;

    match value.get("type").and_then(Value::as_str) {
        Some("sphere") => {
            let center = vec3_field(value, "center").unwrap_or(Vec3::ZERO);
            let radius = f32_field(value, "radius").unwrap_or(1.0);
            scene.add_shape(Sphere::new(center, radius).into(), material_id);
        }
        Some("plane") => {
            let origin = vec3_field(value, "origin").unwrap_or(Vec3::ZERO);
            let normal = vec3_field(value, "normal").unwrap_or(Vec3::Y);
            scene.add_shape(Plane::new(origin, normal).into(), material_id);
        }
        Some("rect") => {
            let p0 = require_vec3(value, "p0")?;
            let edge0 = require_vec3(value, "edge0")?;
            let edge1 = require_vec3(value, "edge1")?;
            scene.add_shape(Rect::new(p0, edge0, edge1).into(), material_id);
        }
        Some("mesh") => {
            let file = value
                .get("file")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("mesh object without a file"))?;
            let mesh = Mesh::load_obj(&resolve_path(file, data_root))?;
            scene.add_shape(mesh.into(), material_id);
        }
        other => bail!("unknown object type {:?}", other),
    }
    Ok(())
}

fn load_light(scene: &mut Scene, value: &Value, data_root: &Path) -> Result<()> {
    let color = Spectrum::new(vec3_field(value, "color").unwrap_or(Vec3::ONE));

    match value.get("type").and_then(Value::as_str) {
        Some("area") => {
            let p0 = require_vec3(value, "p0")?;
            let edge0 = require_vec3(value, "edge0")?;
            let edge1 = require_vec3(value, "edge1")?;
            let is_triangle = value
                .get("triangle")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            scene.add_light(AreaLight::new(p0, edge0, edge1, color, is_triangle).into());
        }
        Some("sphere") => {
            let position = require_vec3(value, "position")?;
            let radius = f32_field(value, "radius").unwrap_or(0.5);
            scene.add_light(SphereLight::new(position, radius, color).into());
        }
        Some("point") => {
            let position = require_vec3(value, "position")?;
            scene.add_light(PointLight::new(position, color).into());
        }
        Some("directional") => {
            let direction = require_vec3(value, "direction")?;
            let angle = f32_field(value, "angle").unwrap_or(0.0);
            scene.add_light(DirectionalLight::new(direction, color, angle).into());
        }
        Some("spot") => {
            let position = require_vec3(value, "position")?;
            let direction = require_vec3(value, "direction")?;
            let angle = f32_field(value, "angle").unwrap_or(0.5);
            scene.add_light(SpotLight::new(position, direction, color, angle).into());
        }
        Some("background") => {
            let light = match value.get("texture").and_then(Value::as_str) {
                Some(file) => {
                    let texture: Textures =
                        BitmapTexture::load(&resolve_path(file, data_root))?.into();
                    BackgroundLight::with_texture(color, Arc::new(texture))
                }
                None => BackgroundLight::new(color),
            };
            scene.add_light(light.into());
        }
        other => bail!("unknown light type {:?}", other),
    }
    Ok(())
}

fn resolve_path(file: &str, data_root: &Path) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_owned()
    } else {
        data_root.join(path)
    }
}

fn vec3_field(value: &Value, key: &str) -> Option<Vec3> {
    let array = value.get(key)?.as_array()?;
    if array.len() != 3 {
        return None;
    }
    Some(Vec3::new(
        array[0].as_f64()? as f32,
        array[1].as_f64()? as f32,
        array[2].as_f64()? as f32,
    ))
}

fn require_vec3(value: &Value, key: &str) -> Result<Vec3> {
    vec3_field(value, key).ok_or_else(|| anyhow!("missing or malformed field '{}'", key))
}

fn f32_field(value: &Value, key: &str) -> Option<f32> {
    value.get(key)?.as_f64().map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_scene() {
        let json = r#"{
            "camera": { "position": [0, 2, -6], "look_at": [0, 1, 0], "fov": 45 },
            "params": { "max_ray_depth": 6 },
            "materials": [
                { "name": "white", "bsdf": "diffuse", "base_color": [0.7, 0.7, 0.7] },
                { "name": "glass", "bsdf": "dielectric", "ior": 1.5, "dispersive": true }
            ],
            "objects": [
                { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "glass" },
                { "type": "plane", "origin": [0, 0, 0], "normal": [0, 1, 0], "material": "white" }
            ],
            "lights": [
                { "type": "point", "position": [0, 5, 0], "color": [50, 50, 50] },
                { "type": "background", "color": [0.1, 0.1, 0.2] }
            ]
        }"#;
        let dir = std::env::temp_dir();
        let path = dir.join("caustic_loader_test.json");
        fs::write(&path, json).unwrap();

        let loaded = load_scene(&path, &dir).expect("scene should load");
        assert_eq!(loaded.params.max_ray_depth, 6);
        assert_eq!(loaded.scene.lights().len(), 2);
        assert!((loaded.camera.fov_y - 45.0f32.to_radians()).abs() < 1.0e-6);

        fs::remove_file(path).ok();
    }

    #[test]
    fn unknown_bsdf_is_a_load_error() {
        let json = r#"{
            "materials": [ { "name": "bad", "bsdf": "nonsense" } ]
        }"#;
        let dir = std::env::temp_dir();
        let path = dir.join("caustic_loader_bad.json");
        fs::write(&path, json).unwrap();
        assert!(load_scene(&path, &dir).is_err());
        fs::remove_file(path).ok();
    }
}
