//! End-to-end scenes exercising the integrators against analytic
//! expectations and against each other. These run in RGB mode; the
//! spectral pipeline has its own gated checks.

use std::sync::atomic::AtomicBool;

use glam::Vec3;

use caustic::camera::Camera;
use caustic::color::Spectrum;
use caustic::film::Film;
use caustic::geometry::{Plane, Rect, Sphere};
use caustic::light::{AreaLight, BackgroundLight, PointLight};
use caustic::material::Material;
use caustic::renderer::{Renderers, RenderingParams};
use caustic::scene::Scene;
use caustic::viewport::Viewport;

fn diffuse_material(name: &str, albedo: Vec3) -> Material {
    let mut m = Material::new(name);
    m.base_color.base = albedo;
    m.roughness.base = 0.0;
    assert!(m.set_bsdf("diffuse"));
    m
}

fn render(
    scene: &Scene,
    camera: Camera,
    renderer_name: &str,
    passes: u32,
    params: RenderingParams,
) -> (Vec<Vec3>, u32, u32) {
    let mut renderer = Renderers::by_name(renderer_name).expect("renderer name");
    let mut viewport = Viewport::new(camera, params, None, Some(2));
    let stop = AtomicBool::new(false);
    viewport.render(scene, &mut renderer, passes, &stop);

    let film: &Film = viewport.film();
    let (w, h) = (film.width(), film.height());
    let mut pixels = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            pixels.push(film.pixel(x, y, viewport.passes_finished()));
        }
    }
    (pixels, w, h)
}

fn region_mean(pixels: &[Vec3], width: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += pixels[(y * width + x) as usize];
            count += 1;
        }
    }
    sum / count as f32
}

/// Furnace: a diffuse sphere of albedo 0.5 inside a unit-radiance white
/// environment must converge to 0.5 on every sphere pixel.
#[cfg(not(feature = "spectral"))]
#[test]
fn furnace_test_pt_mis() {
    let mut scene = Scene::new();
    let sphere_material = scene.add_material(diffuse_material("gray", Vec3::splat(0.5)));
    scene.add_shape(Sphere::new(Vec3::ZERO, 1.0).into(), sphere_material);
    scene.add_light(BackgroundLight::new(Spectrum::splat(1.0)).into());
    scene.finalize();

    let camera = Camera::new(
        Vec3::new(0.0, 0.0, -4.0),
        Vec3::ZERO,
        Vec3::Y,
        60.0f32.to_radians(),
        16,
        16,
    );
    let (pixels, width, _) = render(&scene, camera, "ptmis", 1024, RenderingParams::default());

    // the central pixels all see the sphere
    let mean = region_mean(&pixels, width, 6, 6, 10, 10);
    for c in [mean.x, mean.y, mean.z] {
        assert!(
            (c - 0.5).abs() < 0.01,
            "furnace pixel converged to {} instead of 0.5",
            c
        );
    }
}

/// A point light over a Lambertian floor has the analytic answer
/// albedo * intensity / (pi * d^2) directly below the light.
#[cfg(not(feature = "spectral"))]
#[test]
fn point_light_floor_matches_analytic_value() {
    let mut scene = Scene::new();
    let floor = scene.add_material(diffuse_material("floor", Vec3::splat(0.8)));
    scene.add_shape(Plane::new(Vec3::ZERO, Vec3::Y).into(), floor);
    scene.add_light(PointLight::new(Vec3::new(0.0, 5.0, 0.0), Spectrum::splat(100.0)).into());
    scene.finalize();

    let camera = Camera::new(
        Vec3::new(0.0, 2.0, -2.0),
        Vec3::ZERO,
        Vec3::Y,
        50.0f32.to_radians(),
        32,
        32,
    );

    let expected = 0.8 * 100.0 / (std::f32::consts::PI * 25.0);

    let (pixels, width, _) = render(&scene, camera.clone(), "ptmis", 64, RenderingParams::default());
    let mean = region_mean(&pixels, width, 14, 14, 18, 18);
    assert!(
        (mean.x - expected).abs() / expected < 0.02,
        "PT-MIS read {} but the analytic value is {}",
        mean.x,
        expected
    );

    // the naive tracer cannot sample a delta light at all
    let (pixels, width, _) = render(&scene, camera, "pt", 16, RenderingParams::default());
    let mean = region_mean(&pixels, width, 14, 14, 18, 18);
    assert!(
        mean.x.abs() < 1.0e-6,
        "naive PT should see nothing, read {}",
        mean.x
    );
}

fn cornell_box() -> (Scene, Camera) {
    let mut scene = Scene::new();
    let white = scene.add_material(diffuse_material("white", Vec3::splat(0.73)));
    let red = scene.add_material(diffuse_material("red", Vec3::new(0.63, 0.06, 0.05)));
    let green = scene.add_material(diffuse_material("green", Vec3::new(0.14, 0.45, 0.09)));

    // a 2x2x2 box opening toward -Z
    scene.add_shape(
        Rect::new(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        )
        .into(),
        white,
    ); // floor
    scene.add_shape(
        Rect::new(
            Vec3::new(-1.0, 2.0, -1.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        )
        .into(),
        white,
    ); // ceiling
    scene.add_shape(
        Rect::new(
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        )
        .into(),
        white,
    ); // back wall
    scene.add_shape(
        Rect::new(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 2.0, 0.0),
        )
        .into(),
        red,
    ); // left wall
    scene.add_shape(
        Rect::new(
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 2.0, 0.0),
        )
        .into(),
        green,
    ); // right wall

    // ceiling light, normal facing down
    scene.add_light(
        AreaLight::new(
            Vec3::new(-0.3, 1.99, -0.3),
            Vec3::new(0.0, 0.0, 0.6),
            Vec3::new(0.6, 0.0, 0.0),
            Spectrum::splat(8.0),
            false,
        )
        .into(),
    );
    scene.finalize();

    let camera = Camera::new(
        Vec3::new(0.0, 1.0, -2.8),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::Y,
        55.0f32.to_radians(),
        32,
        32,
    );
    (scene, camera)
}

/// The MIS path tracer, BDPT and VCM are all unbiased estimators of the
/// same integral; on a diffuse box they must agree.
#[cfg(not(feature = "spectral"))]
#[test]
fn integrators_agree_on_the_cornell_box() {
    let (scene, camera) = cornell_box();
    // the bidirectional renderers cap total path length at 12, matching
    // the default ray depth here
    let params = RenderingParams::default();

    let passes = 192;
    let (reference, width, height) = render(&scene, camera.clone(), "ptmis", passes, params);
    let reference_mean = region_mean(&reference, width, 4, 4, width - 4, height - 4);
    assert!(reference_mean.x > 0.01, "reference image is black");

    for name in ["bdpt", "vcm"] {
        let (image, w, h) = render(&scene, camera.clone(), name, passes, params);
        assert_eq!((w, h), (width, height));
        let mean = region_mean(&image, w, 4, 4, w - 4, h - 4);

        for c in 0..3 {
            let a = reference_mean[c];
            let b = mean[c];
            assert!(
                (a - b).abs() / a.max(1.0e-3) < 0.05,
                "{} disagrees with PT-MIS on channel {}: {} vs {}",
                name,
                c,
                b,
                a
            );
        }

        // per-pixel agreement over the interior, allowing Monte Carlo
        // noise
        let mut rms = 0.0f32;
        let mut count = 0;
        for y in 4..h - 4 {
            for x in 4..w - 4 {
                let d = image[(y * w + x) as usize] - reference[(y * w + x) as usize];
                rms += d.length_squared();
                count += 1;
            }
        }
        let rms = (rms / count as f32).sqrt();
        assert!(
            rms < 0.12,
            "{} differs from PT-MIS with RMS {}",
            name,
            rms
        );
    }
}

/// The light tracer is also unbiased but splats everything through the
/// camera; its overall brightness must match the reference.
#[cfg(not(feature = "spectral"))]
#[test]
fn light_tracer_brightness_matches_pt_mis() {
    let (scene, camera) = cornell_box();
    let params = RenderingParams::default();

    let passes = 256;
    let (reference, width, height) = render(&scene, camera.clone(), "ptmis", passes, params);
    let (image, _, _) = render(&scene, camera, "lt", passes, params);

    // ignore pixels on the light itself: the light tracer never sees
    // emitters directly
    let a = region_mean(&reference, width, 4, 12, width - 4, height - 4);
    let b = region_mean(&image, width, 4, 12, width - 4, height - 4);
    let rel = (a.x - b.x).abs() / a.x.max(1.0e-3);
    assert!(
        rel < 0.15,
        "light tracer brightness {} vs reference {}",
        b.x,
        a.x
    );
}

/// Spectral dispersion: a dispersive glass sphere under a strong
/// directional light must produce finite, non-negative output.
#[cfg(feature = "spectral")]
#[test]
fn dispersion_stays_finite() {
    use caustic::light::DirectionalLight;

    let mut scene = Scene::new();
    let floor = scene.add_material(diffuse_material("floor", Vec3::splat(0.9)));
    scene.add_shape(Plane::new(Vec3::ZERO, Vec3::Y).into(), floor);

    let mut glass = Material::new("glass");
    assert!(glass.set_bsdf("dielectric"));
    glass.is_dispersive = true;
    glass.dispersion.c = 0.020;
    glass.dispersion.d = 1.0;
    let glass_id = scene.add_material(glass);
    scene.add_shape(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 0.8).into(), glass_id);

    scene.add_light(
        DirectionalLight::new(Vec3::new(-0.3, -1.0, 0.2), Spectrum::splat(5.0), 0.02).into(),
    );
    scene.finalize();

    let camera = Camera::new(
        Vec3::new(0.0, 2.0, -4.0),
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::Y,
        50.0f32.to_radians(),
        24,
        24,
    );
    let (pixels, _, _) = render(&scene, camera, "ptmis", 32, RenderingParams::default());
    for p in &pixels {
        assert!(p.is_finite(), "non-finite pixel in dispersion render");
        assert!(p.x >= 0.0 && p.y >= 0.0 && p.z >= 0.0);
    }
}
