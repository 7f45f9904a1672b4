//! The material container: textured surface parameters, exactly one
//! BSDF, optional normal mapping and chromatic dispersion. Materials
//! wrap the local-space BSDF protocol with the world/local transforms of
//! the hit point's shading frame.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::bsdf::{
    Bsdf, BsdfEvent, Bsdfs, EvaluationContext, PdfDirection, PlasticBsdf,
    SampledMaterialParameters, SamplingContext,
};
use crate::color::{RayColor, Spectrum, Wavelength};
use crate::math::ShadingFrame;
use crate::texture::{Texture, Textures};

/// Everything the renderers know about a surface hit: the shading frame,
/// texture coordinates, the owning material and the parameters already
/// evaluated at the hit.
#[derive(Debug, Clone, Copy)]
pub struct ShadingData {
    pub frame: ShadingFrame,
    pub tex_coord: Vec2,
    pub material_id: u32,
    /// World-space direction toward the previous path vertex.
    pub outgoing_dir_world: Vec3,
    pub params: SampledMaterialParameters,
}

impl ShadingData {
    pub fn cos_theta(&self, dir_world: Vec3) -> f32 {
        self.frame.cos_theta(dir_world)
    }
}

/// A color parameter with an optional modulating texture.
#[derive(Clone)]
pub struct ColorParameter {
    pub base: Vec3,
    pub texture: Option<Arc<Textures>>,
}

impl ColorParameter {
    pub fn new(base: Vec3) -> Self {
        Self {
            base,
            texture: None,
        }
    }

    pub fn evaluate(&self, uv: Vec2) -> Vec3 {
        match &self.texture {
            Some(t) => self.base * t.evaluate(uv),
            None => self.base,
        }
    }
}

/// A scalar parameter with an optional modulating texture (red channel).
#[derive(Clone)]
pub struct ScalarParameter {
    pub base: f32,
    pub texture: Option<Arc<Textures>>,
}

impl ScalarParameter {
    pub fn new(base: f32) -> Self {
        Self {
            base,
            texture: None,
        }
    }

    pub fn evaluate(&self, uv: Vec2) -> f32 {
        match &self.texture {
            Some(t) => self.base * t.evaluate(uv).x,
            None => self.base,
        }
    }
}

/// Cauchy-style dispersion coefficients: n(lambda) = D + C / lambda^2
/// with lambda in micrometers. Defaults approximate BK7 glass.
#[derive(Debug, Clone, Copy)]
pub struct DispersionParams {
    pub c: f32,
    pub d: f32,
}

impl Default for DispersionParams {
    fn default() -> Self {
        Self {
            c: 0.00420,
            d: 1.5046,
        }
    }
}

pub struct Material {
    pub debug_name: String,

    /// Light emitted by the surface itself.
    pub emission: ColorParameter,
    /// Albedo for dielectrics, reflection tint for metals.
    pub base_color: ColorParameter,
    /// 0 is a perfect mirror, 1 maximal diffusion.
    pub roughness: ScalarParameter,
    pub metalness: ScalarParameter,

    pub normal_map: Option<Arc<Textures>>,
    pub normal_map_strength: f32,

    /// Real part of the index of refraction. Ignored when the material
    /// is dispersive.
    pub ior: f32,
    /// Imaginary part (conductor absorption).
    pub k: f32,

    pub dispersion: DispersionParams,
    pub is_dispersive: bool,

    bsdf: Bsdfs,
}

impl Material {
    pub fn new(debug_name: &str) -> Self {
        Self {
            debug_name: debug_name.to_owned(),
            emission: ColorParameter::new(Vec3::ZERO),
            base_color: ColorParameter::new(Vec3::splat(0.7)),
            roughness: ScalarParameter::new(0.1),
            metalness: ScalarParameter::new(0.0),
            normal_map: None,
            normal_map_strength: 1.0,
            ior: 1.5,
            k: 4.0,
            dispersion: DispersionParams::default(),
            is_dispersive: false,
            bsdf: PlasticBsdf.into(),
        }
    }

    /// Select the BSDF by scene-file name. Returns false and keeps the
    /// current one when the name is unknown.
    pub fn set_bsdf(&mut self, name: &str) -> bool {
        match Bsdfs::by_name(name) {
            Some(b) => {
                self.bsdf = b;
                true
            }
            None => {
                warn!("unknown BSDF '{}' for material '{}'", name, self.debug_name);
                false
            }
        }
    }

    pub fn bsdf(&self) -> &Bsdfs {
        &self.bsdf
    }

    /// Index of refraction effective at the bundle's hero wavelength.
    fn effective_ior(&self, wavelength: &Wavelength) -> f32 {
        if self.is_dispersive {
            let lambda = wavelength.hero_wavelength_um();
            self.dispersion.d + self.dispersion.c / (lambda * lambda)
        } else {
            self.ior
        }
    }

    /// Evaluate the textured parameters at the hit point and perturb the
    /// shading frame by the normal map.
    pub fn evaluate_shading_data(&self, wavelength: &Wavelength, shading: &mut ShadingData) {
        let uv = shading.tex_coord;
        shading.params = SampledMaterialParameters {
            base_color: RayColor::resolve(wavelength, Spectrum::new(self.base_color.evaluate(uv))),
            roughness: self.roughness.evaluate(uv),
            metalness: self.metalness.evaluate(uv),
            ior: self.effective_ior(wavelength),
            k: self.k,
        };

        if let Some(map) = &self.normal_map {
            let texel = map.evaluate(uv) * 2.0 - Vec3::ONE;
            let local = Vec3::new(
                texel.x * self.normal_map_strength,
                texel.y * self.normal_map_strength,
                texel.z.max(0.1),
            )
            .normalize();
            let normal = shading.frame.local_to_world(local).normalize();
            shading.frame = ShadingFrame::with_tangent(
                shading.frame.position,
                normal,
                shading.frame.tangent,
            );
        }
    }

    /// Emission of the surface, resolved at the bundle wavelengths.
    pub fn evaluate_emission(&self, wavelength: &Wavelength, uv: Vec2) -> RayColor {
        let rgb = self.emission.evaluate(uv);
        if rgb == Vec3::ZERO {
            return RayColor::zero();
        }
        RayColor::resolve(wavelength, Spectrum::new(rgb))
    }

    /// Importance-sample a scattering direction. A dispersive refraction
    /// collapses the wavelength bundle to its hero component and rescales
    /// the weight so energy is conserved in expectation.
    pub fn sample(
        &self,
        wavelength: &mut Wavelength,
        shading: &ShadingData,
        sample: [f32; 3],
    ) -> MaterialSample {
        let outgoing_local = shading.frame.world_to_local(shading.outgoing_dir_world);
        let result = self.bsdf.sample(&SamplingContext {
            params: &shading.params,
            outgoing_dir: outgoing_local,
            sample,
        });

        if result.event.is_empty() {
            return MaterialSample::null();
        }

        let weight = self.apply_dispersion(wavelength, result.event, result.weight);

        MaterialSample {
            incoming_dir_world: shading.frame.local_to_world(result.incoming_dir),
            weight,
            pdf: result.pdf,
            event: result.event,
        }
    }

    /// Collapse the wavelength bundle on a dispersive refraction; the
    /// hero wavelength keeps the (rescaled) remaining throughput.
    #[cfg(feature = "spectral")]
    fn apply_dispersion(
        &self,
        wavelength: &mut Wavelength,
        event: BsdfEvent,
        weight: RayColor,
    ) -> RayColor {
        if self.is_dispersive && event.intersects(BsdfEvent::TRANSMISSIVE) && !wavelength.is_single
        {
            wavelength.collapse_to_single();
            weight * RayColor::single_wavelength_fallback()
        } else {
            weight
        }
    }

    #[cfg(not(feature = "spectral"))]
    fn apply_dispersion(
        &self,
        _wavelength: &mut Wavelength,
        _event: BsdfEvent,
        weight: RayColor,
    ) -> RayColor {
        weight
    }

    /// Evaluate the BSDF toward an explicit direction (NEE, vertex
    /// connections). `dir_to_light_world` points from the surface toward
    /// the light. Delta BSDFs evaluate to zero.
    pub fn evaluate(&self, shading: &ShadingData, dir_to_light_world: Vec3) -> MaterialEvaluation {
        if self.bsdf.is_delta() {
            return MaterialEvaluation::zero();
        }

        let ctx = EvaluationContext {
            params: &shading.params,
            outgoing_dir: shading.frame.world_to_local(shading.outgoing_dir_world),
            incoming_dir: shading.frame.world_to_local(dir_to_light_world),
        };
        let e = self.bsdf.evaluate(&ctx);
        MaterialEvaluation {
            factor: e.weight,
            pdf_w: e.pdf_forward,
            reverse_pdf_w: e.pdf_reverse,
        }
    }

    /// Sampling density of a direction pair, forward or reverse.
    pub fn pdf(
        &self,
        shading: &ShadingData,
        incoming_dir_world: Vec3,
        dir: PdfDirection,
    ) -> f32 {
        if self.bsdf.is_delta() {
            return 0.0;
        }
        let ctx = EvaluationContext {
            params: &shading.params,
            outgoing_dir: shading.frame.world_to_local(shading.outgoing_dir_world),
            incoming_dir: shading.frame.world_to_local(incoming_dir_world),
        };
        self.bsdf.pdf(&ctx, dir)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaterialSample {
    pub incoming_dir_world: Vec3,
    pub weight: RayColor,
    pub pdf: f32,
    pub event: BsdfEvent,
}

impl MaterialSample {
    pub fn null() -> Self {
        Self {
            incoming_dir_world: Vec3::ZERO,
            weight: RayColor::zero(),
            pdf: 0.0,
            event: BsdfEvent::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaterialEvaluation {
    /// NdotL-premultiplied BSDF value.
    pub factor: RayColor,
    pub pdf_w: f32,
    pub reverse_pdf_w: f32,
}

impl MaterialEvaluation {
    pub fn zero() -> Self {
        Self {
            factor: RayColor::zero(),
            pdf_w: 0.0,
            reverse_pdf_w: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ShadingFrame;

    fn shading_for(material: &Material, wavelength: &Wavelength) -> ShadingData {
        let mut shading = ShadingData {
            frame: ShadingFrame::new(Vec3::ZERO, Vec3::Z),
            tex_coord: Vec2::ZERO,
            material_id: 0,
            outgoing_dir_world: Vec3::new(0.2, 0.1, 0.95).normalize(),
            params: SampledMaterialParameters {
                base_color: RayColor::zero(),
                roughness: 0.0,
                metalness: 0.0,
                ior: 1.0,
                k: 0.0,
            },
        };
        material.evaluate_shading_data(wavelength, &mut shading);
        shading
    }

    #[test]
    fn shading_data_evaluation_fills_parameters() {
        let mut m = Material::new("test");
        m.base_color = ColorParameter::new(Vec3::new(0.6, 0.4, 0.2));
        m.roughness = ScalarParameter::new(0.3);
        let w = Wavelength::new();
        let shading = shading_for(&m, &w);
        assert!((shading.params.roughness - 0.3).abs() < 1.0e-6);
        assert!(shading.params.base_color.is_valid());
    }

    #[test]
    fn delta_bsdf_evaluates_to_zero() {
        let mut m = Material::new("glass");
        assert!(m.set_bsdf("dielectric"));
        let w = Wavelength::new();
        let shading = shading_for(&m, &w);
        let e = m.evaluate(&shading, Vec3::new(0.1, 0.0, 0.99).normalize());
        assert!(e.factor.almost_zero());
        assert_eq!(e.pdf_w, 0.0);
    }

    #[test]
    fn dispersive_ior_decreases_with_wavelength() {
        let mut m = Material::new("prism");
        m.is_dispersive = true;
        let mut w = Wavelength::new();
        w.randomize(0.0); // violet end
        let n_violet = m.effective_ior(&w);
        w.randomize(0.999); // red end
        let n_red = m.effective_ior(&w);
        assert!(n_violet > n_red);
    }

    #[cfg(feature = "spectral")]
    #[test]
    fn dispersive_refraction_collapses_the_bundle() {
        use rand::{Rng, SeedableRng, XorShiftRng};

        let mut m = Material::new("glass");
        assert!(m.set_bsdf("dielectric"));
        m.is_dispersive = true;
        let mut rng = XorShiftRng::from_seed([91, 92, 93, 94]);

        let mut collapsed = false;
        for _ in 0..64 {
            let mut w = Wavelength::new();
            w.randomize(rng.next_f32());
            let shading = shading_for(&m, &w);
            let s = m.sample(
                &mut w,
                &shading,
                [rng.next_f32(), rng.next_f32(), rng.next_f32()],
            );
            if s.event.intersects(BsdfEvent::TRANSMISSIVE) {
                assert!(w.is_single);
                // hero component carries the rescaled energy
                assert!(s.weight.values[0] > 0.0);
                assert_eq!(s.weight.values[1], 0.0);
                collapsed = true;
            }
        }
        assert!(collapsed, "no refraction event in 64 samples");
    }
}
