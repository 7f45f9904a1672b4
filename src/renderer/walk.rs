//! The random-walk skeleton shared by the bidirectional integrators:
//! path state with the three partial MIS accumulators, the advance step
//! that updates them, and the Russian roulette policy used by the
//! unidirectional tracers.

use crate::bsdf::{BsdfEvent, PdfDirection};
use crate::color::{RayColor, Wavelength};
use crate::material::{Material, ShadingData};
use crate::math::Ray;

use super::mis;

/// State of a subpath being advanced, camera- or light-side.
#[derive(Clone, Copy)]
pub struct PathState {
    pub ray: Ray,
    pub throughput: RayColor,
    /// Number of completed segments.
    pub length: u32,
    pub d_vc: f32,
    pub d_vm: f32,
    pub d_vcm: f32,
    pub last_sampled_event: BsdfEvent,
    pub last_specular: bool,
    /// Whether the light that started this subpath has a bounded
    /// surface (light subpaths only).
    pub is_finite_light: bool,
}

impl PathState {
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            throughput: RayColor::one(),
            length: 1,
            d_vc: 0.0,
            d_vm: 0.0,
            d_vcm: 0.0,
            last_sampled_event: BsdfEvent::empty(),
            last_specular: true,
            is_finite_light: false,
        }
    }
}

/// A stored light-subpath vertex available for camera connections.
#[derive(Clone, Copy)]
pub struct LightVertex {
    pub shading: ShadingData,
    pub throughput: RayColor,
    pub d_vc: f32,
    pub d_vm: f32,
    pub d_vcm: f32,
    pub path_length: u32,
}

/// Sample the BSDF at `shading` and advance the path one segment,
/// updating throughput and the partial MIS quantities. `eta_vc` and
/// `eta_vm` are the per-iteration connection/merging MIS constants
/// (zero when the corresponding technique is disabled). Returns false
/// when the walk must terminate.
pub fn advance_path(
    path: &mut PathState,
    shading: &ShadingData,
    material: &Material,
    wavelength: &mut Wavelength,
    sample: [f32; 3],
    eta_vc: f32,
    eta_vm: f32,
) -> bool {
    let result = material.sample(wavelength, shading, sample);
    if result.event.is_empty() {
        return false;
    }
    debug_assert!(result.weight.is_valid());

    path.throughput *= result.weight;
    if path.throughput.almost_zero() {
        return false;
    }
    debug_assert!(result.pdf >= 0.0 && result.pdf.is_finite());

    let cos_theta_out = shading.cos_theta(result.incoming_dir_world).abs();

    if result.event.intersects(BsdfEvent::SPECULAR) {
        // specular events are symmetric; reverse pdf equals forward
        path.d_vc *= mis(cos_theta_out);
        path.d_vm *= mis(cos_theta_out);
        path.d_vcm = 0.0;
        path.last_specular = true;
    } else {
        let reverse_pdf = material.pdf(shading, result.incoming_dir_world, PdfDirection::Reverse);
        let inv_pdf = 1.0 / result.pdf;

        path.d_vc = mis(cos_theta_out * inv_pdf)
            * (path.d_vc * mis(reverse_pdf) + path.d_vcm + eta_vm);
        path.d_vm = mis(cos_theta_out * inv_pdf)
            * (path.d_vm * mis(reverse_pdf) + path.d_vcm * eta_vc + 1.0);
        path.d_vcm = mis(inv_pdf);
        path.last_specular = false;
    }

    debug_assert!(path.d_vc.is_finite() && path.d_vc >= 0.0);
    debug_assert!(path.d_vm.is_finite() && path.d_vm >= 0.0);
    debug_assert!(path.d_vcm.is_finite() && path.d_vcm >= 0.0);

    path.ray = Ray::spawn(shading.frame.position, result.incoming_dir_world);
    path.last_sampled_event = result.event;
    path.length += 1;

    true
}

/// Continuation probability of the Russian roulette step, driven by the
/// path's remaining throughput. When a dispersive collapse left a
/// single hero wavelength, the threshold is scaled down so the rescaled
/// throughput does not inflate survival.
pub fn roulette_threshold(throughput_max: f32, wavelength: &Wavelength) -> f32 {
    let min_value = 0.125;
    let mut threshold = min_value + (1.0 - min_value) * throughput_max.clamp(0.0, 1.0);
    #[cfg(feature = "spectral")]
    if wavelength.is_single {
        threshold /= crate::color::COMPONENTS as f32;
    }
    #[cfg(not(feature = "spectral"))]
    let _ = wavelength;
    threshold
}
