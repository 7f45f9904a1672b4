//! Per-thread ray statistics, aggregated and logged per pass.

#[derive(Debug, Default, Clone, Copy)]
pub struct RayTracingCounters {
    pub num_primary_rays: u64,
    pub num_rays: u64,
    pub num_shadow_rays: u64,
    pub num_shadow_rays_hit: u64,
}

impl RayTracingCounters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn append(&mut self, other: &RayTracingCounters) {
        self.num_primary_rays += other.num_primary_rays;
        self.num_rays += other.num_rays;
        self.num_shadow_rays += other.num_shadow_rays;
        self.num_shadow_rays_hit += other.num_shadow_rays_hit;
    }
}
