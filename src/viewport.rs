//! The render loop: a frame is split into square tiles pulled from an
//! atomic queue by a fixed pool of workers, one per hardware thread.
//! Each pass runs the renderer's single-threaded pre-pass hooks, seeds
//! the samplers from the Halton sequence, renders all tiles in parallel
//! and aggregates counters. Workers own their sampling state; the film
//! is the only shared mutable structure and handles its own atomicity.

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use glam::Vec2;
use scoped_threadpool::Pool;

use crate::camera::Camera;
use crate::film::Film;
use crate::renderer::{
    RayTracingCounters, RenderParam, Renderer, Renderers, RenderingContext, RenderingParams,
};
use crate::sampler::{halton, BlueNoiseTexture};
use crate::scene::Scene;

/// Work queue of tile coordinates, drained lock-free by the workers.
struct TileQueue {
    tiles: Vec<(u32, u32)>,
    tile_size: u32,
    next: AtomicUsize,
}

impl TileQueue {
    fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let nx = (width + tile_size - 1) / tile_size;
        let ny = (height + tile_size - 1) / tile_size;
        let tiles = (0..nx * ny).map(|i| (i % nx, i / nx)).collect();
        Self {
            tiles,
            tile_size,
            next: AtomicUsize::new(0),
        }
    }

    fn reset(&mut self) {
        *self.next.get_mut() = 0;
    }

    fn next(&self) -> Option<(u32, u32)> {
        let i = self.next.fetch_add(1, Ordering::AcqRel);
        self.tiles.get(i).copied()
    }
}

pub struct Viewport {
    camera: Camera,
    film: Film,
    params: RenderingParams,
    passes_finished: u32,
    tile_queue: TileQueue,
    thread_data: Vec<RenderingContext>,
    pool: Pool,
    total_counters: RayTracingCounters,
}

impl Viewport {
    pub fn new(
        camera: Camera,
        params: RenderingParams,
        blue_noise: Option<BlueNoiseTexture>,
        num_threads: Option<u32>,
    ) -> Self {
        let num_threads = num_threads.unwrap_or_else(|| num_cpus::get() as u32).max(1);
        let width = camera.width();
        let height = camera.height();

        let thread_data = (0..num_threads)
            .map(|i| RenderingContext::new(params, blue_noise.clone(), i))
            .collect();

        info!(
            "viewport: {}x{} pixels, {} threads, {} px tiles",
            width, height, num_threads, params.tile_size
        );

        Self {
            camera,
            film: Film::new(width, height),
            params,
            passes_finished: 0,
            tile_queue: TileQueue::new(width, height, params.tile_size),
            thread_data,
            pool: Pool::new(num_threads),
            total_counters: RayTracingCounters::default(),
        }
    }

    pub fn film(&self) -> &Film {
        &self.film
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn passes_finished(&self) -> u32 {
        self.passes_finished
    }

    pub fn counters(&self) -> &RayTracingCounters {
        &self.total_counters
    }

    pub fn params(&self) -> &RenderingParams {
        &self.params
    }

    /// Restart accumulation from scratch.
    pub fn reset(&mut self) {
        self.film.clear();
        self.passes_finished = 0;
        self.total_counters.reset();
    }

    /// Run `passes` sample passes, checking the stop flag between
    /// passes. Tiles always run to completion.
    pub fn render(
        &mut self,
        scene: &Scene,
        renderer: &mut Renderers,
        passes: u32,
        stop: &AtomicBool,
    ) {
        for _ in 0..passes {
            if stop.load(Ordering::Relaxed) {
                info!("render stopped after {} passes", self.passes_finished);
                break;
            }
            self.render_pass(scene, renderer);
        }
    }

    /// One full sample pass over the image.
    pub fn render_pass(&mut self, scene: &Scene, renderer: &mut Renderers) {
        let start = Instant::now();
        let pass = self.passes_finished;
        let width = self.camera.width();
        let height = self.camera.height();

        // make sure every worker carries the scratch this renderer needs
        for ctx in &mut self.thread_data {
            if mem::discriminant(&ctx.renderer_context)
                != mem::discriminant(&renderer.create_context())
            {
                ctx.renderer_context = renderer.create_context();
            }
        }

        // single-threaded pre-pass hooks
        renderer.pre_render(pass, width, height);
        renderer.pre_render_global(&mut self.thread_data);

        // fresh sampler seeds for this pass
        let seed = halton::frame_seed(pass);
        for ctx in &mut self.thread_data {
            ctx.sampler.reset_frame(seed.clone());
            ctx.counters.reset();
        }

        // parallel tile render
        self.tile_queue.reset();
        let queue = &self.tile_queue;
        let camera = &self.camera;
        let film = &self.film;
        let renderer_ref: &Renderers = renderer;
        // even passes also feed the secondary sum used for variance
        // estimation
        let secondary = pass % 2 == 0;

        self.pool.scoped(|scope| {
            for ctx in self.thread_data.iter_mut() {
                scope.execute(move || {
                    let param = RenderParam {
                        camera,
                        film,
                        iteration: pass,
                        secondary,
                    };
                    while let Some((tile_x, tile_y)) = queue.next() {
                        render_tile(
                            scene,
                            renderer_ref,
                            &param,
                            ctx,
                            tile_x * queue.tile_size,
                            tile_y * queue.tile_size,
                        );
                    }
                });
            }
        });

        for ctx in &self.thread_data {
            self.total_counters.append(&ctx.counters);
        }

        self.passes_finished += 1;
        let elapsed = start.elapsed().as_secs_f32();
        info!(
            "pass {} done in {:.2}s ({} rays, {} shadow rays)",
            self.passes_finished,
            elapsed,
            self.total_counters.num_rays,
            self.total_counters.num_shadow_rays
        );

        if self.passes_finished % 2 == 0 {
            debug!(
                "estimated error after {} passes: {:.5}",
                self.passes_finished,
                self.film.estimate_error(self.passes_finished)
            );
        }
    }
}

fn render_tile(
    scene: &Scene,
    renderer: &Renderers,
    param: &RenderParam,
    ctx: &mut RenderingContext,
    x0: u32,
    y0: u32,
) {
    let width = param.camera.width();
    let height = param.camera.height();
    let tile_size = ctx.params.tile_size;
    let x1 = (x0 + tile_size).min(width);
    let y1 = (y0 + tile_size).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            ctx.sampler.reset_pixel(x, y);
            ctx.wavelength.randomize(ctx.sampler.get_float());

            let jitter = ctx.sampler.get_float2();
            let film_uv = Vec2::new(
                (x as f32 + jitter.0) / width as f32,
                (y as f32 + jitter.1) / height as f32,
            );
            let ray = param.camera.generate_ray(film_uv);
            ctx.counters.num_primary_rays += 1;

            let color = renderer.render_pixel(scene, &ray, param, ctx);
            debug_assert!(color.is_valid());

            let value = color.to_tristimulus(&ctx.wavelength);
            param.film.accumulate(x, y, value, param.secondary);
        }
    }
}
