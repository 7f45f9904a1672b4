//! Command-line host: parses arguments, loads the scene, runs the
//! render loop and writes the output images.

use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use log::{error, info, warn};

use caustic::camera::Camera;
use caustic::renderer::Renderers;
use caustic::sampler::BlueNoiseTexture;
use caustic::scene::loader::load_scene;
use caustic::viewport::Viewport;

const EXIT_ARGUMENT_ERROR: i32 = 1;
const EXIT_INIT_FAILURE: i32 = 2;
const EXIT_RENDER_FAILURE: i32 = 3;

struct Args {
    width: u32,
    height: u32,
    scene: PathBuf,
    data_root: PathBuf,
    renderer: String,
    passes: u32,
    output: PathBuf,
    hdr_output: Option<PathBuf>,
    threads: Option<u32>,
}

fn usage() {
    eprintln!(
        "usage: caustic -s SCENE [options]
  -s PATH            scene file (JSON)
  -w N               image width (default 1280)
  -h N               image height (default 720)
  --data PATH        asset root for textures and meshes (default: scene directory)
  -r NAME            renderer: debug, pt, ptmis, lt, bdpt, vcm (default ptmis)
  -n N               number of sample passes (default 16)
  -o PATH            LDR output image (default output.png)
  --hdr PATH         also dump the HDR accumulator (PFM)
  -t N               worker threads (default: hardware threads)
  --debug-renderer   shorthand for -r debug
  -p                 accept but ignore ray-packet traversal (not implemented in this build)"
    );
}

fn parse_args() -> Option<Args> {
    let mut args = Args {
        width: 1280,
        height: 720,
        scene: PathBuf::new(),
        data_root: PathBuf::new(),
        renderer: "ptmis".to_owned(),
        passes: 16,
        output: PathBuf::from("output.png"),
        hdr_output: None,
        threads: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-w" => args.width = iter.next()?.parse().ok()?,
            "-h" => args.height = iter.next()?.parse().ok()?,
            "-s" => args.scene = PathBuf::from(iter.next()?),
            "--data" => args.data_root = PathBuf::from(iter.next()?),
            "-r" => args.renderer = iter.next()?,
            "-n" => args.passes = iter.next()?.parse().ok()?,
            "-o" => args.output = PathBuf::from(iter.next()?),
            "--hdr" => args.hdr_output = Some(PathBuf::from(iter.next()?)),
            "-t" => args.threads = Some(iter.next()?.parse().ok()?),
            "--debug-renderer" => args.renderer = "debug".to_owned(),
            "-p" => {
                warn!("ray-packet traversal is not compiled into this build, ignoring -p");
            }
            "--help" => return None,
            other => {
                eprintln!("unknown argument '{}'", other);
                return None;
            }
        }
    }

    if args.scene.as_os_str().is_empty() {
        eprintln!("a scene file is required (-s)");
        return None;
    }
    if args.width == 0 || args.height == 0 || args.passes == 0 {
        eprintln!("width, height and pass count must be positive");
        return None;
    }
    if args.data_root.as_os_str().is_empty() {
        args.data_root = args
            .scene
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
    }
    Some(args)
}

fn run(args: &Args) -> Result<i32> {
    let loaded = match load_scene(&args.scene, &args.data_root) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{:#}", e);
            return Ok(EXIT_INIT_FAILURE);
        }
    };

    let mut renderer = match Renderers::by_name(&args.renderer) {
        Some(r) => r,
        None => {
            error!("unknown renderer '{}'", args.renderer);
            return Ok(EXIT_INIT_FAILURE);
        }
    };

    let camera = Camera::new(
        loaded.camera.position,
        loaded.camera.look_at,
        loaded.camera.up,
        loaded.camera.fov_y,
        args.width,
        args.height,
    );

    let blue_noise = BlueNoiseTexture::load(&args.data_root);
    let mut viewport = Viewport::new(camera, loaded.params, blue_noise, args.threads);

    info!(
        "rendering {} passes of {} with {}",
        args.passes,
        args.scene.display(),
        args.renderer
    );
    let stop = AtomicBool::new(false);
    viewport.render(&loaded.scene, &mut renderer, args.passes, &stop);

    let passes = viewport.passes_finished();
    if let Err(e) = viewport
        .film()
        .save_png(&args.output, passes)
        .context("failed to save LDR output")
    {
        error!("{:#}", e);
        return Ok(EXIT_RENDER_FAILURE);
    }
    if let Some(hdr_path) = &args.hdr_output {
        if let Err(e) = viewport
            .film()
            .save_pfm(hdr_path, passes)
            .context("failed to save HDR output")
        {
            error!("{:#}", e);
            return Ok(EXIT_RENDER_FAILURE);
        }
    }

    Ok(0)
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Some(args) => args,
        None => {
            usage();
            exit(EXIT_ARGUMENT_ERROR);
        }
    };

    match run(&args) {
        Ok(code) => exit(code),
        Err(e) => {
            error!("{:#}", e);
            exit(EXIT_RENDER_FAILURE);
        }
    }
}
