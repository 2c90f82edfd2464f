//! Cloud field generator - runs the generation pipeline and reports field statistics.
//!
//! Usage: cargo run --release --bin generate_clouds -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       JSON config (default: built-in defaults)
//!   --tex-size <N>        Override the grid resolution along the longest axis
//!   --seed <SEED>         Override the noise seed
//!   --frames <N>          Frames to simulate (default: 1)
//!   --dt <SECONDS>        Frame time (default: 0.016)
//!   --jobs <N>            Worker threads (default: all cores)
//!   --save-config <PATH>  Write the effective config as JSON
//!   --upload              Also upload the fields to a headless GPU device

use std::path::PathBuf;
use std::time::Instant;

use cumulus::generation::{CloudConfig, CloudPipeline};
use cumulus::render::{FieldTextures, GpuContext};

fn main() {
    cumulus::core::logging::init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => match CloudConfig::load(&PathBuf::from(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => CloudConfig::default(),
    };
    if let Some(tex_size) = parse_u32_arg(&args, "--tex-size") {
        config.tex_size = tex_size;
    }
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    let frames = parse_usize_arg(&args, "--frames").unwrap_or(1).max(1);
    let dt = parse_f32_arg(&args, "--dt").unwrap_or(0.016);
    let upload = args.iter().any(|a| a == "--upload");

    if let Some(jobs) = parse_usize_arg(&args, "--jobs") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("Failed to configure thread pool");
    }

    if let Some(path) = parse_str_arg(&args, "--save-config") {
        if let Err(e) = config.save(&PathBuf::from(&path)) {
            eprintln!("Failed to save {}: {}", path, e);
            std::process::exit(1);
        }
        println!("Config written to {}", path);
    }

    println!("=== Cumulus Cloud Generator ===");
    match config.grid_dims() {
        Ok(dims) => println!("Grid:    {} ({} cells)", dims, dims.cell_count()),
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            std::process::exit(1);
        }
    }
    println!("Layers:  {}", config.layers.len());
    println!("Detail:  {}", config.detail_size().map_or("off".to_string(), |s| format!("{}^3", s)));
    println!("Seed:    {}", config.seed);
    println!("Frames:  {} (dt {}s)", frames, dt);
    println!();

    let mut pipeline = match CloudPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    for frame in 0..frames {
        // manual mode still needs one request per frame to produce output
        match pipeline.update(dt, true) {
            Ok(Some(report)) => log::debug!(
                "frame {}: {} in {:.1}ms (published: {})",
                frame,
                report.trigger.name(),
                report.elapsed.as_secs_f64() * 1000.0,
                report.published
            ),
            Ok(None) => {}
            Err(e) => {
                eprintln!("Generation failed on frame {}: {}", frame, e);
                std::process::exit(1);
            }
        }
    }
    let elapsed = start.elapsed();

    let stats = pipeline.stats();
    println!("=== Results ===");
    println!("Cycles:  {} published, {} stale", stats.cycles_published, stats.cycles_stale);
    println!("Cells:   {} written, {} skipped by dispatch", stats.cells_written, stats.cells_skipped);
    println!("Time:    {:.2}s ({:.1}ms/frame)", elapsed.as_secs_f64(), elapsed.as_secs_f64() * 1000.0 / frames as f64);

    let Some(fields) = pipeline.fields() else {
        println!("No fields published");
        return;
    };
    let (dmin, dmax) = fields.density.density_range();
    let (lmin, lmax) = fields.density.light_range();
    println!("Density: [{:.4}, {:.4}]", dmin, dmax);
    println!("Light:   [{:.4}, {:.4}]", lmin, lmax);
    if let Some(detail) = &fields.detail {
        let mean = detail.texels().iter().map(|&t| t as f64).sum::<f64>() / detail.texels().len() as f64;
        println!("Detail:  mean texel {:.1}", mean);
    }
    let offset = pipeline.animation().offset();
    println!("Offset:  ({:.2}, {:.2}, {:.2})", offset.x, offset.y, offset.z);

    if upload {
        match GpuContext::new_headless_blocking() {
            Ok(ctx) => {
                let textures = FieldTextures::for_fields(&ctx.device, fields);
                if let Err(e) = textures.upload(&ctx.queue, fields) {
                    eprintln!("Upload failed: {}", e);
                    std::process::exit(1);
                }
                textures.upload_dither(&ctx.queue, pipeline.dither());
                textures.upload_material(&ctx.queue, &pipeline.material_params());
                ctx.queue.submit([]);
                println!("Uploaded fields to {}", ctx.adapter.get_info().name);
            }
            Err(e) => log::warn!("Skipping GPU upload: {}", e),
        }
    }
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
