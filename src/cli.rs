// ============================================================================
// HALFTONE CLI — headless rendering via command-line arguments
// ============================================================================
//
// Usage examples:
//   halftone --input photo.png --output dots.png
//   halftone -i photo.jpg -o out.png --n 4 --n2 5 --bg-color "#202020"
//   halftone -i "shots/*.jpg" --output-dir processed/
//   halftone -i photo.png -o sat.png --stage sat
//   halftone -i photo.png -o out.png --shader-pass1 my_pass1.wgsl
//
// All processing runs synchronously on the current thread; one processor is
// created up front and reused across the whole batch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::gpu::{HalftoneProcessor, ShaderSources};
use crate::params::{HalftoneParams, RenderStage};
use crate::source::SourceImage;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Halftone headless renderer.
///
/// Convert photographs into size-modulated dot fields — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "halftone",
    about = "GPU halftone effect renderer",
    long_about = "Render the halftone dot effect over image files. The working\n\
                  resolution is the largest power-of-two square fitting the image's\n\
                  shorter side; output is always that square.\n\n\
                  Example:\n  \
                  halftone --input photo.png --output dots.png --n 4 --n2 5\n  \
                  halftone -i \"*.jpg\" --output-dir out/ --stage pass1"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files are written here with
    /// the original stem and a .png extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Pipeline stage to present: source, sat, pass1, final.
    #[arg(long, default_value = "final", value_name = "STAGE")]
    pub stage: String,

    /// Replacement WGSL for the shared vertex stage.
    #[arg(long, value_name = "FILE.wgsl")]
    pub shader_vertex: Option<PathBuf>,

    /// Replacement WGSL for the Pass-1 fragment stage.
    #[arg(long, value_name = "FILE.wgsl")]
    pub shader_pass1: Option<PathBuf>,

    /// Replacement WGSL for the Pass-2 fragment stage.
    #[arg(long, value_name = "FILE.wgsl")]
    pub shader_pass2: Option<PathBuf>,

    // ---- halftone parameters -------------------------------------------
    /// Coarse dot-grid exponent.
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    pub n: i32,

    /// Fine dot-grid exponent.
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    pub n2: i32,

    /// Cross-fade between granularities, 0..=1.
    #[arg(long, default_value_t = 0.3)]
    pub blend: f32,

    /// Secondary dot-center offset, 0..=1.5.
    #[arg(long, default_value_t = 0.3)]
    pub offset2: f32,

    /// Dot radius multiplier.
    #[arg(long, default_value_t = 0.9)]
    pub base_scale: f32,

    /// Gap between dots, percent of cell.
    #[arg(long, default_value_t = 10.0)]
    pub gap_percent: f32,

    /// Dot merge threshold.
    #[arg(long, default_value_t = 1.0)]
    pub threshold: f32,

    /// Edge softening width.
    #[arg(long, default_value_t = 0.1)]
    pub soft: f32,

    /// Edge softening fineness.
    #[arg(long, default_value_t = 1.0)]
    pub soft_fineness: f32,

    /// Contrast, -100..=100.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub contrast: f32,

    /// Apply contrast to luminance only.
    #[arg(long)]
    pub contrast_only_luma: bool,

    /// Background color, hex.
    #[arg(long, default_value = "#111111")]
    pub bg_color: String,

    /// Dot tint color, hex.
    #[arg(long, default_value = "#ffffff")]
    pub mono_color: String,

    /// 0 = tint dots with --mono-color, 1 = full source color.
    #[arg(long, default_value_t = 1.0)]
    pub use_color_blend: f32,

    /// Map brightness to transparency in the final composite.
    #[arg(long)]
    pub luma_to_alpha: bool,

    /// Luma band start for --luma-to-alpha.
    #[arg(long, default_value_t = 0.0)]
    pub luma_edge0: f32,

    /// Luma band end for --luma-to-alpha.
    #[arg(long, default_value_t = 1.0)]
    pub luma_edge1: f32,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn to_params(&self) -> HalftoneParams {
        HalftoneParams {
            n: self.n,
            n2: self.n2,
            blend_value: self.blend,
            offset2: self.offset2,
            base_scale: self.base_scale,
            gap_percent: self.gap_percent,
            threshold: self.threshold,
            soft: self.soft,
            soft_fineness: self.soft_fineness,
            contrast: self.contrast,
            contrast_only_luma: self.contrast_only_luma,
            bg_color: self.bg_color.clone(),
            use_color_blend: self.use_color_blend,
            mono_color: self.mono_color.clone(),
            luma_to_alpha: self.luma_to_alpha,
            luma_to_alpha_edge0: self.luma_edge0,
            luma_to_alpha_edge1: self.luma_edge1,
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let Some(stage) = parse_stage(&args.stage) else {
        eprintln!(
            "error: unknown stage '{}' (expected source, sat, pass1, or final).",
            args.stage
        );
        return ExitCode::FAILURE;
    };

    let sources = match load_shader_sources(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(mut processor) = HalftoneProcessor::create(&sources) else {
        eprintln!("error: could not initialise the GPU pipeline (no usable adapter?).");
        log_err!("processor creation failed");
        return ExitCode::FAILURE;
    };
    if args.verbose {
        println!("adapter: {}", processor.adapter_name());
    }

    let params = args.to_params();
    let mut failures = 0usize;

    for input in &inputs {
        let started = Instant::now();
        let out_path = match output_path_for(input, &args, inputs.len()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{}: {}", input.display(), e);
                failures += 1;
                continue;
            }
        };

        match process_one(&mut processor, input, &out_path, &params, stage) {
            Ok(()) => {
                if args.verbose {
                    println!(
                        "{} -> {} ({} ms)",
                        input.display(),
                        out_path.display(),
                        started.elapsed().as_millis()
                    );
                }
                log_info!("rendered {} -> {}", input.display(), out_path.display());
            }
            Err(e) => {
                eprintln!("{}: {}", input.display(), e);
                log_err!("render failed for {}: {}", input.display(), e);
                failures += 1;
            }
        }
    }

    processor.dispose();

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn process_one(
    processor: &mut HalftoneProcessor,
    input: &Path,
    output: &Path,
    params: &HalftoneParams,
    stage: RenderStage,
) -> Result<(), String> {
    let decoded = image::open(input)
        .map_err(|e| format!("failed to load: {}", e))?
        .to_rgba8();
    let source = SourceImage::new(decoded);

    let result = processor
        .render(&source, params, stage)
        .ok_or_else(|| "render returned no output".to_string())?;

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create {:?}: {}", parent, e))?;
    }

    // JPEG has no alpha channel; flatten before encoding.
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let saved = match ext.as_deref() {
        Some("jpg") | Some("jpeg") => image::DynamicImage::ImageRgba8(result).to_rgb8().save(output),
        _ => result.save(output),
    };
    saved.map_err(|e| format!("failed to save: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

pub fn parse_stage(s: &str) -> Option<RenderStage> {
    match s.to_ascii_lowercase().as_str() {
        "source" => Some(RenderStage::Source),
        "sat" => Some(RenderStage::Sat),
        "pass1" => Some(RenderStage::Pass1),
        "final" => Some(RenderStage::Final),
        _ => None,
    }
}

/// Expand glob patterns / literal paths into concrete files, preserving
/// argument order and dropping duplicates.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        if let Ok(paths) = glob::glob(pattern) {
            for path in paths.flatten() {
                matched = true;
                if path.is_file() && !out.contains(&path) {
                    out.push(path);
                }
            }
        }
        // A literal path with no glob match still counts if it exists.
        if !matched {
            let p = PathBuf::from(pattern);
            if p.is_file() && !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

fn output_path_for(input: &Path, args: &CliArgs, input_count: usize) -> Result<PathBuf, String> {
    if let Some(dir) = &args.output_dir {
        let stem = input
            .file_stem()
            .ok_or_else(|| "input has no file name".to_string())?;
        let mut name = stem.to_os_string();
        name.push(".png");
        return Ok(dir.join(name));
    }
    if let Some(out) = &args.output {
        if input_count == 1 {
            return Ok(out.clone());
        }
    }
    Err("no output destination (use --output or --output-dir)".to_string())
}

fn load_shader_sources(args: &CliArgs) -> Result<ShaderSources, String> {
    let mut sources = ShaderSources::default();
    let load = |path: &Option<PathBuf>, slot: &mut String| -> Result<(), String> {
        if let Some(p) = path {
            *slot = std::fs::read_to_string(p)
                .map_err(|e| format!("failed to read shader {:?}: {}", p, e))?;
        }
        Ok(())
    };
    load(&args.shader_vertex, &mut sources.vertex)?;
    load(&args.shader_pass1, &mut sources.fragment_pass1)?;
    load(&args.shader_pass2, &mut sources.fragment_pass2)?;
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parsing() {
        assert_eq!(parse_stage("final"), Some(RenderStage::Final));
        assert_eq!(parse_stage("SAT"), Some(RenderStage::Sat));
        assert_eq!(parse_stage("pass1"), Some(RenderStage::Pass1));
        assert_eq!(parse_stage("pass3"), None);
    }
}
