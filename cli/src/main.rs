use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tsugihagi::raster::decode_rgba;
use tsugihagi::ShapeGenerator;
use tsugihagi_core::{geometry_label, outline_pad, EdgePlan, TabProfile};

const DEFAULT_SHAPE_SEED: u32 = 0x5EED_CA1E;

#[derive(Parser)]
#[command(name = "tsugihagi", version, about = "Jigsaw shape tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut an image into interlocking piece textures.
    Cut {
        image: PathBuf,
        #[arg(long, default_value_t = 24)]
        pieces: u32,
        #[arg(long)]
        seed: Option<String>,
        #[arg(long, default_value = "pieces")]
        out: PathBuf,
        #[arg(long)]
        max_dim: Option<u32>,
    },
    /// Print the grid and edge plan an image would get.
    Plan {
        image: PathBuf,
        #[arg(long, default_value_t = 24)]
        pieces: u32,
        #[arg(long)]
        seed: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Cut {
            image,
            pieces,
            seed,
            out,
            max_dim,
        } => {
            let seed = resolve_seed(seed.as_deref())?;
            let bytes = fs::read(&image)?;
            let source = decode_rgba(&bytes, max_dim)?;
            let generator = ShapeGenerator::new(seed, TabProfile::default());
            let level = generator.generate(&source, pieces, (0.0, 0.0));
            fs::create_dir_all(&out)?;
            for spec in &level.specs {
                let path = out.join(format!("piece_{:02}_{:02}.png", spec.row, spec.col));
                spec.texture.save(&path)?;
            }
            println!("seed: {seed:#010x}");
            println!("layout: {}", geometry_label(&level.geometry));
            println!(
                "overhang: {} px per side",
                outline_pad(
                    level.geometry.piece_width,
                    level.geometry.piece_height,
                    &TabProfile::default()
                )
            );
            println!("wrote {} textures to {}", level.specs.len(), out.display());
        }
        Commands::Plan {
            image,
            pieces,
            seed,
        } => {
            let seed = resolve_seed(seed.as_deref())?;
            let bytes = fs::read(&image)?;
            let source = decode_rgba(&bytes, None)?;
            let geometry =
                tsugihagi_core::board_geometry(source.width(), source.height(), pieces, (0.0, 0.0));
            let plan = EdgePlan::build(geometry.cols, geometry.rows, seed);
            let (tabs, notches) = polarity_counts(&plan);
            println!("seed: {seed:#010x}");
            println!("layout: {}", geometry_label(&geometry));
            println!("internal boundaries: {} tabs, {} notches", tabs, notches);
        }
    }

    Ok(())
}

fn polarity_counts(plan: &EdgePlan) -> (usize, usize) {
    let values = plan
        .horizontal
        .iter()
        .chain(plan.vertical.iter())
        .flatten();
    let mut tabs = 0;
    let mut notches = 0;
    for value in values {
        match value.signum() {
            1 => tabs += 1,
            -1 => notches += 1,
            _ => {}
        }
    }
    (tabs, notches)
}

fn resolve_seed(raw: Option<&str>) -> Result<u32, Box<dyn std::error::Error>> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_SHAPE_SEED);
    };
    let trimmed = raw.trim();
    let value = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16)?
    } else {
        trimmed.parse::<u32>()?
    };
    Ok(value)
}
