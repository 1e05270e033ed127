use clap::{Parser, Subcommand};
use matopt_cli::commands::{cmd_analyze, cmd_calibrate, cmd_collect, cmd_scan};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "matopt")]
#[command(version, about = "Material script analyzer and calibrated texture builder", long_about = None)]
struct Cli {
    /// Print progress details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (overrides the matopt.yml lookup)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse material scripts into the materials database
    Scan {
        /// Directory to scan (defaults to the configured materials base)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Material script extension (without the dot)
        #[arg(long, value_name = "EXT")]
        extension: Option<String>,
    },

    /// Collect texture files into the textures database
    Collect {
        /// Directory to walk (defaults to the configured textures base)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Cross-check materials against textures and report findings
    Analyze {
        /// Only print materials with hard errors
        #[arg(long)]
        errors_only: bool,

        /// Only print optimization candidates
        #[arg(long)]
        candidates_only: bool,
    },

    /// Build a calibrated texture pack from an image
    Calibrate {
        /// Source image (PNG or TIFF)
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Calibration curve file (YAML [input, output] luminance pairs)
        #[arg(long, value_name = "FILE")]
        curve: PathBuf,

        /// ISO speed the shot was taken at
        #[arg(long, value_name = "FLOAT", default_value = "100.0")]
        iso: f32,

        /// Shutter speed in seconds
        #[arg(long, value_name = "FLOAT", default_value = "0.01")]
        shutter: f32,

        /// Aperture f-number
        #[arg(long, value_name = "FLOAT", default_value = "8.0")]
        aperture: f32,

        /// Swatch dimensions
        #[arg(long, value_name = "WxH", default_value = "48x32")]
        swatch_size: String,

        /// Custom swatch sampling location in UV space; repeatable
        #[arg(long = "sample", value_name = "U,V")]
        samples: Vec<String>,

        /// Output format (png8, png16 or tiff)
        #[arg(long, value_name = "FORMAT", default_value = "png8")]
        format: String,

        /// Output base path (defaults next to the source image)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.verbose {
        matopt_core::config::set_verbose(true);
    }

    let result = match cli.command {
        Commands::Scan { dir, extension } => cmd_scan(cli.config, dir, extension),

        Commands::Collect { dir } => cmd_collect(cli.config, dir),

        Commands::Analyze {
            errors_only,
            candidates_only,
        } => cmd_analyze(cli.config, errors_only, candidates_only),

        Commands::Calibrate {
            image,
            curve,
            iso,
            shutter,
            aperture,
            swatch_size,
            samples,
            format,
            out,
        } => cmd_calibrate(
            image,
            curve,
            iso,
            shutter,
            aperture,
            swatch_size,
            samples,
            format,
            out,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
