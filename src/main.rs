use clap::{Parser, Subcommand};
use image_ingest::imaging::{
    Dimension, FitMode, Quality, SmoothRadius, TargetCodec, TransformOptions,
};
use image_ingest::upload::Uploader;
use image_ingest::{config, output, signature};
use serde::de::{DeserializeOwned, IntoDeserializer, value};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-ingest")]
#[command(about = "Sniff, transform and store uploaded files")]
#[command(long_about = "\
Sniff, transform and store uploaded files

Uploads are classified by their leading bytes, not by their name. Image
content goes through decode → resize → smooth → quantize → encode; anything
else is stored byte for byte. Either way the file extension must be on the
configured whitelist.

Stored files land in <storage.root>/<storage.upload_dir> and are reported
with their web path relative to <storage.root>.

Logging goes to stderr and is controlled by RUST_LOG (default: info).

Run 'image-ingest gen-config' to generate a documented image-ingest.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./image-ingest.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Per-upload overrides of the configured transform options.
#[derive(clap::Args, Clone)]
struct TransformArgs {
    /// Output codec: original, bmp, gif, jpeg, pbm, png, qoi, tga, tiff, webp
    #[arg(long, value_parser = parse_config_value::<TargetCodec>)]
    codec: Option<TargetCodec>,

    /// Lossy quality, 1-100 (clamped)
    #[arg(long)]
    quality: Option<u32>,

    /// Resize to this width (0 = derive from height); enables resizing
    #[arg(long, value_parser = parse_dimension)]
    width: Option<Dimension>,

    /// Resize to this height (0 = derive from width); enables resizing
    #[arg(long, value_parser = parse_dimension)]
    height: Option<Dimension>,

    /// Fit mode: manual, stretch, contain, cover, pad
    #[arg(long, value_parser = parse_config_value::<FitMode>)]
    fit: Option<FitMode>,

    /// Gaussian smoothing radius, 0-100
    #[arg(long, value_parser = parse_smooth)]
    smooth: Option<SmoothRadius>,
}

impl TransformArgs {
    fn apply(&self, mut options: TransformOptions) -> TransformOptions {
        if let Some(codec) = self.codec {
            options.compress.codec = codec;
        }
        if let Some(q) = self.quality {
            options.compress.quality = Quality::new(q);
        }
        if self.width.is_some() || self.height.is_some() {
            options.resize.enabled = true;
            options.resize.width = self.width.unwrap_or_default();
            options.resize.height = self.height.unwrap_or_default();
        }
        if let Some(fit) = self.fit {
            options.resize.fit = fit;
        }
        if let Some(radius) = self.smooth {
            options.advanced.smooth_radius = radius;
        }
        options
    }
}

#[derive(Subcommand)]
enum Command {
    /// Store a file as if it had been uploaded
    Upload {
        /// File to upload
        file: PathBuf,

        /// File name to present instead of the path's own name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        transform: TransformArgs,

        /// Print the stored artifact as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a file's header classifies
    Sniff {
        /// File to inspect
        file: PathBuf,
    },
    /// Print a stock image-ingest.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Upload {
            file,
            name,
            transform,
            json,
        } => {
            let ingest_config = match &cli.config {
                Some(path) => config::load_config(Some(path.as_path()))?,
                None => config::load_config_from_dir(&std::env::current_dir()?)?,
            };
            init_thread_pool(&ingest_config.processing);

            let bytes = std::fs::read(&file)?;
            let file_name = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let uploader = Uploader::new(ingest_config);
            let options = transform.apply(uploader.config().transform);
            let artifact = uploader.upload_with(
                &bytes,
                &file_name,
                &options,
                &image_ingest::imaging::CancelToken::new(),
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&artifact)?);
            } else {
                output::print_upload_output(&artifact);
            }
        }
        Command::Sniff { file } => {
            let header = signature::read_header(File::open(&file)?);
            output::print_sniff_output(&file, &header);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Structured logs to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Parse a CLI value with the same names the config file uses.
fn parse_config_value<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    let de: value::StrDeserializer<'_, value::Error> = s.into_deserializer();
    T::deserialize(de).map_err(|e| e.to_string())
}

fn parse_smooth(s: &str) -> Result<SmoothRadius, String> {
    let radius: i64 = s.parse().map_err(|e| format!("{e}"))?;
    SmoothRadius::new(radius).map_err(|e| e.to_string())
}

fn parse_dimension(s: &str) -> Result<Dimension, String> {
    let edge: i64 = s.parse().map_err(|e| format!("{e}"))?;
    Dimension::new(edge).map_err(|e| e.to_string())
}
