//! Command line interface for the Vizzle client.
//!
//! Defines [`Cli`] with its [`Command`] subcommands and the global flags
//! (--base-url, --verbose, --json).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use vizzle::api::{GarmentCategory, GarmentType};

/// Vizzle: virtual clothing try-on from the terminal.
#[derive(Debug, Parser)]
#[command(name = "vizzle", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Backend URL; overrides vizzle.toml and VIZZLE_API_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Enables debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Prints job records as JSON when a command finishes.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

/// Job family accepted by `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    TryOn,
    Layered,
    Video,
}

/// Garment choices shared by `try-on` and `layer`.
#[derive(Debug, Clone, clap::Args)]
pub struct GarmentArgs {
    /// Garment type token (e.g. shirt, t-shirt, jeans, dress, auto_detect).
    #[arg(long, default_value = "auto_detect", value_parser = parse_garment_type)]
    pub garment_type: GarmentType,

    /// Garment category: upper_body, lower_body, dresses or accessories.
    #[arg(long, default_value = "upper_body", value_parser = parse_category)]
    pub category: GarmentCategory,

    /// Diffusion steps passed to the model.
    #[arg(long, default_value_t = 20)]
    pub steps: u32,

    /// Random seed passed to the model.
    #[arg(long, default_value_t = 42)]
    pub seed: i64,

    /// Free-text garment description forwarded with the request.
    #[arg(long)]
    pub description: Option<String>,
}

/// Video parameters shared by `try-on --video` and `video`.
#[derive(Debug, Clone, clap::Args)]
pub struct VideoArgs {
    /// Motion preset.
    #[arg(long, default_value = "subtle_walk")]
    pub motion: String,

    /// Clip length in seconds (2-10).
    #[arg(long, default_value_t = 3)]
    pub duration: u32,

    /// Frames per second (12-30).
    #[arg(long, default_value_t = 24)]
    pub fps: u32,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Checks that the backend is reachable.
    Health,

    /// Asks the backend whether a garment description is allowed.
    Safety {
        /// Garment description to check.
        description: String,
    },

    /// Uploads a photo and a garment and renders the try-on.
    TryOn {
        /// Photo of the person.
        #[arg(long)]
        human: PathBuf,

        /// Photo of the garment.
        #[arg(long)]
        garment: PathBuf,

        #[command(flatten)]
        garment_args: GarmentArgs,

        /// Disables vision-assisted garment detection.
        #[arg(long, default_value_t = false)]
        no_vision: bool,

        /// Also animates the result.
        #[arg(long, default_value_t = false)]
        video: bool,

        #[command(flatten)]
        video_args: VideoArgs,
    },

    /// Adds another garment on top of the latest result.
    Layer {
        /// Photo of the additional garment.
        #[arg(long)]
        garment: PathBuf,

        /// Result image to layer onto; defaults to the saved one.
        #[arg(long)]
        result: Option<String>,

        #[command(flatten)]
        garment_args: GarmentArgs,

        /// Enables vision-assisted garment detection.
        #[arg(long, default_value_t = false)]
        vision: bool,
    },

    /// Animates a result image.
    Video {
        /// Image to animate; defaults to the saved result.
        #[arg(long)]
        image: Option<String>,

        #[command(flatten)]
        video_args: VideoArgs,
    },

    /// Fetches a single status snapshot for a job.
    Status {
        #[arg(value_enum)]
        family: FamilyArg,

        /// Job id returned at submission.
        id: String,
    },

    /// Clears saved results.
    Reset,
}

fn parse_garment_type(s: &str) -> Result<GarmentType, String> {
    s.parse::<GarmentType>().map_err(|e| {
        let known: Vec<&str> = GarmentType::tokens().collect();
        format!("{e} (expected one of: {})", known.join(", "))
    })
}

fn parse_category(s: &str) -> Result<GarmentCategory, String> {
    s.parse()
}
