use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cli::{config_schema, load_config, save_config, snap_directory, TerminalPointPrompt};
use color_eyre::eyre::{eyre, Result};
use dataset::{
    convert_dataset, merge_files, validate_dataset, CocoDataset, ConvertConfig, OutputFormat,
    YoloMode,
};
use mask::{ContourMethod, KeypointPrompt, SimplificationMethod};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Convert color-coded SEM masks into COCO and YOLO annotations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a dataset directory holding `images/` and `masks/`
    Convert(ConvertArgs),
    /// Merge COCO detection files into one, renumbering ids
    Merge {
        /// COCO JSON files, merged in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Check a COCO detection file for id and segment problems
    Check {
        file: PathBuf,
        /// Fail on warnings too
        #[arg(long)]
        strict: bool,
    },
    /// Snap anti-aliased mask colors to 0/128/255
    SnapColors {
        /// Directory of mask images
        input: PathBuf,
        /// Write snapped masks here instead of overwriting
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON schema of the conversion config
    Schema,
    /// Write a default conversion config (.toml or .json)
    InitConfig {
        path: PathBuf,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Dataset directory (overrides the config file)
    dataset_path: Option<PathBuf>,
    /// TOML or JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output formats, comma separated
    #[arg(short, long, value_delimiter = ',')]
    formats: Vec<OutputFormat>,
    /// Keep the background as an annotated category
    #[arg(long)]
    include_background: bool,
    /// Annotate every color as one category
    #[arg(long)]
    one_class: bool,
    /// Ask for one keypoint per sub-mask on the terminal
    #[arg(long)]
    keypoints: bool,
    /// Where keypoint previews are written
    #[arg(long, default_value = "keypoint_previews")]
    preview_dir: PathBuf,
    /// Fraction of images used for training
    #[arg(long)]
    split: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    yolo_mode: Option<YoloMode>,
    #[arg(long)]
    snap_colors: bool,
    #[arg(long)]
    contour_method: Option<ContourMethod>,
    #[arg(long)]
    simplification: Option<SimplificationMethod>,
    #[arg(long)]
    tolerance: Option<f64>,
    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl ConvertArgs {
    /// Config file values, overridden by whatever was given on the command line
    fn into_config(self) -> Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ConvertConfig::default(),
        };

        match self.dataset_path {
            Some(path) => config.dataset_path = path,
            None if self.config.is_none() => {
                return Err(eyre!("Missing dataset path: pass it as an argument or in --config"));
            }
            None => {}
        }

        if !self.formats.is_empty() {
            config.formats = self.formats;
        }
        if self.include_background {
            config.ignore_background = false;
        }
        config.one_class |= self.one_class;
        config.include_keypoints |= self.keypoints;
        config.snap_colors |= self.snap_colors;
        if let Some(split) = self.split {
            config.train_val_split = split;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(mode) = self.yolo_mode {
            config.yolo_mode = mode;
        }
        if let Some(method) = self.contour_method {
            config.contour_method = method;
        }
        if let Some(method) = self.simplification {
            config.simplification = method;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => {
            let preview_dir = args.preview_dir.clone();
            convert(args.into_config()?, &preview_dir)?;
        }
        Commands::Merge { inputs, output } => {
            merge_files(&inputs, &output)?;
            info!("Merged dataset written to {}", output.display());
        }
        Commands::Check { file, strict } => {
            check(&file, strict)?;
        }
        Commands::SnapColors { input, output } => {
            let (files, pixels) = snap_directory(&input, output.as_deref())?;
            println!("Snapped {} pixels in {} masks", pixels, files);
        }
        Commands::Schema => {
            println!("{}", config_schema()?);
        }
        Commands::InitConfig { path } => {
            save_config(&ConvertConfig::default(), &path)?;
            info!("Default config written to {}", path.display());
        }
    }

    Ok(())
}

fn convert(config: ConvertConfig, preview_dir: &Path) -> Result<()> {
    info!("Converting {}", config.dataset_path.display());

    let summary = if config.include_keypoints {
        let stdin = io::stdin();
        let mut prompt = TerminalPointPrompt::new(stdin.lock(), io::stdout(), preview_dir);
        convert_dataset(&config, Some(&mut prompt as &mut dyn KeypointPrompt))?
    } else {
        convert_dataset(&config, None)?
    };

    print!("{}", summary);
    if summary.failed() > 0 {
        warn!("{} images could not be converted", summary.failed());
    }
    Ok(())
}

fn check(file: &Path, strict: bool) -> Result<()> {
    let dataset = CocoDataset::read(file)?;
    let report = validate_dataset(&dataset);
    print!("{}", report);

    let failed = if strict {
        !report.issues.is_empty()
    } else {
        !report.is_ok()
    };
    if failed {
        return Err(eyre!("{} failed validation", file.display()));
    }
    Ok(())
}
