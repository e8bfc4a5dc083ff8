use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};

use arrnorm_core::mask::MaskBackend;
use arrnorm_core::pipeline::{run_configured, NormalizeConfig};

use crate::progress::TerminalReporter;
use crate::summary::print_normalize_summary;
use crate::Command;

/// Options shared by `normalize` and `arrnorm`.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Reference image for iMAD normalization (`-ref` is also accepted)
    #[arg(
        short = 'r',
        long = "ref",
        value_name = "REF",
        required_unless_present_any = ["config", "dump_config"]
    )]
    pub reference: Option<PathBuf>,

    /// Number of iMAD iterations [default: 25]
    #[arg(short = 'i', value_name = "ITERATIONS")]
    pub iterations: Option<u32>,

    /// No-change probability threshold [default: 0.95]
    #[arg(short = 't', value_name = "THRESHOLD")]
    pub threshold: Option<f64>,

    /// Register each image onto the reference before iMAD
    #[arg(long)]
    pub register: bool,

    /// Settings file (TOML); flags given on the command line override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Images to apply the iMAD normalization to
    #[arg(value_name = "IMAGE", required_unless_present_any = ["config", "dump_config"])]
    pub images: Vec<PathBuf>,
}

/// Parse the `-m` option: yes/Yes/YES or no/No/NO.
pub fn parse_mask_option(value: &str) -> std::result::Result<bool, String> {
    match value {
        "yes" | "Yes" | "YES" => Ok(true),
        "no" | "No" | "NO" => Ok(false),
        _ => Err(format!(
            "mask option invalid, should be: \"yes\" or \"no\" (got \"{value}\")"
        )),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "arrnorm",
    about = "Automatic relative radiometric normalization",
    version
)]
pub struct ArrnormCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Create and apply a no-data mask (yes or no) [default: yes]
    #[arg(
        short = 'm',
        value_name = "yes|no",
        action = clap::ArgAction::Set,
        value_parser = parse_mask_option
    )]
    pub mask: Option<bool>,

    /// Build masks with the external raster calculator instead of in-process
    #[arg(long)]
    pub external_mask: bool,
}

#[derive(Parser, Debug)]
#[command(name = "normalize", about = "iMAD normalize", version)]
pub struct NormalizeCli {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CommonArgs {
    /// Settings from `--config` (or the defaults), with every flag given on
    /// the command line layered on top.
    fn build_config(&self) -> Result<NormalizeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => NormalizeConfig::default(),
        };

        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if self.register {
            config.register = true;
        }
        if let Some(reference) = &self.reference {
            config.reference = reference.clone();
        }
        if !self.images.is_empty() {
            config.images = self.images.clone();
        }
        Ok(config)
    }
}

impl ArrnormCli {
    fn build_config(&self) -> Result<NormalizeConfig> {
        let mut config = self.common.build_config()?;
        if let Some(mask) = self.mask {
            config.mask = mask;
        }
        if self.external_mask {
            config.mask_backend = MaskBackend::external_default();
        }
        Ok(config)
    }
}

impl NormalizeCli {
    fn build_config(&self) -> Result<NormalizeConfig> {
        let mut config = self.common.build_config()?;
        config.mask = false;
        Ok(config)
    }
}

fn execute(title: &str, config: &NormalizeConfig, dump_config: bool) -> Result<()> {
    if dump_config {
        print!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }
    if config.images.is_empty() {
        bail!("no images to normalize");
    }

    print_normalize_summary(title, config);
    let results = run_configured(config, Arc::new(TerminalReporter::new()))?;
    println!();
    println!("  {} image(s) normalized", results.len());
    Ok(())
}

impl Command for ArrnormCli {
    fn verbose(&self) -> bool {
        self.common.verbose
    }

    fn run(&self) -> Result<()> {
        let config = self.build_config()?;
        execute(
            "arrnorm - Automatic Relative Radiometric Normalization",
            &config,
            self.common.dump_config,
        )
    }
}

impl Command for NormalizeCli {
    fn verbose(&self) -> bool {
        self.common.verbose
    }

    fn run(&self) -> Result<()> {
        let config = self.build_config()?;
        execute(
            "Automatic relative radiometric normalization",
            &config,
            self.common.dump_config,
        )
    }
}
