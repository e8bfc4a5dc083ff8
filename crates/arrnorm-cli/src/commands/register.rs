use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use arrnorm_core::consts::DEFAULT_WARP_BAND;
use arrnorm_core::pipeline::{register_reported, RegisterConfig};
use arrnorm_core::raster::{PixelType, Window};

use crate::progress::TerminalReporter;
use crate::summary::{print_register_result, print_register_summary};
use crate::Command;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputTypeArg {
    Int16,
    Int32,
    Uint16,
    Float32,
}

impl From<OutputTypeArg> for PixelType {
    fn from(arg: OutputTypeArg) -> Self {
        match arg {
            OutputTypeArg::Int16 => PixelType::Int16,
            OutputTypeArg::Int32 => PixelType::Int32,
            OutputTypeArg::Uint16 => PixelType::UInt16,
            OutputTypeArg::Float32 => PixelType::Float32,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "register",
    about = "Register an image onto a reference using phase correlation",
    version
)]
pub struct RegisterCli {
    /// Band used to estimate the transform (1-based)
    #[arg(short = 'b', value_name = "WARPBAND", default_value_t = DEFAULT_WARP_BAND)]
    pub warp_band: usize,

    /// Reference sub-window "(x0,y0,cols,rows)"
    #[arg(short = 'd', value_name = "DIMS")]
    pub window: Option<Window>,

    /// Pixel type of the warped image
    #[arg(long, value_enum, default_value = "int16")]
    pub output_type: OutputTypeArg,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Reference image
    #[arg(value_name = "REF")]
    pub reference: PathBuf,

    /// Image to warp onto the reference
    #[arg(value_name = "WARP")]
    pub target: PathBuf,
}

impl RegisterCli {
    fn build_config(&self) -> RegisterConfig {
        RegisterConfig {
            warp_band: self.warp_band,
            window: self.window,
            output_type: self.output_type.into(),
            ..RegisterConfig::new(&self.reference, &self.target)
        }
    }
}

impl Command for RegisterCli {
    fn verbose(&self) -> bool {
        self.verbose
    }

    fn run(&self) -> Result<()> {
        let config = self.build_config();
        let started = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
        print_register_summary(&config, &started);

        let out = register_reported(&config, Arc::new(TerminalReporter::new()))?;
        print_register_result(&out);
        Ok(())
    }
}
