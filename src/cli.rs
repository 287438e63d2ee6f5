use clap::{Parser, Subcommand};
use std::path::PathBuf;

use camgrab::config::GrabberSettings;

#[derive(Parser, Debug)]
#[command(name = "camgrab")]
#[command(about = "Periodically grab still images from a network camera", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to $CAMGRAB_CONFIG or config/camgrab.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grab images until stopped
    Run(RunArgs),
    /// Grab a single image and exit
    Once(Overrides),
    /// Print the effective settings as TOML
    Config(Overrides),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Stop after this many ticks
    #[arg(long)]
    pub count: Option<u64>,

    /// Log failed ticks and carry on instead of exiting
    #[arg(long)]
    pub keep_going: bool,
}

/// Command-line values that win over the settings file and environment.
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// Camera snapshot URL
    #[arg(long)]
    pub url: Option<String>,

    /// Seconds between ticks
    #[arg(long)]
    pub every: Option<f64>,

    /// Directory images are saved under
    #[arg(long)]
    pub save_dir: Option<String>,

    /// Grab without saving
    #[arg(long)]
    pub no_save: bool,
}

impl Overrides {
    pub fn apply(self, settings: &mut GrabberSettings) {
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(every) = self.every {
            settings.every = every;
        }
        if let Some(save_dir) = self.save_dir {
            settings.save_dir = save_dir;
        }
        if self.no_save {
            settings.save = false;
        }
    }
}
