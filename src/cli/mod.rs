//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod run;
pub mod settings;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cli::run::{run_pipeline, RunOptions};
use crate::cli::settings::{SettingError, SettingRegistry};
use crate::core::app::{SessionContext, SessionOverrides};
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_tracing, LogTarget};

#[derive(Parser, Debug)]
#[command(name = "recipecast")]
#[command(version)]
#[command(about = "Stream a random recipe, then illustrate and narrate it")]
#[command(
    long_about = "Recipecast asks a chat endpoint for a random recipe and streams the reply into \
a full-screen terminal view. Once the recipe is complete it can request an illustration \
from the image endpoint and a narration from the audio endpoint.\n\n\
Environment Variables:\n\
  RECIPECAST_BASE_URL   Origin serving /api/chat, /api/images and /api/audio\n\
  RECIPECAST_API_KEY    Bearer token sent with every request\n\
  RECIPECAST_LOG        Log filter directives (with --log)\n\n\
Controls:\n\
  r                     Request a random recipe\n\
  t                     Retry after a failed recipe stream\n\
  i                     Illustrate the recipe\n\
  a                     Narrate the recipe\n\
  o / p                 Open the image / play the narration\n\
  Up/Down               Scroll\n\
  q, Ctrl+C             Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the endpoint origin for this run
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the seed prompt for this run
    #[arg(long, global = true, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Write diagnostics to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive interface (default)
    Chat,
    /// Run recipe, image and narration without a terminal UI
    Run {
        /// Directory receiving recipe.md and the media files
        #[arg(long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
        /// Stop after the recipe text
        #[arg(long)]
        no_image: bool,
        /// Stop after the image
        #[arg(long)]
        no_audio: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value so its default applies again
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let overrides = SessionOverrides {
        base_url: args.base_url.clone(),
        prompt: args.prompt.clone(),
    };

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let target = match args.log.as_deref() {
                Some(path) => LogTarget::File(path),
                None => LogTarget::Disabled,
            };
            init_tracing(target)?;

            let session = SessionContext::from_config(&Config::load()?, &overrides)?;
            let gateway = Arc::new(session.media_gateway());
            run_chat(session, gateway).await
        }
        Commands::Run {
            out,
            no_image,
            no_audio,
        } => {
            let target = match args.log.as_deref() {
                Some(path) => LogTarget::File(path),
                None => LogTarget::Stderr,
            };
            init_tracing(target)?;

            let session = SessionContext::from_config(&Config::load()?, &overrides)?;
            let gateway = Arc::new(session.media_gateway());
            let options = RunOptions {
                out_dir: out,
                image: !no_image,
                audio: !no_audio,
            };
            let mut stdout = std::io::stdout();
            match run_pipeline(session, gateway, &options, &mut stdout).await {
                Ok(report) => {
                    eprintln!("✅ Recipe written to {}", report.recipe.display());
                    for path in [report.image, report.audio].into_iter().flatten() {
                        eprintln!("✅ Media written to {}", path.display());
                    }
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Set { key, value } => {
            let path = Config::get_config_path()?;
            finish_setting(apply_set(&path, &key, &value))
        }
        Commands::Unset { key } => {
            let path = Config::get_config_path()?;
            finish_setting(apply_unset(&path, &key))
        }
        Commands::Config => {
            let path = Config::get_config_path()?;
            let config = Config::load_from_path(&path)?;
            println!("Config file: {}", path.display());
            config.print_all();
            Ok(())
        }
    }
}

fn finish_setting(result: Result<String, Box<dyn Error>>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            match err.downcast_ref::<SettingError>() {
                Some(setting_error) => setting_error.print(),
                None => eprintln!("❌ {err}"),
            }
            std::process::exit(1);
        }
    }
}

/// Validate and persist one `set` invocation. Nothing is written when the
/// key or value is rejected.
pub fn apply_set(path: &Path, key: &str, value: &[String]) -> Result<String, Box<dyn Error>> {
    let registry = SettingRegistry::new();
    let handler = registry.get(key)?;
    Config::mutate_at(path, |config| Ok(handler.set(value, config)?))
}

pub fn apply_unset(path: &Path, key: &str) -> Result<String, Box<dyn Error>> {
    let registry = SettingRegistry::new();
    let handler = registry.get(key)?;
    Config::mutate_at(path, |config| Ok(handler.unset(config)))
}
