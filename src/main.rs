// src/main.rs

//! # Open Badges signer - command line entry point
//!
//! Three subcommands cover the issuer and verifier workflows:
//! - `keygen`: create the issuer keypair for the selected profile
//! - `sign`: issue a badge to a recipient, optionally baking it into the badge SVG
//! - `verify`: check a token or baked SVG, with a local key or the key it points to
//!
//! ## Environment Variables
//! - `OPENBADGES_CONFIG`: settings file (default: `openbadges.toml`)
//! - `OPENBADGES_PROFILE`: profile inside the settings file (default: `ecc`)
//! - `OPENBADGES__*`: overrides for individual settings
//! - `RUST_LOG`: log filter (default: `info`)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info};
use openbadges::models::assertion::Assertion;
use openbadges::utils::serialization::{decode, parse_token};
use openbadges::{
    AssertionBuilder, ConfigProvider, KeyManager, Settings, SvgEmbedder, VerificationService,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "openbadges", version, about = "Sign and verify Open Badges assertions")]
struct Cli {
    /// Settings file holding the issuer profiles
    #[arg(short, long, env = "OPENBADGES_CONFIG", default_value = "openbadges.toml")]
    config: PathBuf,

    /// Profile to use from the settings file
    #[arg(short, long, env = "OPENBADGES_PROFILE", default_value = "ecc")]
    profile: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the issuer keypair (never overwrites an existing key)
    Keygen,

    /// Sign a badge for a recipient
    Sign {
        /// Badge name, as listed in the profile
        #[arg(short, long)]
        badge: String,

        /// Recipient email address
        #[arg(short, long)]
        receptor: String,

        /// Also bake the assertion into the badge image, written here
        #[arg(short = 'o', long)]
        svg_out: Option<PathBuf>,
    },

    /// Verify an assertion for a recipient
    Verify {
        /// Recipient email address the badge should belong to
        #[arg(short, long)]
        receptor: String,

        /// Compact assertion token
        #[arg(short, long, required_unless_present = "svg", conflicts_with = "svg")]
        token: Option<String>,

        /// Baked SVG badge holding the assertion
        #[arg(short, long)]
        svg: Option<PathBuf>,

        /// Trusted public key file; without it the key is downloaded from the assertion
        #[arg(short = 'k', long)]
        public_key: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Command::Keygen => {
            let config = load_profile(&cli.config, &cli.profile)?;
            let issuer = config.get_issuer();
            let keypair = KeyManager::new(config.get_key_paths())
                .generate(&issuer.name, config.get_algorithm_choice())
                .with_context(|| format!("cannot generate a key for `{}`", issuer.name))?;

            info!("private key: {}", keypair.private_key_path.display());
            info!("public key:  {}", keypair.public_key_path.display());
            println!("{}", keypair.public_key_pem);
            Ok(true)
        }

        Command::Sign { badge, receptor, svg_out } => {
            let config = load_profile(&cli.config, &cli.profile)?;
            info!("generating signature for badge `{badge}`");
            let token = AssertionBuilder::default()
                .issue(&config, &badge, &receptor)
                .with_context(|| format!("cannot sign badge `{badge}`"))?;

            if let Some(output) = svg_out {
                let Some(image) = config.get_badge(&badge)?.local_badge_path.as_deref() else {
                    bail!("badge `{badge}` has no local_badge_path to bake into");
                };
                SvgEmbedder::embed_file(image, &output, token.as_str())
                    .with_context(|| format!("cannot bake assertion into {}", output.display()))?;
                info!("baked badge written to {}", output.display());
            }

            println!("{token}");
            Ok(true)
        }

        Command::Verify { receptor, token, svg, public_key } => {
            let token = match (token, svg) {
                (Some(token), _) => token,
                (None, Some(path)) => SvgEmbedder::extract_file(&path)
                    .with_context(|| format!("cannot read assertion from {}", path.display()))?,
                (None, None) => bail!("either --token or --svg is required"),
            };

            let service = VerificationService::default();
            let valid = match public_key {
                Some(path) => {
                    let signature_ok = service.verify_with_key_file(&token, &path)?;
                    let assertion: Assertion = decode(parse_token(&token)?.payload)?;
                    signature_ok && assertion.is_issued_to(&receptor)?
                }
                None => service.verify_inverse(&token, &receptor)?,
            };

            if valid {
                println!("The assertion is valid and was issued to {receptor}");
            } else {
                println!("The assertion is NOT valid for {receptor}");
            }
            Ok(valid)
        }
    }
}

fn load_profile(path: &std::path::Path, profile: &str) -> anyhow::Result<openbadges::StaticConfig> {
    let settings = Settings::load(path).with_context(|| format!("cannot load settings from {}", path.display()))?;
    Ok(settings.profile(profile)?)
}
