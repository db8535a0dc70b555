//! gnc: GenomicChain command-line interface
//!
//! Encryption commands:
//!   encrypt <dataset> -o <package>     - build a multi-tier encrypted package
//!   decrypt <package> --level <n>      - open one tier
//!   grant <package> --level <n> -o ... - issue a 24h access grant
//!   redeem <package> <grant>           - open the tier a grant covers
//!
//! Proof commands:
//!   prove <dataset> <claim> -o <proof> - generate a claim proof
//!   verify <proof> <claim>             - check a proof against a claim (exit 1 if invalid)
//!
//! Passwords are read from GNC_PASSWORD, or prompted for.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use gnc_core::config::GncConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::AccessTier;
use gnc_crypto::password::PasswordPolicy;
use gnc_crypto::{
    analyze_strength, generate_secure_password, AccessGrant, EncryptedPackage, EncryptionManager,
    TierConfig, TokenSecret,
};
use gnc_proofs::{GenerateOptions, ProofClaim, ProofGenerator, ProofRecord, ProofVerifier, VerifyOptions};

const PASSWORD_ENV: &str = "GNC_PASSWORD";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "gnc",
    version,
    about = "GenomicChain tiered encryption and claim proofs"
)]
struct Cli {
    /// Path to gnc.toml configuration file
    #[arg(long, short = 'c', env = "GNC_CONFIG", default_value = "gnc.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error) [default: config logging.level]
    #[arg(long, env = "GNC_LOG")]
    log: Option<String>,

    /// Log format (json, text) [default: config logging.format]
    #[arg(long, env = "GNC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a dataset into a multi-tier package
    Encrypt {
        /// Dataset JSON file
        dataset: PathBuf,
        /// Package output path
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Tiers to build (default: all)
        #[arg(long, value_delimiter = ',')]
        tiers: Option<Vec<u8>>,
        /// JSON object mapping tier number to a replacement view
        #[arg(long)]
        custom_tiers: Option<PathBuf>,
    },

    /// Decrypt one tier of a package
    Decrypt {
        package: PathBuf,
        #[arg(long)]
        level: u8,
    },

    /// Issue a 24h access grant for one tier
    Grant {
        package: PathBuf,
        #[arg(long)]
        level: u8,
        /// Environment variable holding the recipient key (default: self grant)
        #[arg(long)]
        recipient_key_env: Option<String>,
        /// Grant output path
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Open the tier an access grant covers
    Redeem {
        package: PathBuf,
        grant: PathBuf,
        /// Environment variable holding the recipient key
        #[arg(long)]
        recipient_key_env: Option<String>,
    },

    /// Generate a proof for a claim over a dataset
    Prove {
        dataset: PathBuf,
        /// Claim JSON file, tagged by "kind"
        claim: PathBuf,
        /// Proof output path
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Verify a proof against a claim
    Verify {
        proof: PathBuf,
        claim: PathBuf,
        /// Enforce maximum age and the entropy floor
        #[arg(long)]
        strict: bool,
        /// Maximum proof age in seconds
        #[arg(long)]
        max_age: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Password policy helpers
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Subcommand, Debug)]
enum PasswordAction {
    /// Check a password against the configured policy and rate its strength
    Check,
    /// Print a random password
    Generate {
        #[arg(long, default_value_t = 16)]
        length: usize,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let (level, format) = logging_settings(&cli, &config);
    init_logging(&level, &format);
    if !cli.config.exists() {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }
    config.validate()?;

    let result = match cli.command {
        Commands::Encrypt {
            dataset,
            output,
            tiers,
            custom_tiers,
        } => cmd_encrypt(&config, &dataset, &output, tiers, custom_tiers.as_deref()),
        Commands::Decrypt { package, level } => cmd_decrypt(&config, &package, level),
        Commands::Grant {
            package,
            level,
            recipient_key_env,
            output,
        } => cmd_grant(&config, &package, level, recipient_key_env.as_deref(), &output),
        Commands::Redeem {
            package,
            grant,
            recipient_key_env,
        } => cmd_redeem(&config, &package, &grant, recipient_key_env.as_deref()),
        Commands::Prove {
            dataset,
            claim,
            output,
        } => cmd_prove(&config, &dataset, &claim, &output),
        Commands::Verify {
            proof,
            claim,
            strict,
            max_age,
        } => return cmd_verify(&config, &proof, &claim, strict, max_age),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
        Commands::Password {
            action: PasswordAction::Check,
        } => cmd_password_check(&config),
        Commands::Password {
            action: PasswordAction::Generate { length },
        } => {
            println!("{}", generate_secure_password(length));
            Ok(())
        }
    };
    result.map(|()| ExitCode::SUCCESS)
}

fn load_config(path: &Path) -> Result<GncConfig> {
    GncConfig::load(path).with_context(|| format!("loading config {}", path.display()))
}

/// Flags and env vars win; otherwise the `[logging]` section applies.
fn logging_settings(cli: &Cli, config: &GncConfig) -> (String, LogFormat) {
    let level = cli
        .log
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        LogFormat::from_str(&config.logging.format, true).unwrap_or(LogFormat::Text)
    });
    (level, format)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries JSON results.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn read_password(prompt: &str) -> Result<SecretString> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }
    let password = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(password))
}

fn read_env_secret(var: &str) -> Result<SecretString> {
    let value = std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    Ok(SecretString::from(value))
}

fn tier_config(tiers: Option<Vec<u8>>, custom_tiers: Option<&Path>) -> Result<TierConfig> {
    let tiers = tiers
        .map(|levels| {
            levels
                .into_iter()
                .map(AccessTier::try_from)
                .collect::<Result<BTreeSet<_>, _>>()
        })
        .transpose()?;
    let custom_tiers: BTreeMap<AccessTier, Value> = match custom_tiers {
        Some(path) => read_json(path)?,
        None => BTreeMap::new(),
    };
    Ok(TierConfig {
        tiers,
        custom_tiers,
    })
}

// ── encryption commands ───────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &GncConfig,
    dataset_path: &Path,
    output: &Path,
    tiers: Option<Vec<u8>>,
    custom_tiers: Option<&Path>,
) -> Result<()> {
    let dataset: GeneticDataset = read_json(dataset_path)?;
    let report = dataset.validate();
    for warning in &report.warnings {
        warn!("{warning}");
    }

    let tier_config = tier_config(tiers, custom_tiers)?;
    let manager = EncryptionManager::new(config.encryption.clone())?;
    let password = read_password("Package password: ")?;
    PasswordPolicy::from(&config.encryption.password_policy).check(password.expose_secret())?;

    let package = manager.encrypt(&dataset, &password, &tier_config)?;
    write_json(output, &package)?;
    info!(
        output = %output.display(),
        tiers = ?package.encrypted_tiers.keys().collect::<Vec<_>>(),
        "package written"
    );

    print_json(&serde_json::json!({
        "output": output.display().to_string(),
        "tiers": package.encrypted_tiers.keys().collect::<Vec<_>>(),
        "checksum": package.checksum,
    }))
}

fn cmd_decrypt(config: &GncConfig, package_path: &Path, level: u8) -> Result<()> {
    let package: EncryptedPackage = read_json(package_path)?;
    let manager = EncryptionManager::new(config.encryption.clone())?;
    let password = read_password("Package password: ")?;
    let tier = manager.decrypt(&package, &password, level)?;
    print_json(&tier)
}

fn cmd_grant(
    config: &GncConfig,
    package_path: &Path,
    level: u8,
    recipient_key_env: Option<&str>,
    output: &Path,
) -> Result<()> {
    let package: EncryptedPackage = read_json(package_path)?;
    let manager = EncryptionManager::new(config.encryption.clone())?;
    let password = read_password("Package password: ")?;
    let recipient = recipient_key_env.map(read_env_secret).transpose()?;

    let grant = manager.generate_access_key(&package, &password, level, recipient.as_ref())?;
    write_json(output, &grant)?;
    print_json(&serde_json::json!({
        "output": output.display().to_string(),
        "accessLevel": grant.access_level,
        "validUntil": grant.valid_until,
        "recipientBound": grant.recipient_bound,
    }))
}

fn cmd_redeem(
    config: &GncConfig,
    package_path: &Path,
    grant_path: &Path,
    recipient_key_env: Option<&str>,
) -> Result<()> {
    let package: EncryptedPackage = read_json(package_path)?;
    let grant: AccessGrant = read_json(grant_path)?;
    let manager = EncryptionManager::new(config.encryption.clone())?;

    let secret = match recipient_key_env {
        Some(var) => read_env_secret(var)?,
        None => read_password("Package password: ")?,
    };
    let token_secret = if recipient_key_env.is_some() {
        TokenSecret::RecipientKey(&secret)
    } else {
        TokenSecret::Password(&secret)
    };

    let tier = manager.redeem_access_token(&package, &grant, token_secret)?;
    print_json(&tier)
}

// ── proof commands ────────────────────────────────────────────────────────────

fn cmd_prove(config: &GncConfig, dataset_path: &Path, claim_path: &Path, output: &Path) -> Result<()> {
    let dataset: GeneticDataset = read_json(dataset_path)?;
    let claim: ProofClaim = read_json(claim_path)?;

    let generator = ProofGenerator::new(config.proofs.clone());
    let record = generator.generate(&dataset, &claim, &GenerateOptions::default())?;
    write_json(output, &record)?;
    info!(claim = %claim.summary(), output = %output.display(), "proof written");

    print_json(&serde_json::json!({
        "output": output.display().to_string(),
        "proofKind": record.proof_kind,
        "commitmentHash": hex::encode(&record.commitment_hash),
        "claimSummary": record.metadata.claim_summary,
    }))
}

fn cmd_verify(
    config: &GncConfig,
    proof_path: &Path,
    claim_path: &Path,
    strict: bool,
    max_age: Option<u64>,
) -> Result<ExitCode> {
    let record: ProofRecord = read_json(proof_path)?;
    let claim: ProofClaim = read_json(claim_path)?;

    let verifier = ProofVerifier::new(config.proofs.clone());
    let opts = VerifyOptions {
        strict,
        max_age_secs: max_age,
        ..Default::default()
    };
    let verification = verifier.verify(&record, &claim, &opts)?;
    print_json(&verification)?;

    Ok(if verification.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ── config / password ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &GncConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn cmd_password_check(config: &GncConfig) -> Result<()> {
    let password = read_password("Password to check: ")?;
    let policy = PasswordPolicy::from(&config.encryption.password_policy);
    let violations = policy.violations(password.expose_secret());
    print_json(&serde_json::json!({
        "valid": violations.is_empty(),
        "violations": violations,
        "strength": analyze_strength(password.expose_secret()),
    }))
}
