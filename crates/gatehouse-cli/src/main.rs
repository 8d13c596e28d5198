//! Gatehouse CLI - operator tool for the authentication core
//!
//! Manages gatehouse.toml, generates signing keys, hashes secrets for
//! seeding a user store, and issues or inspects tokens.

use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand};
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod output;

use config::FileConfig;
use error::{CliError, Result};
use gatehouse::observability::{self, LogFormat, LogWriter, ObservabilityConfig};
use gatehouse::{
    parse_duration, HashParams, Identity, KeyPolicy, SecretHasher, SubjectId, TokenIssuer,
    TokenValidator,
};

/// Gatehouse CLI - credential and session token tool
#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to gatehouse.toml configuration file
    #[arg(short, long, default_value = "gatehouse.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new gatehouse.toml
    Init {
        /// Environment: development, testing, staging, production
        #[arg(short, long, default_value = "development")]
        environment: String,

        /// Write a freshly generated key into the file instead of an env reference
        #[arg(long)]
        with_key: bool,

        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Generate a signing key meeting the environment's key policy
    Keygen {
        /// Environment whose policy the key must satisfy
        #[arg(short, long, default_value = "production")]
        environment: String,

        /// Key id
        #[arg(short, long, default_value = "primary")]
        key_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hash a secret read from stdin into a credential record
    Hash {
        /// Subject id (digits become a numeric id)
        #[arg(long)]
        subject: String,

        /// Username
        #[arg(long)]
        username: String,

        /// Email
        #[arg(long)]
        email: String,
    },

    /// Issue a token
    Issue {
        /// Subject id (digits become a numeric id)
        #[arg(long)]
        subject: String,

        /// Username
        #[arg(long)]
        username: String,

        /// Email
        #[arg(long)]
        email: String,

        /// Lifetime, e.g. "15m" (default: configured default)
        #[arg(long)]
        ttl: Option<String>,
    },

    /// Validate a token and show its principal
    Validate {
        /// Token (read from stdin if omitted)
        token: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check configuration
    Check,
}

/// Logs go to stderr so `--json` output on stdout stays parseable
fn log_config(verbose: bool) -> ObservabilityConfig {
    ObservabilityConfig::builder()
        .log_format(LogFormat::Compact)
        .log_filter(if verbose { "gatehouse=debug,info" } else { "warn" })
        .include_location(false)
        .writer(LogWriter::Stderr)
        .build()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init(log_config(cli.verbose)) {
        output::warning(&e.to_string());
    }

    let result = match cli.command {
        Commands::Init {
            environment,
            with_key,
            force,
        } => cmd_init(&cli.config, &environment, with_key, force),

        Commands::Keygen {
            environment,
            key_id,
            json,
        } => cmd_keygen(&environment, &key_id, json),

        Commands::Hash {
            subject,
            username,
            email,
        } => cmd_hash(&cli.config, &subject, &username, &email),

        Commands::Issue {
            subject,
            username,
            email,
            ttl,
        } => cmd_issue(&cli.config, &subject, &username, &email, ttl.as_deref()),

        Commands::Validate { token, json } => cmd_validate(&cli.config, token, json),

        Commands::Check => cmd_check(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_init(config_path: &Path, environment: &str, with_key: bool, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(CliError::AlreadyExists {
            path: config_path.to_path_buf(),
        });
    }

    let key = with_key.then(|| KeyPolicy::for_environment(environment).generate("primary"));
    let template = config::init_template(environment, key.as_ref().map(|k| k.to_base64()).as_deref());

    std::fs::write(config_path, &template)?;

    output::success(&format!("Created {}", config_path.display()));
    output::info(&format!("Environment: {}", environment));
    if key.is_some() {
        output::warning("The file now contains a signing key; keep it out of version control");
    } else {
        output::info("Set GATEHOUSE_SIGNING_KEY (see 'gatehouse keygen') and run 'gatehouse check'");
    }

    Ok(())
}

fn cmd_keygen(environment: &str, key_id: &str, json: bool) -> Result<()> {
    let policy = KeyPolicy::for_environment(environment);
    let key = policy.generate(key_id);

    if json {
        let out = serde_json::json!({
            "key_id": key.key_id(),
            "key": key.to_base64(),
            "bytes": key.len(),
            "entropy_bits": gatehouse::key_policy::calculate_entropy(key.as_bytes()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", key.to_base64());
        if std::io::stdout().is_terminal() {
            output::info(&format!(
                "{} byte key '{}' for {} ({})",
                key.len(),
                key.key_id(),
                environment,
                policy.context
            ));
        }
    }

    Ok(())
}

fn cmd_hash(config_path: &Path, subject: &str, username: &str, email: &str) -> Result<()> {
    let params = if config_path.exists() {
        FileConfig::from_file(config_path)?.to_gatehouse_config()?.hash_params
    } else {
        HashParams::default()
    };
    let hasher = SecretHasher::new(params)?;

    if std::io::stdin().is_terminal() {
        output::info("Enter secret, then press Enter:");
    }
    let secret = read_stdin_line()?;
    if secret.is_empty() {
        return Err(CliError::missing("secret on stdin"));
    }

    let record = hasher.create_record(SubjectId::parse_loose(subject), username, email, &secret)?;

    let out = serde_json::json!({
        "subject_id": record.subject_id,
        "username": record.username,
        "email": record.email,
        "salt": STANDARD.encode(&record.salt),
        "secret_hash": STANDARD.encode(&record.secret_hash),
        "hash_params": params,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(())
}

fn cmd_issue(
    config_path: &Path,
    subject: &str,
    username: &str,
    email: &str,
    ttl: Option<&str>,
) -> Result<()> {
    let config = FileConfig::from_file(config_path)?.to_gatehouse_config()?;
    let ttl = match ttl {
        Some(raw) => parse_duration(raw)
            .ok_or_else(|| CliError::invalid("--ttl", format!("'{}' is not a duration", raw)))?,
        None => config.ttl.default_ttl,
    };

    let issuer = TokenIssuer::new(Arc::new(config.keyring), config.ttl);
    let identity = Identity::new(SubjectId::parse_loose(subject), username, email);
    let token = issuer.issue(&identity, ttl)?;

    println!("{}", token);
    Ok(())
}

fn cmd_validate(config_path: &Path, token: Option<String>, json: bool) -> Result<()> {
    let config = FileConfig::from_file(config_path)?.to_gatehouse_config()?;
    let token = match token {
        Some(token) => token,
        None => read_stdin_line()?,
    };

    let validator = TokenValidator::new(Arc::new(config.keyring));
    let principal = validator
        .validate(token.trim())
        .map_err(CliError::TokenRejected)?;

    if json {
        let out = serde_json::json!({
            "user": principal.identity(),
            "issued_at": gatehouse::clock::unix_millis(principal.issued_at()),
            "expires_at": gatehouse::clock::unix_millis(principal.expires_at()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        output::success("Token valid");
        output::print_principal(&principal);
    }

    Ok(())
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let config = FileConfig::from_file(config_path)?.to_gatehouse_config()?;

    output::print_config_summary(&config);
    println!();
    output::success(&format!("{} is valid", config_path.display()));

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn read_stdin_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
