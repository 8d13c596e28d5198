//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use gatehouse::{GatehouseConfig, Principal};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print a validated principal
pub fn print_principal(principal: &Principal) {
    header("Principal");
    println!("  Subject:  {}", principal.subject_id());
    println!("  Username: {}", principal.username());
    println!("  Email:    {}", principal.email());
    println!("  Issued:   {} ms", gatehouse::clock::unix_millis(principal.issued_at()));
    println!("  Expires:  {} ms", gatehouse::clock::unix_millis(principal.expires_at()));
    println!("  TTL:      {:?}", principal.ttl());
}

/// Print a configuration summary without key material
pub fn print_config_summary(config: &GatehouseConfig) {
    header("Configuration");
    println!("  Environment:  {}", config.environment);
    println!("  Active key:   {}", config.keyring.active().key_id());
    let retired: Vec<&str> = config.keyring.key_ids().into_iter().skip(1).collect();
    if !retired.is_empty() {
        println!("  Retired keys: {}", retired.join(", "));
    }
    println!(
        "  Token TTL:    {:?} (min {:?}, max {:?})",
        config.ttl.default_ttl, config.ttl.min_ttl, config.ttl.max_ttl
    );
    println!(
        "  Argon2id:     {} KiB, {} passes, {} lanes",
        config.hash_params.memory_kib, config.hash_params.iterations, config.hash_params.parallelism
    );
    match config.store_timeout {
        Some(timeout) => println!("  Store limit:  {:?}", timeout),
        None => println!("  Store limit:  none"),
    }
}
