//! Credential provisioning tool: reads a password on stdin and prints the
//! digest to store in the User Directory.

use anyhow::Context;
use dotenv::dotenv;
use plenimind_auth::auth::{validate_password_strength, CredentialHasher, PasswordPolicy};
use plenimind_auth::{telemetry, Settings};
use std::io::{self, BufRead, Write};
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Settings::new().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging);
    info!("Configuration loaded successfully ({})", config.environment);

    let hasher = CredentialHasher::new(&config.password)?;
    let policy = PasswordPolicy::from(&config.password);

    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(|c| c == '\r' || c == '\n');

    validate_password_strength(password, &policy)?;
    let digest = hasher.hash(password)?;
    info!("Password hashed successfully");

    println!("{}", digest);
    Ok(())
}
