use clap::Parser;
use dotenvy::dotenv;
use rust_image_pipeline::services::credentials::{MasterKeyDecryptor, derive_master_key};
use std::env;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Seal a plaintext secret into an env-ready credential blob"
)]
struct Args {
    /// Plaintext value to seal (e.g. an access key id)
    value: String,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seal_secret=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let master_secret = match env::var("MASTER_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            error!("❌ Missing environment variable: MASTER_SECRET is required.");
            info!("Usage: MASTER_SECRET=... cargo run --bin seal_secret -- <value>");
            std::process::exit(1);
        }
    };

    let key = derive_master_key(&master_secret);
    let blob = MasterKeyDecryptor::seal(args.value.as_bytes(), &key)?;

    info!("🔐 Sealed blob (use as ENCRYPTED_ACCESS_KEY_ID / ENCRYPTED_SECRET_ACCESS_KEY / ENCRYPTED_REGION):");
    println!("{}", blob);

    Ok(())
}
