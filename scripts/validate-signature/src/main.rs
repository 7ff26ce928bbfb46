//! Calls `validateSignature` on a deployed validator and prints what it
//! returned.
//!
//! Reads its configuration from the environment, or from a `.env` file in
//! the working directory. `OWNER_PRIVATE_KEY` and `VALIDATOR_ADDRESS` are
//! required; the network is looked up by `NETWORK` in `networks.toml`.
use eyre::WrapErr;
use passkey_deploy::{environment::InvokeConfig, invoke};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config =
        InvokeConfig::from_env().wrap_err("failed to load configuration")?;
    let invocation = invoke::run(&config)
        .await
        .wrap_err("failed to call validateSignature")?;

    println!("{invocation}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}
