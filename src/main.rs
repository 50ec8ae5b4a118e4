use claimer::claim_for_all;
use config::Config;

use logger::init_default_logger;

mod api;
mod chain;
mod claimer;
mod config;
mod constants;
mod errors;
mod logger;
mod proxy;
mod retry;
mod utils;
mod wallets;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _guard = init_default_logger();

    let config = Config::read_default().await?;

    claim_for_all(config).await?;

    Ok(())
}
