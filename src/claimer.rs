use std::{marker::PhantomData, sync::Arc, time::Duration};

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{
        utils::{format_units, parse_units, ParseUnits},
        Address, TxHash, U256,
    },
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::client::ClientBuilder,
    transports::{http::Http, layers::RetryBackoffLayer, Transport},
};
use alloy_chains::NamedChain;
use async_trait::async_trait;
use ed25519_dalek::SigningKey;

use crate::{
    api::{Allocation, ApiClient},
    chain::{AirdropChain, ClaimRequest, EvmChain},
    config::Config,
    constants::{BSC_CHAIN_ID, REQUIRED_CONFIRMATIONS, TOKEN_DECIMALS, TOKEN_SYMBOL},
    retry::{retry_with_backoff, RetryPolicy},
    utils::random_duration,
    wallets::{read_wallets, WalletRecord},
};

#[derive(Clone, Debug)]
pub struct ClaimSettings {
    pub instant: bool,
    pub invitor: Address,
    pub retry: RetryPolicy,
    pub confirmation_timeout: Duration,
}

impl ClaimSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            instant: config.instant_claim,
            invitor: config.invitor_address,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: config.retry_delay(),
            },
            confirmation_timeout: config.confirmation_timeout(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    AlreadyClaimed,
    Claimed(TxHash),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawOutcome {
    NothingToWithdraw,
    Withdrawn { tx_hash: TxHash, amount: U256 },
}

/// Converts the backend's decimal amount to token units, refusing anything that would not
/// survive the conversion exactly.
pub fn claim_amount(amount: &str) -> eyre::Result<U256> {
    let fraction_digits = amount.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    if fraction_digits > TOKEN_DECIMALS as usize {
        eyre::bail!(
            "Allocation amount {amount} has more than {TOKEN_DECIMALS} fractional digits"
        );
    }

    match parse_units(amount, TOKEN_DECIMALS)? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => eyre::bail!("Allocation amount {amount} is negative"),
    }
}

pub async fn claim<C>(
    chain: &C,
    account: Address,
    allocation: &Allocation,
    settings: &ClaimSettings,
) -> eyre::Result<ClaimOutcome>
where
    C: AirdropChain + ?Sized,
{
    let claimed_amount = chain.claimed_amount(account).await?;
    if claimed_amount > U256::ZERO {
        tracing::info!("[{account}] Already claimed!");
        return Ok(ClaimOutcome::AlreadyClaimed);
    }

    let request = &ClaimRequest {
        account: allocation.address,
        amount: claim_amount(&allocation.amount)?,
        deadline: U256::from(allocation.deadline),
        sign: allocation.sign.clone(),
        instant: settings.instant,
        invitor: settings.invitor,
    };

    let tx_hash = retry_with_backoff(
        &settings.retry,
        &format!("[{account}] Claim"),
        move || chain.send_claim(request),
        move |tx_hash| async move {
            chain
                .wait_for_confirmation(tx_hash, REQUIRED_CONFIRMATIONS, settings.confirmation_timeout)
                .await
                .map(|()| tx_hash)
        },
    )
    .await?;

    tracing::info!(
        "[{account}] Allocation of {} {TOKEN_SYMBOL} claimed successfully!",
        allocation.amount
    );

    Ok(ClaimOutcome::Claimed(tx_hash))
}

pub async fn withdraw<C>(
    chain: &C,
    account: Address,
    to: Address,
    settings: &ClaimSettings,
) -> eyre::Result<WithdrawOutcome>
where
    C: AirdropChain + ?Sized,
{
    let balance = chain.token_balance(account).await?;
    if balance == U256::ZERO {
        tracing::info!("[{account}] Nothing to withdraw!");
        return Ok(WithdrawOutcome::NothingToWithdraw);
    }

    tracing::info!("[{account}] Withdraw to {to}");

    let tx_hash = retry_with_backoff(
        &settings.retry,
        &format!("[{account}] Withdraw"),
        move || chain.send_transfer(to, balance),
        move |tx_hash| async move {
            chain
                .wait_for_confirmation(tx_hash, REQUIRED_CONFIRMATIONS, settings.confirmation_timeout)
                .await
                .map(|()| tx_hash)
        },
    )
    .await?;

    tracing::info!(
        "[{account}] Withdrawn {} {TOKEN_SYMBOL} to {to} successfully!",
        format_units(balance, TOKEN_DECIMALS)?
    );

    Ok(WithdrawOutcome::Withdrawn {
        tx_hash,
        amount: balance,
    })
}

/// The per-wallet steps of a run, in the order the orchestrator drives them.
#[async_trait]
pub trait AirdropSteps: Send + Sync {
    async fn fetch_allocation(&self, wallet: &WalletRecord) -> eyre::Result<Allocation>;

    /// Returns the bound Solana address.
    async fn bind_secondary(&self, wallet: &WalletRecord, keypair: &SigningKey)
        -> eyre::Result<String>;

    async fn claim(
        &self,
        wallet: &WalletRecord,
        allocation: &Allocation,
    ) -> eyre::Result<ClaimOutcome>;

    async fn withdraw(&self, wallet: &WalletRecord, to: Address) -> eyre::Result<WithdrawOutcome>;
}

/// Talks to the real backend and chain.
pub struct LiveAirdrop<P, T> {
    api: ApiClient,
    provider: Arc<P>,
    chain_id: u64,
    settings: ClaimSettings,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> LiveAirdrop<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(api: ApiClient, provider: Arc<P>, chain_id: u64, settings: ClaimSettings) -> Self {
        Self {
            api,
            provider,
            chain_id,
            settings,
            _transport: PhantomData,
        }
    }

    fn chain_for(&self, wallet: &WalletRecord) -> EvmChain<P, T> {
        EvmChain::new(
            self.provider.clone(),
            EthereumWallet::from(wallet.signer.clone()),
            self.chain_id,
        )
    }
}

#[async_trait]
impl<P, T> AirdropSteps for LiveAirdrop<P, T>
where
    P: Provider<T, Ethereum> + Send + Sync,
    T: Transport + Clone,
{
    async fn fetch_allocation(&self, wallet: &WalletRecord) -> eyre::Result<Allocation> {
        Ok(self
            .api
            .get_allocation(&wallet.signer, wallet.proxy.as_ref())
            .await?)
    }

    async fn bind_secondary(
        &self,
        wallet: &WalletRecord,
        keypair: &SigningKey,
    ) -> eyre::Result<String> {
        Ok(self
            .api
            .bind_solana(&wallet.signer, keypair, wallet.proxy.as_ref())
            .await?)
    }

    async fn claim(
        &self,
        wallet: &WalletRecord,
        allocation: &Allocation,
    ) -> eyre::Result<ClaimOutcome> {
        let chain = self.chain_for(wallet);
        claim(&chain, wallet.address(), allocation, &self.settings).await
    }

    async fn withdraw(&self, wallet: &WalletRecord, to: Address) -> eyre::Result<WithdrawOutcome> {
        let chain = self.chain_for(wallet);
        withdraw(&chain, wallet.address(), to, &self.settings).await
    }
}

/// `FetchAllocation -> (BindSecondary)? -> Claim -> (Withdraw)?` for one wallet.
pub async fn process_wallet<S>(steps: &S, wallet: &WalletRecord) -> eyre::Result<()>
where
    S: AirdropSteps + ?Sized,
{
    let address = wallet.address();

    let allocation = steps.fetch_allocation(wallet).await?;
    tracing::info!(
        "[{address}] Allocation of {} {TOKEN_SYMBOL} loaded!",
        allocation.amount
    );

    if let Some(keypair) = &wallet.secondary {
        let solana_address = steps.bind_secondary(wallet, keypair).await?;
        tracing::info!("[{address}] Solana address {solana_address} successfully bound");
    }

    steps.claim(wallet, &allocation).await?;

    if let Some(to) = wallet.withdraw_address {
        steps.withdraw(wallet, to).await?;
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives wallets one at a time with a random pause in between.
#[derive(Clone, Debug)]
pub struct Orchestrator {
    min_delay: Duration,
    max_delay: Duration,
}

impl Orchestrator {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let (min_delay, max_delay) = config.delay_bounds();
        Self::new(min_delay, max_delay)
    }

    /// Processes wallets in order, pausing after each one except the last, failed ones included.
    pub async fn run<S>(&self, steps: &S, wallets: &[WalletRecord]) -> BatchReport
    where
        S: AirdropSteps + ?Sized,
    {
        let mut report = BatchReport::default();

        for (index, wallet) in wallets.iter().enumerate() {
            let address = wallet.address();
            tracing::info!("Processing wallet {}/{}: {address}", index + 1, wallets.len());

            match process_wallet(steps, wallet).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    tracing::error!("[{address}] Wallet processing error: {e:#}");
                    report.failed += 1;
                }
            }

            if index + 1 < wallets.len() {
                let delay = random_duration(self.min_delay, self.max_delay);
                tracing::info!("Sleeping {:.1} sec", delay.as_secs_f32());
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            "All wallets processed! Succeeded: {}, failed: {}",
            report.succeeded,
            report.failed
        );

        report
    }
}

pub async fn claim_for_all(config: Config) -> eyre::Result<BatchReport> {
    let wallets = read_wallets(&config.wallets_file, &config.proxies_file).await?;
    tracing::info!("Loaded {} wallets", wallets.len());

    let retry_layer = RetryBackoffLayer::new(10, 2, 500);
    let client = ClientBuilder::default()
        .layer(retry_layer)
        .transport(Http::new(config.rpc_url.parse()?), false);

    let provider = Arc::new(
        ProviderBuilder::new()
            .with_recommended_fillers()
            .with_chain(NamedChain::BinanceSmartChain)
            .on_provider(RootProvider::new(client)),
    );

    let steps = LiveAirdrop::new(
        ApiClient::new(&config.api_url),
        provider,
        BSC_CHAIN_ID,
        ClaimSettings::from_config(&config),
    );

    Ok(Orchestrator::from_config(&config).run(&steps, &wallets).await)
}
