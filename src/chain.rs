use std::{marker::PhantomData, sync::Arc, time::Duration};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
    transports::Transport,
};
use async_trait::async_trait;

use JagerAirdrop::claimCall;
use IERC20::transferCall;

use crate::constants::{BSC_EXPLORER_URL, CLAIM_CONTRACT_ADDRESS, TOKEN_CONTRACT_ADDRESS};

sol! {
    #[sol(rpc)]
    contract JagerAirdrop {
        function claim(address account, uint256 amount, uint256 deadline, bytes calldata sign, bool instant, address invitor) external;
        mapping(address account => uint256 amount) public claimUser;
    }

    #[sol(rpc)]
    #[derive(Debug, PartialEq, Eq)]
    contract IERC20 {
        mapping(address account => uint256) public balanceOf;

        function transfer(address to, uint256 amount) external returns (bool);
    }
}

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Arguments of the claim contract's `claim` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub account: Address,
    pub amount: U256,
    pub deadline: U256,
    pub sign: Bytes,
    pub instant: bool,
    pub invitor: Address,
}

/// On-chain operations the executors need, bound to one wallet.
#[async_trait]
pub trait AirdropChain: Send + Sync {
    async fn claimed_amount(&self, account: Address) -> eyre::Result<U256>;

    async fn token_balance(&self, account: Address) -> eyre::Result<U256>;

    async fn send_claim(&self, request: &ClaimRequest) -> eyre::Result<TxHash>;

    async fn send_transfer(&self, to: Address, amount: U256) -> eyre::Result<TxHash>;

    /// Resolves once `tx_hash` has `confirmations` confirmations and did not revert.
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> eyre::Result<()>;
}

pub async fn send_transaction<P, T, W>(
    provider: &P,
    wallet: &W,
    chain_id: u64,
    to: Address,
    input: Option<Bytes>,
    value: U256,
) -> eyre::Result<TxHash>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
    W: NetworkWallet<Ethereum>,
{
    let gas_price = provider.get_gas_price().await?;
    let from = wallet.default_signer_address();

    let nonce = provider.get_transaction_count(from).await?;

    let mut tx_request = TransactionRequest::default()
        .with_gas_price(gas_price)
        .with_to(to)
        .with_value(value)
        .with_nonce(nonce)
        .with_chain_id(chain_id)
        .with_from(from);

    if let Some(data) = input {
        tx_request.set_input(data);
    }

    let gas_limit = provider.estimate_gas(&tx_request).await?;
    tx_request.set_gas_limit(gas_limit);

    let signed_transaction = tx_request.build(wallet).await?;
    let pending_tx = provider.send_tx_envelope(signed_transaction).await?;
    let tx_hash = *pending_tx.tx_hash();

    tracing::info!("[{from}] Transaction sent: {BSC_EXPLORER_URL}/tx/{tx_hash}");

    Ok(tx_hash)
}

/// [`AirdropChain`] backed by an RPC provider and a local wallet.
pub struct EvmChain<P, T> {
    provider: Arc<P>,
    wallet: EthereumWallet,
    chain_id: u64,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> EvmChain<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: Arc<P>, wallet: EthereumWallet, chain_id: u64) -> Self {
        Self {
            provider,
            wallet,
            chain_id,
            _transport: PhantomData,
        }
    }

    async fn poll_receipt(&self, tx_hash: TxHash, confirmations: u64, url: &str) -> eyre::Result<()> {
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                if !receipt.status() {
                    eyre::bail!("Transaction reverted: {url}");
                }

                let included_at = receipt.block_number.unwrap_or_default();
                let head = self.provider.get_block_number().await?;
                if head + 1 >= included_at + confirmations {
                    return Ok(());
                }
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl<P, T> AirdropChain for EvmChain<P, T>
where
    P: Provider<T, Ethereum> + Send + Sync,
    T: Transport + Clone,
{
    async fn claimed_amount(&self, account: Address) -> eyre::Result<U256> {
        let contract = JagerAirdrop::new(CLAIM_CONTRACT_ADDRESS, self.provider.clone());
        Ok(contract.claimUser(account).call().await?.amount)
    }

    async fn token_balance(&self, account: Address) -> eyre::Result<U256> {
        let contract = IERC20::new(TOKEN_CONTRACT_ADDRESS, self.provider.clone());
        Ok(contract.balanceOf(account).call().await?._0)
    }

    async fn send_claim(&self, request: &ClaimRequest) -> eyre::Result<TxHash> {
        let input = claimCall {
            account: request.account,
            amount: request.amount,
            deadline: request.deadline,
            sign: request.sign.clone(),
            instant: request.instant,
            invitor: request.invitor,
        }
        .abi_encode();

        send_transaction(
            self.provider.as_ref(),
            &self.wallet,
            self.chain_id,
            CLAIM_CONTRACT_ADDRESS,
            Some(input.into()),
            U256::ZERO,
        )
        .await
    }

    async fn send_transfer(&self, to: Address, amount: U256) -> eyre::Result<TxHash> {
        let input = transferCall { to, amount }.abi_encode();

        send_transaction(
            self.provider.as_ref(),
            &self.wallet,
            self.chain_id,
            TOKEN_CONTRACT_ADDRESS,
            Some(input.into()),
            U256::ZERO,
        )
        .await
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
        timeout: Duration,
    ) -> eyre::Result<()> {
        let url = format!("{BSC_EXPLORER_URL}/tx/{tx_hash}");

        tokio::time::timeout(timeout, self.poll_receipt(tx_hash, confirmations, &url))
            .await
            .map_err(|_| eyre::eyre!("Transaction not confirmed within {timeout:?}: {url}"))??;

        tracing::info!("Transaction confirmed: {url}");

        Ok(())
    }
}
