use std::{fmt, str::FromStr};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use ed25519_dalek::{SigningKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};

use crate::{
    errors::ConfigError,
    proxy::ProxyEndpoint,
    utils::{meaningful_lines, read_file_lines, read_optional_file_lines},
};

pub struct WalletRecord {
    pub signer: PrivateKeySigner,
    pub withdraw_address: Option<Address>,
    /// Solana keypair bound to this wallet before claiming.
    pub secondary: Option<SigningKey>,
    pub proxy: Option<ProxyEndpoint>,
}

impl WalletRecord {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address())
            .field("withdraw_address", &self.withdraw_address)
            .field("has_secondary", &self.secondary.is_some())
            .field("proxy", &self.proxy)
            .finish()
    }
}

pub async fn read_wallets(
    wallets_path: &str,
    proxies_path: &str,
) -> Result<Vec<WalletRecord>, ConfigError> {
    let wallets = read_file_lines(wallets_path)
        .await
        .map_err(|source| ConfigError::Io {
            path: wallets_path.to_string(),
            source,
        })?;
    let proxies = read_optional_file_lines(proxies_path).await?;

    load_wallets(&wallets, &proxies)
}

/// Builds wallet records from the raw wallet and proxy lines, pairing proxies by position.
pub fn load_wallets<S: AsRef<str>>(
    wallet_lines: &[S],
    proxy_lines: &[S],
) -> Result<Vec<WalletRecord>, ConfigError> {
    let wallet_lines = meaningful_lines(wallet_lines);
    let proxy_lines = meaningful_lines(proxy_lines);

    if !proxy_lines.is_empty() && proxy_lines.len() < wallet_lines.len() {
        tracing::warn!(
            "Only {} proxies for {} wallets, the remaining wallets will run without a proxy",
            proxy_lines.len(),
            wallet_lines.len()
        );
    }

    wallet_lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let proxy = match proxy_lines.get(index) {
                Some(raw) => ProxyEndpoint::parse(raw)?,
                None => None,
            };
            parse_wallet_line(line, index + 1, proxy)
        })
        .collect()
}

fn parse_wallet_line(
    line: &str,
    line_number: usize,
    proxy: Option<ProxyEndpoint>,
) -> Result<WalletRecord, ConfigError> {
    let mut fields = line.split(':').map(str::trim);

    let signer = fields
        .next()
        .and_then(|pk| PrivateKeySigner::from_str(pk).ok())
        .ok_or(ConfigError::InvalidPrivateKey { line: line_number })?;

    let withdraw_address = fields.next().and_then(parse_withdraw_address);
    if withdraw_address.is_none() {
        tracing::debug!("[{}] No valid withdraw address, withdraw disabled", signer.address());
    }

    let secondary = fields
        .next()
        .filter(|key| !key.is_empty())
        .map(|key| parse_solana_keypair(key, line_number))
        .transpose()?;

    Ok(WalletRecord {
        signer,
        withdraw_address,
        secondary,
        proxy,
    })
}

/// Accepts 20-byte hex addresses; mixed case must carry a valid EIP-55 checksum.
pub fn parse_withdraw_address(raw: &str) -> Option<Address> {
    let address = Address::from_str(raw).ok()?;

    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None) != format!("0x{digits}") {
        return None;
    }

    Some(address)
}

/// Base58 keypair (64 bytes, as exported by Solana wallets) or bare 32-byte secret.
fn parse_solana_keypair(raw: &str, line: usize) -> Result<SigningKey, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidSecondaryKey { line, reason };

    let bytes = bs58::decode(raw)
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;

    match bytes.len() {
        KEYPAIR_LENGTH => {
            let keypair: [u8; KEYPAIR_LENGTH] = bytes
                .try_into()
                .map_err(|_| invalid("unexpected key length".to_string()))?;
            SigningKey::from_keypair_bytes(&keypair).map_err(|e| invalid(e.to_string()))
        }
        SECRET_KEY_LENGTH => {
            let secret: [u8; SECRET_KEY_LENGTH] = bytes
                .try_into()
                .map_err(|_| invalid("unexpected key length".to_string()))?;
            Ok(SigningKey::from_bytes(&secret))
        }
        len => Err(invalid(format!("expected 32 or 64 bytes, got {len}"))),
    }
}
