use alloy::primitives::{address, Address};

pub const CLAIM_CONTRACT_ADDRESS: Address = address!("DF6dbd6d4069bF0c9450538238A9643C72E4a6E4");
pub const TOKEN_CONTRACT_ADDRESS: Address = address!("74836cC0E821A6bE18e407E6388E430B689C66e9");
pub const DEFAULT_INVITOR_ADDRESS: Address = address!("a5b61AF6BC5a24991cf54e835Bdd2C0c4f41D816");

pub const TOKEN_SYMBOL: &str = "JAGER";
pub const TOKEN_DECIMALS: u8 = 18;

pub const DEFAULT_RPC_URL: &str = "https://bsc-rpc.publicnode.com";
pub const DEFAULT_API_URL: &str = "https://api.jager.meme";
pub const CLAIM_AIRDROP_PATH: &str = "/api/airdrop/claimAirdrop";
pub const BIND_SOLANA_PATH: &str = "/api/airdrop/bindSolana";
pub const BSC_EXPLORER_URL: &str = "https://bscscan.com";

// FILES
pub const CONFIG_FILE_PATH: &str = "data/config.toml";
pub const WALLETS_FILE_PATH: &str = "data/wallets.txt";
pub const PROXIES_FILE_PATH: &str = "data/proxies.txt";
pub const LOGS_DIR: &str = "logs";

pub const BSC_CHAIN_ID: u64 = 56;
pub const REQUIRED_CONFIRMATIONS: u64 = 1;
