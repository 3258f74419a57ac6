use crate::{
    SdkError, DEFAULT_PROGRAM_ID, DEVNET_RPC_URL, MAINNET_RPC_URL, USDC_DEVNET_MINT,
    USDC_MAINNET_MINT,
};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
}

impl FromStr for Network {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            other => Err(SdkError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Devnet => write!(f, "devnet"),
        }
    }
}

/// A reward token the program accepts for escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedToken {
    pub symbol: String,
    pub mint: Pubkey,
    pub decimals: u8,
}

/// Static network parameters for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub network: Network,
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub supported_tokens: Vec<SupportedToken>,

    /// Wallet allowed to run `initialize`. `None` means nobody may bootstrap the program.
    pub admin: Option<Pubkey>,
}

impl ChainConfig {
    pub fn for_network(network: Network) -> Self {
        let (rpc_url, usdc_mint) = match network {
            Network::Mainnet => (MAINNET_RPC_URL, USDC_MAINNET_MINT),
            Network::Devnet => (DEVNET_RPC_URL, USDC_DEVNET_MINT),
        };

        Self {
            network,
            rpc_url: rpc_url.to_string(),
            program_id: DEFAULT_PROGRAM_ID,
            supported_tokens: vec![SupportedToken {
                symbol: "USDC".to_string(),
                mint: usdc_mint,
                decimals: 6,
            }],
            admin: None,
        }
    }

    pub fn supported_mints(&self) -> Vec<Pubkey> {
        self.supported_tokens.iter().map(|t| t.mint).collect()
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Option<&SupportedToken> {
        self.supported_tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn token_by_mint(&self, mint: &Pubkey) -> Option<&SupportedToken> {
        self.supported_tokens.iter().find(|t| &t.mint == mint)
    }

    pub fn is_admin(&self, wallet: &Pubkey) -> bool {
        self.admin.as_ref() == Some(wallet)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}
