use crate::error::{CliError, CliResult};
use questboard_sdk::{ChainConfig, Network, SupportedToken};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{fs, path::Path, str::FromStr};
use url::Url;

pub const ENV_NETWORK: &str = "QUESTBOARD_NETWORK";
pub const ENV_RPC_URL: &str = "QUESTBOARD_RPC_URL";
pub const ENV_PROGRAM_ID: &str = "QUESTBOARD_PROGRAM_ID";
pub const ENV_ADMIN: &str = "QUESTBOARD_ADMIN";
pub const ENV_BACKEND_URL: &str = "QUESTBOARD_BACKEND_URL";

/// Optional overrides on top of the per-network table.
///
/// Read from a YAML file, then from `QUESTBOARD_*` environment variables, then from
/// command line flags; later sources win. Addresses are base58 strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// `mainnet` (or `mainnet-beta`) / `devnet`
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub program_id: Option<String>,

    /// Wallet allowed to bootstrap the program
    pub admin: Option<String>,

    /// Quest backend base URL, needed by `verify-quest` and `claim-status`
    pub backend_url: Option<String>,

    /// Replaces the network's supported reward tokens when not empty
    pub supported_tokens: Vec<TokenEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenEntry {
    pub symbol: String,
    pub mint: String,

    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    6
}

/// Configuration the commands run with.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub chain: ChainConfig,
    pub backend_url: Option<Url>,
}

impl ResolvedConfig {
    pub fn backend_url(&self) -> CliResult<&Url> {
        self.backend_url.as_ref().ok_or_else(|| {
            CliError::InvalidConfig(format!(
                "backend URL not configured (set backend_url or {ENV_BACKEND_URL})"
            ))
        })
    }
}

impl CliConfig {
    pub fn from_yaml_file(path: &Path) -> CliResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> CliResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// File (if any) plus the process environment.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `QUESTBOARD_*` variables looked up through `lookup`; empty values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(network) = var(ENV_NETWORK) {
            self.network = Some(network);
        }
        if let Some(rpc_url) = var(ENV_RPC_URL) {
            self.rpc_url = Some(rpc_url);
        }
        if let Some(program_id) = var(ENV_PROGRAM_ID) {
            self.program_id = Some(program_id);
        }
        if let Some(admin) = var(ENV_ADMIN) {
            self.admin = Some(admin);
        }
        if let Some(backend_url) = var(ENV_BACKEND_URL) {
            self.backend_url = Some(backend_url);
        }
        self
    }

    pub fn resolve(&self) -> CliResult<ResolvedConfig> {
        let network = match &self.network {
            Some(network) => Network::from_str(network)
                .map_err(|e| CliError::InvalidConfig(e.to_string()))?,
            None => Network::default(),
        };

        let mut chain = ChainConfig::for_network(network);
        if let Some(rpc_url) = &self.rpc_url {
            Url::parse(rpc_url)?;
            chain.rpc_url = rpc_url.clone();
        }
        if let Some(program_id) = &self.program_id {
            chain.program_id = parse_pubkey("program_id", program_id)?;
        }
        if let Some(admin) = &self.admin {
            chain.admin = Some(parse_pubkey("admin", admin)?);
        }
        if !self.supported_tokens.is_empty() {
            chain.supported_tokens = self
                .supported_tokens
                .iter()
                .map(|token| {
                    Ok(SupportedToken {
                        symbol: token.symbol.clone(),
                        mint: parse_pubkey(&format!("{} mint", token.symbol), &token.mint)?,
                        decimals: token.decimals,
                    })
                })
                .collect::<CliResult<_>>()?;
        }

        let backend_url = self
            .backend_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        Ok(ResolvedConfig { chain, backend_url })
    }
}

pub fn parse_pubkey(label: &str, value: &str) -> CliResult<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| CliError::InvalidConfig(format!("{label} '{value}' is not a valid address: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use questboard_sdk::{DEFAULT_PROGRAM_ID, DEVNET_RPC_URL, MAINNET_RPC_URL, USDC_MAINNET_MINT};
    use std::{collections::HashMap, io::Write};

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_devnet_table() {
        let resolved = CliConfig::default().resolve().unwrap();
        assert_eq!(resolved.chain, ChainConfig::for_network(Network::Devnet));
        assert_eq!(resolved.chain.rpc_url, DEVNET_RPC_URL);
        assert!(resolved.backend_url.is_none());
        assert!(resolved.backend_url().is_err());
    }

    #[test]
    fn test_yaml_file_overrides_table() {
        let admin = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "network: mainnet\nadmin: {admin}\nbackend_url: https://api.example.com/\nsupported_tokens:\n  - symbol: BONK\n    mint: {mint}\n    decimals: 5\n"
        )
        .unwrap();

        let config = CliConfig::from_yaml_file(file.path()).unwrap();
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.chain.network, Network::Mainnet);
        assert_eq!(resolved.chain.rpc_url, MAINNET_RPC_URL);
        assert_eq!(resolved.chain.program_id, DEFAULT_PROGRAM_ID);
        assert_eq!(resolved.chain.admin, Some(admin));
        assert_eq!(resolved.chain.supported_mints(), vec![mint]);
        assert_eq!(resolved.chain.token_by_symbol("bonk").unwrap().decimals, 5);
        assert_eq!(
            resolved.backend_url().unwrap().as_str(),
            "https://api.example.com/"
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            CliConfig::from_yaml_file(file.path()).unwrap(),
            CliConfig::default()
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let program_id = Pubkey::new_unique();
        let program_id_var = program_id.to_string();
        let config = CliConfig::from_yaml_str("network: devnet\nrpc_url: http://localhost:8899\n")
            .unwrap()
            .with_env_overrides(env(&[
                (ENV_NETWORK, "mainnet-beta"),
                (ENV_PROGRAM_ID, program_id_var.as_str()),
                (ENV_RPC_URL, ""),
            ]));

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.chain.network, Network::Mainnet);
        assert_eq!(resolved.chain.program_id, program_id);
        assert_eq!(resolved.chain.rpc_url, "http://localhost:8899");
        assert_eq!(resolved.chain.supported_mints(), vec![USDC_MAINNET_MINT]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_network = CliConfig {
            network: Some("testnet".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            bad_network.resolve(),
            Err(CliError::InvalidConfig(_))
        ));

        let bad_admin = CliConfig::default().with_env_overrides(env(&[(ENV_ADMIN, "not-a-key")]));
        assert!(matches!(bad_admin.resolve(), Err(CliError::InvalidConfig(_))));

        let bad_url = CliConfig {
            backend_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_url.resolve(), Err(CliError::Url(_))));

        assert!(CliConfig::from_yaml_str("unknown_key: 1\n").is_err());
    }
}
