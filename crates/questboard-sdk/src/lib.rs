/*!
# Questboard SDK

Everything needed to talk to the Questboard escrow program without touching the network:

- **Chain config**: per-network RPC endpoints, program id and supported reward tokens
- **Account layouts**: Borsh layouts for `GlobalState`, `Quest` and `RewardClaimed`
- **Address derivation**: global state, escrow and reward-claimed PDAs plus associated token accounts
- **Instruction builders**: `initialize`, `create_quest` and idempotent ATA creation
- **Transaction codec**: unsigned transaction assembly and wire (de)serialization

No function in this crate performs RPC calls; callers supply blockhashes and account data.
*/

mod address_finder;
mod chain_config;
pub mod constants;
mod error;
mod instruction_builders;
mod quest_id;
pub mod state;
mod transaction_builders;

pub use address_finder::AddressFinder;
pub use chain_config::{ChainConfig, Network, SupportedToken};
pub use constants::*;
pub use error::{SdkError, SdkResult};
pub use instruction_builders::*;
pub use quest_id::normalize_quest_id;
pub use state::{GlobalState, ProgramAccount, Quest, RewardClaimed};
pub use transaction_builders::*;
