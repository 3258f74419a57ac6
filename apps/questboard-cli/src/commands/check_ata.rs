use super::{connect, resolve_mint, token_program_name};
use crate::{
    config::{parse_pubkey, ResolvedConfig},
    error::CliResult,
};

pub async fn execute(config: &ResolvedConfig, token: String, owner: String) -> CliResult<()> {
    let mint = resolve_mint(&config.chain, &token)?;
    let owner = parse_pubkey("owner", &owner)?;
    println!("🔍 Checking token account of {} for mint {}", owner, mint);

    let contract = connect(config, None);
    let exists = contract.check_ata_exists(&owner, &mint).await?;

    if let Some(program) = contract.token_program_cache().get(&mint) {
        let address = contract
            .address_finder()
            .find_associated_token_address(&owner, &mint, &program);
        println!("📋 Address: {}", address);
        println!("🪙 Token program: {}", token_program_name(&program));
    }

    if exists {
        println!("✅ Token account exists");
    } else {
        println!("❌ Token account does not exist (create it with `questboard ensure-ata`)");
    }

    Ok(())
}
