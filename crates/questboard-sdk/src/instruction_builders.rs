use crate::{
    state::instruction_discriminator, AddressFinder, SdkError, SdkResult, MAX_QUEST_ID_LENGTH,
    MAX_SUPPORTED_TOKEN_MINTS,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

pub const INITIALIZE_IX_NAME: &str = "initialize";
pub const CREATE_QUEST_IX_NAME: &str = "create_quest";

/// Instruction data is the 8-byte instruction discriminator followed by the Borsh arguments.
fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> SdkResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub owner: Pubkey,
    pub global_state: Pubkey,
    pub system_program: Pubkey,
}

impl InitializeAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.owner, true),
            AccountMeta::new(self.global_state, false),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeArgs {
    pub supported_token_mints: Vec<Pubkey>,
}

impl InitializeArgs {
    pub fn data(&self) -> SdkResult<Vec<u8>> {
        instruction_data(INITIALIZE_IX_NAME, self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateQuestAccounts {
    pub creator: Pubkey,
    pub global_state: Pubkey,
    pub token_mint: Pubkey,
    pub token_program: Pubkey,
    pub escrow_account: Pubkey,
    pub creator_token_account: Pubkey,
    pub quest: Pubkey,
    pub system_program: Pubkey,
    pub rent: Pubkey,
}

impl CreateQuestAccounts {
    /// Order matches the program's `CreateQuest` accounts struct.
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.creator, true),
            AccountMeta::new(self.global_state, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new(self.escrow_account, false),
            AccountMeta::new(self.creator_token_account, false),
            AccountMeta::new(self.quest, true),
            AccountMeta::new_readonly(self.system_program, false),
            AccountMeta::new_readonly(self.rent, false),
        ]
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateQuestArgs {
    pub id: String,
    pub amount: u64,
    pub deadline: i64,
    pub max_winners: u32,
}

impl CreateQuestArgs {
    pub fn data(&self) -> SdkResult<Vec<u8>> {
        instruction_data(CREATE_QUEST_IX_NAME, self)
    }

    /// Split raw instruction data back into arguments, if it is a `create_quest` call.
    pub fn try_from_instruction_data(data: &[u8]) -> Option<Self> {
        let body = data.strip_prefix(&instruction_discriminator(CREATE_QUEST_IX_NAME)[..])?;
        Self::try_from_slice(body).ok()
    }
}

impl InitializeArgs {
    pub fn try_from_instruction_data(data: &[u8]) -> Option<Self> {
        let body = data.strip_prefix(&instruction_discriminator(INITIALIZE_IX_NAME)[..])?;
        Self::try_from_slice(body).ok()
    }
}

pub fn build_initialize_ix(
    address_finder: &AddressFinder,
    owner: Pubkey,
    supported_token_mints: Vec<Pubkey>,
) -> SdkResult<(Instruction, InitializeAccounts, InitializeArgs)> {
    if supported_token_mints.len() > MAX_SUPPORTED_TOKEN_MINTS {
        return Err(SdkError::TooManySupportedMints {
            count: supported_token_mints.len(),
            max: MAX_SUPPORTED_TOKEN_MINTS,
        });
    }

    let (global_state, _) = address_finder.find_global_state_address();

    let ix_accounts = InitializeAccounts {
        owner,
        global_state,
        system_program: address_finder.system_program_id,
    };

    let ix_data = InitializeArgs {
        supported_token_mints,
    };

    let ix = Instruction {
        program_id: address_finder.program_id,
        accounts: ix_accounts.to_account_metas(),
        data: ix_data.data()?,
    };

    Ok((ix, ix_accounts, ix_data))
}

/// `quest` must co-sign: the program allocates the quest account at that address.
#[allow(clippy::too_many_arguments)]
pub fn build_create_quest_ix(
    address_finder: &AddressFinder,
    creator: Pubkey,
    quest: Pubkey,
    token_mint: Pubkey,
    token_program: Pubkey,
    creator_token_account: Pubkey,
    args: CreateQuestArgs,
) -> SdkResult<(Instruction, CreateQuestAccounts, CreateQuestArgs)> {
    if args.id.len() > MAX_QUEST_ID_LENGTH {
        return Err(SdkError::QuestIdTooLong {
            len: args.id.len(),
            max: MAX_QUEST_ID_LENGTH,
        });
    }

    let (global_state, _) = address_finder.find_global_state_address();
    let (escrow_account, _) = address_finder.find_escrow_address(&quest);

    let ix_accounts = CreateQuestAccounts {
        creator,
        global_state,
        token_mint,
        token_program,
        escrow_account,
        creator_token_account,
        quest,
        system_program: address_finder.system_program_id,
        rent: address_finder.rent_id,
    };

    let ix = Instruction {
        program_id: address_finder.program_id,
        accounts: ix_accounts.to_account_metas(),
        data: args.data()?,
    };

    Ok((ix, ix_accounts, args))
}

/// Succeeds on-chain even when the ATA already exists.
pub fn build_create_ata_idempotent_ix(
    funder: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program_id: &Pubkey,
) -> Instruction {
    create_associated_token_account_idempotent(funder, owner, mint, token_program_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TOKEN_PROGRAM_ID;

    #[test]
    fn test_create_quest_ix_layout() {
        let finder = AddressFinder::default();
        let creator = Pubkey::new_unique();
        let quest = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let creator_ata = finder.find_associated_token_address(&creator, &mint, &TOKEN_PROGRAM_ID);

        let (ix, accounts, args) = build_create_quest_ix(
            &finder,
            creator,
            quest,
            mint,
            TOKEN_PROGRAM_ID,
            creator_ata,
            CreateQuestArgs {
                id: "abc".to_string(),
                amount: 1_000_000,
                deadline: 1_900_000_000,
                max_winners: 10,
            },
        )
        .unwrap();

        assert_eq!(ix.program_id, finder.program_id);
        assert_eq!(ix.accounts.len(), 9);
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[6].is_signer);
        assert_eq!(ix.accounts[6].pubkey, quest);
        assert_eq!(accounts.escrow_account, finder.find_escrow_address(&quest).0);

        let decoded = CreateQuestArgs::try_from_instruction_data(&ix.data).unwrap();
        assert_eq!(decoded, args);
        assert!(InitializeArgs::try_from_instruction_data(&ix.data).is_none());
    }

    #[test]
    fn test_create_quest_rejects_long_id() {
        let finder = AddressFinder::default();
        let result = build_create_quest_ix(
            &finder,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            TOKEN_PROGRAM_ID,
            Pubkey::new_unique(),
            CreateQuestArgs {
                id: "x".repeat(37),
                amount: 1,
                deadline: 1,
                max_winners: 1,
            },
        );
        assert!(matches!(
            result,
            Err(SdkError::QuestIdTooLong { len: 37, max: 36 })
        ));
    }

    #[test]
    fn test_initialize_rejects_too_many_mints() {
        let finder = AddressFinder::default();
        let mints = (0..11).map(|_| Pubkey::new_unique()).collect();
        let result = build_initialize_ix(&finder, Pubkey::new_unique(), mints);
        assert!(matches!(
            result,
            Err(SdkError::TooManySupportedMints { count: 11, .. })
        ));
    }
}
