use crate::{
    ASSOCIATED_TOKEN_PROGRAM_ID, DEFAULT_PROGRAM_ID, ESCROW_SEED, GLOBAL_STATE_SEED,
    REWARD_CLAIMED_SEED,
};
use solana_sdk::{pubkey::Pubkey, system_program, sysvar};
use spl_associated_token_account::get_associated_token_address_with_program_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFinder {
    pub program_id: Pubkey,

    pub associated_token_program_id: Pubkey,
    pub rent_id: Pubkey,
    pub system_program_id: Pubkey,
}

impl AddressFinder {
    pub fn new(
        program_id: Pubkey,
        associated_token_program_id: Pubkey,
        rent_id: Pubkey,
        system_program_id: Pubkey,
    ) -> Self {
        Self {
            program_id,
            associated_token_program_id,
            rent_id,
            system_program_id,
        }
    }

    pub fn for_program(program_id: Pubkey) -> Self {
        Self {
            program_id,
            ..Self::default()
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn find_global_state_address(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[GLOBAL_STATE_SEED], &self.program_id)
    }

    pub fn find_escrow_address(&self, quest: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[ESCROW_SEED, quest.as_ref()], &self.program_id)
    }

    pub fn find_reward_claimed_address(&self, quest: &Pubkey, winner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[REWARD_CLAIMED_SEED, quest.as_ref(), winner.as_ref()],
            &self.program_id,
        )
    }

    /// ATA derivation depends on which token program owns the mint.
    pub fn find_associated_token_address(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program_id: &Pubkey,
    ) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, token_program_id)
    }
}

impl Default for AddressFinder {
    fn default() -> Self {
        Self::new(
            DEFAULT_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            sysvar::rent::ID,
            system_program::ID,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};

    #[test]
    fn test_pdas_are_deterministic_and_distinct() {
        let finder = AddressFinder::default();
        let quest = Pubkey::new_unique();
        let winner = Pubkey::new_unique();

        let (escrow, _) = finder.find_escrow_address(&quest);
        assert_eq!(escrow, finder.find_escrow_address(&quest).0);
        assert_ne!(escrow, finder.find_escrow_address(&Pubkey::new_unique()).0);

        let (claimed, _) = finder.find_reward_claimed_address(&quest, &winner);
        assert_ne!(claimed, finder.find_reward_claimed_address(&winner, &quest).0);

        let (global_state, _) = finder.find_global_state_address();
        let other_program = AddressFinder::for_program(Pubkey::new_unique());
        assert_ne!(global_state, other_program.find_global_state_address().0);
    }

    #[test]
    fn test_ata_depends_on_token_program() {
        let finder = AddressFinder::default();
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let legacy = finder.find_associated_token_address(&owner, &mint, &TOKEN_PROGRAM_ID);
        let extended = finder.find_associated_token_address(&owner, &mint, &TOKEN_2022_PROGRAM_ID);
        assert_ne!(legacy, extended);
        assert_eq!(
            legacy,
            spl_associated_token_account::get_associated_token_address(&owner, &mint)
        );
    }
}
