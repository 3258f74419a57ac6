/*!
# Transaction Builders

Unsigned transaction assembly plus the wire codec used for size checks and for moving
transactions across the wallet boundary. Nothing here signs or sends.
*/

use crate::{SdkError, SdkResult};
use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, pubkey::Pubkey,
    transaction::Transaction,
};

/// Build an unsigned transaction with every signature slot zeroed.
pub fn build_unsigned_transaction(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    recent_blockhash: Hash,
) -> SdkResult<Transaction> {
    if instructions.is_empty() {
        return Err(SdkError::NoInstructions);
    }

    let message = Message::new_with_blockhash(instructions, Some(fee_payer), &recent_blockhash);
    Ok(Transaction::new_unsigned(message))
}

pub fn serialize_transaction(tx: &Transaction) -> SdkResult<Vec<u8>> {
    bincode::serde::encode_to_vec(tx, bincode::config::legacy())
        .map_err(|e| SdkError::Encode(e.to_string()))
}

pub fn deserialize_transaction(bytes: &[u8]) -> SdkResult<Transaction> {
    let (tx, _) = bincode::serde::decode_from_slice::<Transaction, _>(bytes, bincode::config::legacy())
        .map_err(|e| SdkError::Decode(e.to_string()))?;
    Ok(tx)
}

/// Signature slots are preallocated, so the size is the same before and after signing.
pub fn serialized_transaction_size(tx: &Transaction) -> SdkResult<usize> {
    Ok(serialize_transaction(tx)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_create_ata_idempotent_ix, MAX_TRANSACTION_SIZE, TOKEN_PROGRAM_ID};
    use solana_sdk::signature::{Keypair, Signer};

    #[test]
    fn test_empty_instructions_rejected() {
        let result = build_unsigned_transaction(&[], &Pubkey::new_unique(), Hash::new_unique());
        assert!(matches!(result, Err(SdkError::NoInstructions)));
    }

    #[test]
    fn test_codec_round_trip_preserves_signatures() {
        let payer = Keypair::new();
        let blockhash = Hash::new_unique();
        let ix = build_create_ata_idempotent_ix(
            &payer.pubkey(),
            &payer.pubkey(),
            &Pubkey::new_unique(),
            &TOKEN_PROGRAM_ID,
        );

        let mut tx = build_unsigned_transaction(&[ix], &payer.pubkey(), blockhash).unwrap();
        let unsigned_size = serialized_transaction_size(&tx).unwrap();
        tx.sign(&[&payer], blockhash);

        let bytes = serialize_transaction(&tx).unwrap();
        assert_eq!(bytes.len(), unsigned_size);
        assert!(bytes.len() < MAX_TRANSACTION_SIZE);

        let decoded = deserialize_transaction(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(
            deserialize_transaction(&[1, 2, 3]),
            Err(SdkError::Decode(_))
        ));
    }
}
