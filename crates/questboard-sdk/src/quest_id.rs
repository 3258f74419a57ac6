use crate::MAX_QUEST_ID_LENGTH;
use sha2::{Digest, Sha256};

/// Fit a quest id into the on-chain limit.
///
/// Ids within `MAX_QUEST_ID_LENGTH` bytes pass through untouched. Longer ids become the first
/// 36 hex characters of their SHA-256 digest, so the same logical id always maps to the same
/// on-chain id. The original id is not recoverable from the hashed one.
pub fn normalize_quest_id(quest_id: &str) -> String {
    if quest_id.len() <= MAX_QUEST_ID_LENGTH {
        return quest_id.to_string();
    }

    let mut hashed = hex::encode(Sha256::digest(quest_id.as_bytes()));
    hashed.truncate(MAX_QUEST_ID_LENGTH);
    hashed
}
