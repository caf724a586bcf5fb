//! Identifier allocation
//!
//! Allocation runs inside a write transaction, so the value returned cannot be
//! handed to a concurrent caller before this transaction commits. The row
//! insert that follows is a unique insert regardless.
use crate::error::{LedgerError, Result};
use crate::store::Txn;
use crate::utils;

/// First random positive 31-bit id with no existing policyholder row.
pub fn allocate_policyholder_id(txn: &Txn<'_>) -> Result<u32> {
    loop {
        let candidate = utils::draw_policyholder_id();
        if candidate == 0 {
            continue;
        }
        if !txn.contains(&utils::policyholder_key(candidate))? {
            return Ok(candidate);
        }
        tracing::debug!(candidate, "policyholder id collision, redrawing");
    }
}

/// `max(policy_id) + 1` among the policyholder's policies, or 1.
pub fn allocate_next_policy_id(txn: &Txn<'_>, policyholder_id: u32) -> Result<u32> {
    next_in_sequence(txn, &utils::policy_prefix(policyholder_id), "policy")
}

/// `max(claim_id) + 1` among the policy's claims, or 1.
pub fn allocate_next_claim_id(txn: &Txn<'_>, policyholder_id: u32, policy_id: u32) -> Result<u32> {
    next_in_sequence(
        txn,
        &utils::claim_prefix(policyholder_id, policy_id),
        "claim",
    )
}

fn next_in_sequence(txn: &Txn<'_>, prefix: &[u8], what: &str) -> Result<u32> {
    let current = match txn.reader().last_key(prefix)? {
        Some(key) => utils::trailing_id(&key)
            .ok_or_else(|| LedgerError::Codec(format!("malformed {what} key")))?,
        None => 0,
    };
    current
        .checked_add(1)
        .ok_or_else(|| LedgerError::Conflict(format!("{what} id sequence exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::Policy;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn policy(policyholder_id: u32, policy_id: u32) -> Policy {
        Policy {
            policy_id,
            policyholder_id,
            coverage: 100.0,
            status: "active".into(),
        }
    }

    #[test]
    fn sequences_restart_per_owner_and_follow_the_max() {
        let temp_dir = tempdir().unwrap();
        let db = sled::open(temp_dir.path().join("ids.db")).unwrap();
        let store = Store::new(Arc::new(db)).sync_commits(false);

        store
            .transact(|txn| {
                assert_eq!(allocate_next_policy_id(txn, 5)?, 1);
                txn.put(utils::policy_key(5, 1), &policy(5, 1))?;
                txn.put(utils::policy_key(5, 7), &policy(5, 7))?;
                Ok(())
            })
            .unwrap();

        store
            .transact(|txn| {
                assert_eq!(allocate_next_policy_id(txn, 5)?, 8);
                assert_eq!(allocate_next_policy_id(txn, 6)?, 1);
                assert_eq!(allocate_next_claim_id(txn, 5, 1)?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn exhausted_sequence_is_a_conflict() {
        let temp_dir = tempdir().unwrap();
        let db = sled::open(temp_dir.path().join("ids.db")).unwrap();
        let store = Store::new(Arc::new(db)).sync_commits(false);

        let res = store.transact(|txn| {
            txn.put(utils::policy_key(5, u32::MAX), &policy(5, u32::MAX))?;
            Ok(())
        });
        assert!(res.is_ok());

        let res = store.transact(|txn| allocate_next_policy_id(txn, 5));
        assert!(matches!(res, Err(LedgerError::Conflict(_))));
    }

    #[test]
    fn policyholder_ids_are_positive() {
        let temp_dir = tempdir().unwrap();
        let db = sled::open(temp_dir.path().join("ids.db")).unwrap();
        let store = Store::new(Arc::new(db)).sync_commits(false);

        let id = store.transact(|txn| allocate_policyholder_id(txn)).unwrap();
        assert!(id > 0 && id < (1 << 31));
    }
}
