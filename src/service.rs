//! Service layer API for policyholder, policy and claim operations
use crate::error::{Entity, LedgerError, Result};
use crate::identity;
use crate::lifecycle;
use crate::rules;
use crate::store::{Store, Txn};
use crate::types::{Claim, Policy, Policyholder};
use crate::utils;
use std::sync::Arc;

pub struct LedgerService {
    store: Store,
}

/// What a cascading delete starts from.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Policyholder(u32),
    Policy { policyholder_id: u32, policy_id: u32 },
}

impl LedgerService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            store: Store::new(instance),
        }
    }

    pub fn from_store(store: Store) -> Self {
        Self { store }
    }

    /// Register a policyholder under a freshly drawn id
    pub fn create_policyholder(&self, name: String, email: String) -> Result<Policyholder> {
        rules::validate_name(&name)?;
        rules::validate_email(&email)?;

        let policyholder = self.store.transact(|txn| {
            let email_key = utils::email_key(&email);
            if txn.contains(&email_key)? {
                return Err(LedgerError::Conflict("Email already registered".into()));
            }

            let id = identity::allocate_policyholder_id(txn)?;
            let policyholder = Policyholder { id, name, email };

            txn.insert_unique(utils::policyholder_key(id), &policyholder, "Policyholder")?;
            txn.insert_unique_raw(email_key, utils::encode_id(id).to_vec(), "Email")?;

            Ok(policyholder)
        })?;

        tracing::info!(policyholder_id = policyholder.id, "policyholder created");
        Ok(policyholder)
    }

    pub fn get_policyholder(&self, policyholder_id: u32) -> Result<Policyholder> {
        self.store
            .reader()
            .get(&utils::policyholder_key(policyholder_id))?
            .ok_or(LedgerError::NotFound(Entity::Policyholder))
    }

    /// Replace name and email. A changed email moves the uniqueness index entry.
    pub fn update_policyholder(
        &self,
        policyholder_id: u32,
        name: String,
        email: String,
    ) -> Result<Policyholder> {
        rules::validate_name(&name)?;
        rules::validate_email(&email)?;

        let updated = self.store.transact(|txn| {
            let key = utils::policyholder_key(policyholder_id);
            let mut policyholder: Policyholder = txn
                .reader()
                .get(&key)?
                .ok_or(LedgerError::NotFound(Entity::Policyholder))?;

            if policyholder.email != email {
                let email_key = utils::email_key(&email);
                if txn.contains(&email_key)? {
                    return Err(LedgerError::Conflict("Email already registered".into()));
                }
                txn.remove(&utils::email_key(&policyholder.email));
                txn.insert_unique_raw(
                    email_key,
                    utils::encode_id(policyholder_id).to_vec(),
                    "Email",
                )?;
            }

            policyholder.name = name;
            policyholder.email = email;
            txn.put(key, &policyholder)?;

            Ok(policyholder)
        })?;

        tracing::info!(policyholder_id, "policyholder updated");
        Ok(updated)
    }

    /// Remove a policyholder with every policy and claim it owns
    pub fn delete_policyholder(&self, policyholder_id: u32) -> Result<String> {
        let removed = self.store.transact(|txn| {
            if !txn.contains(&utils::policyholder_key(policyholder_id))? {
                return Err(LedgerError::NotFound(Entity::Policyholder));
            }
            cascade_delete(txn, Scope::Policyholder(policyholder_id))
        })?;

        tracing::info!(
            policyholder_id,
            policies = removed.policies,
            claims = removed.claims,
            "policyholder deleted"
        );
        Ok("Policyholder deleted successfully".to_string())
    }

    /// Open the next policy in the policyholder's sequence
    pub fn create_policy(
        &self,
        policyholder_id: u32,
        coverage: f64,
        status: String,
    ) -> Result<Policy> {
        rules::validate_positive(rules::COVERAGE, coverage)?;

        let policy = self.store.transact(|txn| {
            if !txn.contains(&utils::policyholder_key(policyholder_id))? {
                return Err(LedgerError::NotFound(Entity::Policyholder));
            }

            let policy_id = identity::allocate_next_policy_id(txn, policyholder_id)?;
            let policy = Policy {
                policy_id,
                policyholder_id,
                coverage,
                status,
            };
            txn.insert_unique(
                utils::policy_key(policyholder_id, policy_id),
                &policy,
                "Policy",
            )?;

            Ok(policy)
        })?;

        tracing::info!(
            policyholder_id,
            policy_id = policy.policy_id,
            coverage,
            "policy created"
        );
        Ok(policy)
    }

    pub fn get_policy(&self, policyholder_id: u32, policy_id: u32) -> Result<Policy> {
        self.store
            .reader()
            .get(&utils::policy_key(policyholder_id, policy_id))?
            .ok_or(LedgerError::NotFound(Entity::Policy))
    }

    pub fn list_policies(&self, policyholder_id: u32) -> Result<Vec<Policy>> {
        let reader = self.store.reader();
        if !reader.contains(&utils::policyholder_key(policyholder_id))? {
            return Err(LedgerError::NotFound(Entity::Policyholder));
        }
        reader.scan(&utils::policy_prefix(policyholder_id))
    }

    /// Overwrite coverage and status. Existing claims are not re-checked
    /// against a lowered coverage.
    pub fn update_policy(
        &self,
        policyholder_id: u32,
        policy_id: u32,
        coverage: f64,
        status: String,
    ) -> Result<Policy> {
        rules::validate_positive(rules::COVERAGE, coverage)?;

        let policy = self.store.transact(|txn| {
            let key = utils::policy_key(policyholder_id, policy_id);
            let mut policy: Policy = txn
                .reader()
                .get(&key)?
                .ok_or(LedgerError::NotFound(Entity::Policy))?;

            policy.coverage = coverage;
            policy.status = status;
            txn.put(key, &policy)?;

            Ok(policy)
        })?;

        tracing::info!(policyholder_id, policy_id, coverage, "policy updated");
        Ok(policy)
    }

    /// Remove a policy and its claims. The policy must belong to `policyholder_id`.
    pub fn delete_policy(&self, policyholder_id: u32, policy_id: u32) -> Result<String> {
        let removed = self.store.transact(|txn| {
            if !txn.contains(&utils::policy_key(policyholder_id, policy_id))? {
                return Err(LedgerError::NotFound(Entity::Policy));
            }
            cascade_delete(
                txn,
                Scope::Policy {
                    policyholder_id,
                    policy_id,
                },
            )
        })?;

        tracing::info!(
            policyholder_id,
            policy_id,
            claims = removed.claims,
            "policy deleted"
        );
        Ok(format!(
            "Policy {policy_id} and related claims deleted successfully"
        ))
    }

    /// File a claim against a policy's remaining coverage
    pub fn create_claim(&self, policyholder_id: u32, policy_id: u32, amount: f64) -> Result<Claim> {
        rules::validate_positive(rules::CLAIM_AMOUNT, amount)?;

        let claim = self.store.transact(|txn| {
            let reader = txn.reader();
            let policy: Policy = reader
                .get(&utils::policy_key(policyholder_id, policy_id))?
                .ok_or(LedgerError::NotFound(Entity::Policy))?;

            let existing: Vec<Claim> = reader.scan(&utils::claim_prefix(policyholder_id, policy_id))?;
            let committed = rules::committed_total(&existing);
            if let Err(err) = rules::check_coverage(&policy, committed, amount) {
                tracing::warn!(
                    policyholder_id,
                    policy_id,
                    coverage = policy.coverage,
                    committed,
                    amount,
                    "claim rejected over coverage"
                );
                return Err(err);
            }

            let claim_id = identity::allocate_next_claim_id(txn, policyholder_id, policy_id)?;
            let claim = Claim {
                claim_id,
                policyholder_id,
                policy_id,
                amount,
                status: lifecycle::initial_status(amount).to_string(),
            };
            txn.insert_unique(
                utils::claim_key(policyholder_id, policy_id, claim_id),
                &claim,
                "Claim",
            )?;

            Ok(claim)
        })?;

        tracing::info!(
            policyholder_id,
            policy_id,
            claim_id = claim.claim_id,
            status = %claim.status,
            "claim created"
        );
        Ok(claim)
    }

    pub fn get_claim(&self, policyholder_id: u32, policy_id: u32, claim_id: u32) -> Result<Claim> {
        self.store
            .reader()
            .get(&utils::claim_key(policyholder_id, policy_id, claim_id))?
            .ok_or(LedgerError::NotFound(Entity::Claim))
    }

    pub fn list_claims(&self, policyholder_id: u32, policy_id: u32) -> Result<Vec<Claim>> {
        let reader = self.store.reader();
        if !reader.contains(&utils::policy_key(policyholder_id, policy_id))? {
            return Err(LedgerError::NotFound(Entity::Policy));
        }
        reader.scan(&utils::claim_prefix(policyholder_id, policy_id))
    }

    /// Overwrite a claim's status. Any status may follow any other.
    pub fn update_claim_status(
        &self,
        policyholder_id: u32,
        policy_id: u32,
        claim_id: u32,
        status: String,
    ) -> Result<Claim> {
        let claim = self.store.transact(|txn| {
            let key = utils::claim_key(policyholder_id, policy_id, claim_id);
            let mut claim: Claim = txn
                .reader()
                .get(&key)?
                .ok_or(LedgerError::NotFound(Entity::Claim))?;

            claim.status = status;
            txn.put(key, &claim)?;

            Ok(claim)
        })?;

        tracing::info!(
            policyholder_id,
            policy_id,
            claim_id,
            status = %claim.status,
            "claim status updated"
        );
        Ok(claim)
    }

    pub fn delete_claim(&self, policyholder_id: u32, policy_id: u32, claim_id: u32) -> Result<String> {
        self.store.transact(|txn| {
            let key = utils::claim_key(policyholder_id, policy_id, claim_id);
            if !txn.contains(&key)? {
                return Err(LedgerError::NotFound(Entity::Claim));
            }
            txn.remove(&key);
            Ok(())
        })?;

        tracing::info!(policyholder_id, policy_id, claim_id, "claim deleted");
        Ok(format!("Claim {claim_id} deleted successfully"))
    }
}

#[derive(Debug, Default)]
struct Removed {
    policies: usize,
    claims: usize,
}

// Shared by both delete paths so policyholder and policy deletion cannot
// drift apart. Claims go first, then policies, then the owner row.
fn cascade_delete(txn: &mut Txn<'_>, scope: Scope) -> Result<Removed> {
    let reader = txn.reader();
    let (claims, policies) = match scope {
        Scope::Policyholder(policyholder_id) => (
            utils::holder_claims_prefix(policyholder_id),
            utils::policy_prefix(policyholder_id),
        ),
        Scope::Policy {
            policyholder_id,
            policy_id,
        } => (
            utils::claim_prefix(policyholder_id, policy_id),
            utils::policy_key(policyholder_id, policy_id),
        ),
    };

    let mut removed = Removed::default();
    for key in reader.scan_keys(&claims)? {
        txn.remove(&key);
        removed.claims += 1;
    }
    for key in reader.scan_keys(&policies)? {
        txn.remove(&key);
        removed.policies += 1;
    }

    if let Scope::Policyholder(policyholder_id) = scope {
        let key = utils::policyholder_key(policyholder_id);
        if let Some(policyholder) = reader.get::<Policyholder>(&key)? {
            txn.remove(&utils::email_key(&policyholder.email));
        }
        txn.remove(&key);
    }

    Ok(removed)
}
