//! Persisted ledger records
use serde::{Deserialize, Serialize};

// Stored under the policyholder table, keyed by `id`.
#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct Policyholder {
    #[n(0)]
    pub id: u32, // random 31-bit, never reused while the row exists
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String, // unique across all policyholders
}

// Keyed by (policyholder_id, policy_id).
#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct Policy {
    #[n(0)]
    pub policy_id: u32, // sequence scoped to the owner
    #[n(1)]
    pub policyholder_id: u32,
    #[n(2)]
    pub coverage: f64,
    #[n(3)]
    pub status: String, // free text, no enforced domain
}

// Keyed by (policyholder_id, policy_id, claim_id).
#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq,
)]
pub struct Claim {
    #[n(0)]
    pub claim_id: u32, // sequence scoped to the owning policy
    #[n(1)]
    pub policyholder_id: u32,
    #[n(2)]
    pub policy_id: u32,
    #[n(3)]
    pub amount: f64,
    #[n(4)]
    pub status: String,
}
