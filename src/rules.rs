//! Input validation and the coverage invariant
use crate::error::{LedgerError, ValidationError};
use crate::lifecycle;
use crate::types::{Claim, Policy};
use regex::Regex;
use std::sync::LazyLock;

// Permissive on purpose: this is the shape check the service has always
// applied, not RFC 5322. A single trailing newline has always been let
// through as well.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+\n?$")
        .unwrap_or_else(|err| panic!("email pattern failed to compile: {err}"))
});

pub const COVERAGE: &str = "Coverage";
pub const CLAIM_AMOUNT: &str = "Claim amount";

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Strictly greater than zero. NaN and infinities are rejected too.
pub fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

/// Sum of amounts that still draw on the policy.
pub fn committed_total<'a, I>(claims: I) -> f64
where
    I: IntoIterator<Item = &'a Claim>,
{
    claims
        .into_iter()
        .filter(|claim| lifecycle::counts_against_coverage(&claim.status))
        .map(|claim| claim.amount)
        .sum()
}

/// Checks `committed + requested <= coverage`.
pub fn check_coverage(policy: &Policy, committed: f64, requested: f64) -> Result<(), LedgerError> {
    if committed + requested > policy.coverage {
        return Err(LedgerError::CoverageExceeded {
            coverage: policy.coverage,
            committed,
            requested,
        });
    }
    Ok(())
}
