//! Claim status lifecycle
//!
//! A claim's first status is derived from its amount and nothing else.
//! Afterwards the status is an open string that callers overwrite freely;
//! there is no transition table and no terminal state.

pub const PENDING: &str = "pending";
pub const FLAGGED: &str = "flagged";
pub const REJECTED: &str = "rejected";

/// Claims strictly above this amount are flagged for manual review.
pub const FLAG_THRESHOLD: f64 = 10_000.0;

pub fn initial_status(amount: f64) -> &'static str {
    if amount > FLAG_THRESHOLD {
        FLAGGED
    } else {
        PENDING
    }
}

/// Whether a claim in `status` still draws on its policy's coverage.
pub fn counts_against_coverage(status: &str) -> bool {
    status != REJECTED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(initial_status(10_000.0), PENDING);
        assert_eq!(initial_status(10_000.01), FLAGGED);
        assert_eq!(initial_status(0.01), PENDING);
    }

    #[test]
    fn only_rejected_is_excluded() {
        assert!(counts_against_coverage(PENDING));
        assert!(counts_against_coverage(FLAGGED));
        assert!(counts_against_coverage("approved"));
        // status strings are compared exactly
        assert!(counts_against_coverage("Rejected"));
        assert!(!counts_against_coverage(REJECTED));
    }
}
