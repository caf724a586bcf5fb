use std::fmt;

/// Malformed input rejected before any record is touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Name must not be empty")]
    EmptyName,
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// The record kinds a lookup can miss on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Policyholder,
    Policy,
    Claim,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Policyholder => "Policyholder",
            Entity::Policy => "Policy",
            Entity::Claim => "Claim",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("Claim exceeds available coverage")]
    CoverageExceeded {
        coverage: f64,
        committed: f64,
        requested: f64,
    },
    // unique key already taken, or a per-owner sequence ran out
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("record codec failure: {0}")]
    Codec(String),
}

impl LedgerError {
    /// True for failures caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Storage(_) | LedgerError::Codec(_))
    }
}

impl From<minicbor::decode::Error> for LedgerError {
    fn from(err: minicbor::decode::Error) -> Self {
        LedgerError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidBind { var: &'static str, value: String },
    #[error("{var} must be a boolean flag, got {value}")]
    InvalidFlag { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(
            LedgerError::NotFound(Entity::Policy).to_string(),
            "Policy not found"
        );
    }

    #[test]
    fn positive_rule_message_names_the_field() {
        let err = ValidationError::NotPositive {
            field: "Claim amount",
        };
        assert_eq!(err.to_string(), "Claim amount must be greater than zero");
    }

    #[test]
    fn storage_faults_are_not_client_errors() {
        let err = LedgerError::Codec("bad bytes".into());
        assert!(!err.is_client_error());
        assert!(LedgerError::Conflict("taken".into()).is_client_error());
    }
}
