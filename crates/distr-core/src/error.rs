use distr_math::MathError;
use distr_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DistrError>;

#[derive(Error, Debug)]
pub enum DistrError {
    // ── validation ───────────────────────────────────────────────
    #[error("address cannot be empty")]
    EmptyAddress,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no validator distribution info for {0}")]
    NoValidatorDistInfo(String),

    #[error("validator does not exist: {0}")]
    NoValidatorExists(String),

    #[error("no delegation distribution info")]
    EmptyDelegationDistInfo,

    #[error("set withdraw address disabled")]
    SetWithdrawAddrDisabled,

    #[error("{0} is not allowed to receive funds")]
    BlockedAddress(String),

    #[error("community pool does not have sufficient coins to distribute")]
    InsufficientCommunityPool,

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid slash fraction {0}: must be within [0, 1]")]
    InvalidSlashFraction(String),

    #[error("tokenize share record {0} not found")]
    NoTokenizeShareRecord(u64),

    #[error("{owner} is not the owner of tokenize share record {id}")]
    NotTokenizeShareRecordOwner { id: u64, owner: String },

    #[error("malformed message: {0}")]
    MalformedMsg(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error(transparent)]
    Math(#[from] MathError),

    // ── policy ───────────────────────────────────────────────────
    #[error("invalid authority; expected {expected}, got {got}")]
    Unauthorized { expected: String, got: String },

    #[error("no validator commission to withdraw")]
    NoValidatorCommission,

    // ── fatal ────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("codec: {0}")]
    Codec(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl DistrError {
    /// True when the state can no longer be trusted and block processing
    /// must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DistrError::Invariant(_) | DistrError::Store(_) | DistrError::Codec(_)
        )
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("distribution invariant violated: {}", msg);
        DistrError::Invariant(msg)
    }
}

impl From<bincode::Error> for DistrError {
    fn from(e: bincode::Error) -> Self {
        DistrError::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DistrError::invariant("negative outstanding").is_fatal());
        assert!(DistrError::Codec("bad".into()).is_fatal());
        assert!(!DistrError::NoValidatorCommission.is_fatal());
        assert!(!DistrError::SetWithdrawAddrDisabled.is_fatal());
        assert!(!DistrError::Math(MathError::Overflow).is_fatal());
    }

    #[test]
    fn test_messages() {
        let e = DistrError::Unauthorized {
            expected: "aa".into(),
            got: "bb".into(),
        };
        assert_eq!(e.to_string(), "invalid authority; expected aa, got bb");
    }
}
