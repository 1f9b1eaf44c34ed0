//! # Error Types
//!
//! Two families live here:
//!
//! - [`ConsensusError`]: the catalog of message-validation failures a BFT
//!   engine reports. The transport never inspects these; it only receives and
//!   discards them.
//! - [`BftNetError`]: failures of this workspace itself (configuration and
//!   harness construction).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol phase an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorPhase {
    Config,
    Message,
    RoundChange,
    Lock,
    Select,
    Decide,
    LockRelease,
    Commit,
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorPhase::Config => "config",
            ErrorPhase::Message => "message",
            ErrorPhase::RoundChange => "roundchange",
            ErrorPhase::Lock => "lock",
            ErrorPhase::Select => "select",
            ErrorPhase::Decide => "decide",
            ErrorPhase::LockRelease => "lock-release",
            ErrorPhase::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Validation failures reported by a consensus engine.
///
/// The variants are grouped by the protocol phase that produces them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusError {
    // Configuration
    #[error("config epoch has not been set")]
    ConfigEpoch,
    #[error("config current state has not been set")]
    ConfigStateMissing,
    #[error("config state compare function has not been set")]
    ConfigStateCompare,
    #[error("config state validate function has not been set")]
    ConfigStateValidate,
    #[error("config private key has not been set")]
    ConfigPrivateKey,
    #[error("config participants must contain at least 4 participants")]
    ConfigParticipants,
    #[error("config public key to identity function has not been set")]
    ConfigPubKeyToIdentity,

    // Common to every message
    #[error("the message has a different version")]
    MessageVersion,
    #[error("the message has been rejected by external validator")]
    MessageValidator,
    #[error("the message being verified is empty")]
    MessageIsEmpty,
    #[error("unrecognized message type")]
    MessageUnknownMessageType,
    #[error("cannot verify the signature of this message")]
    MessageSignature,
    #[error("the message is from an unknown participant")]
    MessageUnknownParticipant,

    // <roundchange>
    #[error("the <roundchange> message has another height than expected")]
    RoundChangeHeightMismatch,
    #[error("the <roundchange> message has lower round than expected")]
    RoundChangeRoundLower,
    #[error("the state data validation failed in <roundchange> message")]
    RoundChangeStateValidation,

    // <lock>
    #[error("the state is empty in <lock> message")]
    LockEmptyState,
    #[error("the state data validation failed in <lock> message")]
    LockStateValidation,
    #[error("the <lock> message has another height than expected")]
    LockHeightMismatch,
    #[error("the <lock> message has lower round than expected")]
    LockRoundLower,
    #[error("the <lock> message is not signed by leader")]
    LockNotSignedByLeader,
    #[error("the proofs in <lock> message have an unknown participant")]
    LockProofUnknownParticipant,
    #[error("the proofs in <lock> message are not <roundchange>")]
    LockProofTypeMismatch,
    #[error("the proofs in <lock> message have mismatched height")]
    LockProofHeightMismatch,
    #[error("the proofs in <lock> message have mismatched round")]
    LockProofRoundMismatch,
    #[error("the proofs in <lock> message have invalid state data")]
    LockProofStateValidation,
    #[error("the <lock> message has insufficient <roundchange> proofs for the proposed state")]
    LockProofInsufficient,

    // <select>
    #[error("the state data validation failed in <select> message")]
    SelectStateValidation,
    #[error("the <select> message has another height than expected")]
    SelectHeightMismatch,
    #[error("the <select> message has lower round than expected")]
    SelectRoundLower,
    #[error("the <select> message is not signed by leader")]
    SelectNotSignedByLeader,
    #[error("the <select> message has no state but its proof contains a state")]
    SelectStateMismatch,
    #[error("the proofs in <select> message have an unknown participant")]
    SelectProofUnknownParticipant,
    #[error("the proofs in <select> message are not <roundchange>")]
    SelectProofTypeMismatch,
    #[error("the proofs in <select> message have mismatched height")]
    SelectProofHeightMismatch,
    #[error("the proofs in <select> message have mismatched round")]
    SelectProofRoundMismatch,
    #[error("the proofs in <select> message have invalid state data")]
    SelectProofStateValidation,
    #[error("the proposed state is not the maximal one in the <select> message")]
    SelectProofNotTheMaximal,
    #[error("the <select> message has insufficient overall proofs")]
    SelectProofInsufficient,
    #[error("the <select> message overall state proposals exceeded maximal")]
    SelectProofExceeded,

    // <decide>
    #[error("the <decide> message has lower height than expected")]
    DecideHeightLower,
    #[error("the state is empty in <decide> message")]
    DecideEmptyState,
    #[error("the state data validation failed in <decide> message")]
    DecideStateValidation,
    #[error("the <decide> message is not signed by leader")]
    DecideNotSignedByLeader,
    #[error("the proofs in <decide> message have an unknown participant")]
    DecideProofUnknownParticipant,
    #[error("the proofs in <decide> message are not <commit>")]
    DecideProofTypeMismatch,
    #[error("the proofs in <decide> message have mismatched height")]
    DecideProofHeightMismatch,
    #[error("the proofs in <decide> message have mismatched round")]
    DecideProofRoundMismatch,
    #[error("the proofs in <decide> message have invalid state data")]
    DecideProofStateValidation,
    #[error("the <decide> message has insufficient <commit> proofs for the proposed state")]
    DecideProofInsufficient,
    #[error("the state in <decide> message does not match the provided target state")]
    MismatchedTargetState,

    // <lock-release>
    #[error("received <lock-release> message in non LOCK-RELEASE state")]
    LockReleaseStatus,

    // <commit>
    #[error("the state is empty in <commit> message")]
    CommitEmptyState,
    #[error("the state in <commit> message does not match what leader has locked")]
    CommitStateMismatch,
    #[error("the state data validation failed in <commit> message")]
    CommitStateValidation,
    #[error("received <commit> message in non COMMIT state")]
    CommitStatus,
    #[error("the <commit> message has another height than expected")]
    CommitHeightMismatch,
    #[error("the <commit> message is from another round")]
    CommitRoundMismatch,
}

impl ConsensusError {
    /// The protocol phase this error is reported from.
    pub fn phase(&self) -> ErrorPhase {
        use ConsensusError::*;
        match self {
            ConfigEpoch | ConfigStateMissing | ConfigStateCompare | ConfigStateValidate
            | ConfigPrivateKey | ConfigParticipants | ConfigPubKeyToIdentity => ErrorPhase::Config,

            MessageVersion | MessageValidator | MessageIsEmpty | MessageUnknownMessageType
            | MessageSignature | MessageUnknownParticipant => ErrorPhase::Message,

            RoundChangeHeightMismatch | RoundChangeRoundLower | RoundChangeStateValidation => {
                ErrorPhase::RoundChange
            }

            LockEmptyState
            | LockStateValidation
            | LockHeightMismatch
            | LockRoundLower
            | LockNotSignedByLeader
            | LockProofUnknownParticipant
            | LockProofTypeMismatch
            | LockProofHeightMismatch
            | LockProofRoundMismatch
            | LockProofStateValidation
            | LockProofInsufficient => ErrorPhase::Lock,

            SelectStateValidation
            | SelectHeightMismatch
            | SelectRoundLower
            | SelectNotSignedByLeader
            | SelectStateMismatch
            | SelectProofUnknownParticipant
            | SelectProofTypeMismatch
            | SelectProofHeightMismatch
            | SelectProofRoundMismatch
            | SelectProofStateValidation
            | SelectProofNotTheMaximal
            | SelectProofInsufficient
            | SelectProofExceeded => ErrorPhase::Select,

            DecideHeightLower
            | DecideEmptyState
            | DecideStateValidation
            | DecideNotSignedByLeader
            | DecideProofUnknownParticipant
            | DecideProofTypeMismatch
            | DecideProofHeightMismatch
            | DecideProofRoundMismatch
            | DecideProofStateValidation
            | DecideProofInsufficient
            | MismatchedTargetState => ErrorPhase::Decide,

            LockReleaseStatus => ErrorPhase::LockRelease,

            CommitEmptyState | CommitStateMismatch | CommitStateValidation | CommitStatus
            | CommitHeightMismatch | CommitRoundMismatch => ErrorPhase::Commit,
        }
    }
}

/// Errors raised by the simulated transport and its harness.
///
/// # Examples
///
/// ```rust
/// use bftnet_core::BftNetError;
///
/// let error = BftNetError::invalid_config("tick interval must be positive");
/// assert!(error.to_string().contains("tick interval"));
/// ```
#[derive(Error, Debug)]
pub enum BftNetError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A mesh needs at least two engines to connect
    #[error("Mesh requires at least {required} engines, got {actual}")]
    MeshTooSmall { required: usize, actual: usize },

    /// Peer index outside the mesh
    #[error("Peer {index} not found in mesh of {size}")]
    PeerNotFound { index: usize, size: usize },

    /// Error surfaced by a consensus engine
    #[error("Consensus error ({phase}): {0}", phase = .0.phase())]
    Consensus(#[from] ConsensusError),
}

/// Result alias for fallible bftnet operations.
pub type Result<T> = std::result::Result<T, BftNetError>;

impl BftNetError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_grouping() {
        assert_eq!(ConsensusError::ConfigEpoch.phase(), ErrorPhase::Config);
        assert_eq!(ConsensusError::MessageSignature.phase(), ErrorPhase::Message);
        assert_eq!(
            ConsensusError::RoundChangeRoundLower.phase(),
            ErrorPhase::RoundChange
        );
        assert_eq!(ConsensusError::LockProofInsufficient.phase(), ErrorPhase::Lock);
        assert_eq!(ConsensusError::SelectProofExceeded.phase(), ErrorPhase::Select);
        assert_eq!(ConsensusError::MismatchedTargetState.phase(), ErrorPhase::Decide);
        assert_eq!(
            ConsensusError::LockReleaseStatus.phase(),
            ErrorPhase::LockRelease
        );
        assert_eq!(ConsensusError::CommitRoundMismatch.phase(), ErrorPhase::Commit);
    }

    #[test]
    fn test_consensus_error_wraps() {
        let error: BftNetError = ConsensusError::LockNotSignedByLeader.into();
        let message = error.to_string();
        assert!(message.contains("(lock)"));
        assert!(message.contains("not signed by leader"));
    }

    #[test]
    fn test_error_catalog_serializes() {
        let json = serde_json::to_string(&ConsensusError::CommitStatus).unwrap();
        assert_eq!(json, "\"CommitStatus\"");
    }
}
