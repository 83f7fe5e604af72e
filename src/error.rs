//! Error taxonomy
//!
//! Nothing here is retried automatically; every retry is user-initiated.

use thiserror::Error;

/// The wallet collaborator refused a payment or a mint.
///
/// Display strings are user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("please connect your wallet first")]
    WalletNotConnected,
    #[error("you need {required} token(s) to play, current balance: {balance}")]
    InsufficientBalance { required: u32, balance: u32 },
    #[error("transaction cancelled by user")]
    Cancelled,
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// A command that is invalid in the current state, rejected synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("the current run has not finished")]
    StillRunning,
    #[error("a payment is already being processed")]
    PaymentInFlight,
    #[error("no payment is being processed")]
    NoPaymentInFlight,
    #[error("a claim for score {0} is already being processed")]
    ClaimInFlight(u32),
    #[error("score {0} has already been claimed")]
    AlreadyClaimed(u32),
    #[error("score {0} is not claimable")]
    NothingToClaim(u32),
}

/// Unexpected failure while stepping a frame. Fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameFault {
    #[error("frame {frame} panicked: {message}")]
    Panicked { frame: u64, message: String },
    #[error("frame {frame} left non-finite coordinates in the world")]
    NonFinite { frame: u64 },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown game variant '{0}'")]
    UnknownVariant(String),
    #[error("bad argument: {0}")]
    Argument(String),
}

/// Umbrella error for the session boundary and the binary
#[derive(Debug, Error)]
pub enum ArcadeError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Fault(#[from] FrameFault),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
