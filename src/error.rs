//! Error type for the checked entry points.
//!
//! The primitives themselves cannot fail on well-formed input; these errors
//! come from the boundary that turns caller slices into fixed-size keys and
//! nonces, from the end of the counter space, and from tag verification.

use cipher::StreamCipherError;
use core::fmt;

/// Errors produced by the checked entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Key is not exactly 32 bytes.
    InvalidKeyLength,
    /// Nonce is not exactly 12 bytes.
    InvalidNonceLength,
    /// The request would run the 32-bit block counter past its end.
    KeystreamExhausted,
    /// Authentication tag does not match the message.
    TagMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKeyLength => write!(f, "key must be 32 bytes long"),
            Error::InvalidNonceLength => write!(f, "nonce must be 12 bytes long"),
            Error::KeystreamExhausted => {
                write!(f, "keystream exhausted for this key and nonce")
            }
            Error::TagMismatch => write!(f, "authentication tag mismatch"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StreamCipherError> for Error {
    fn from(_: StreamCipherError) -> Self {
        Error::KeystreamExhausted
    }
}
