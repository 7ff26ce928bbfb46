//! Bytecode hashing as understood by the rollup's contract deployer.
//!
//! Contracts are not deployed by shipping bytecode in the deployment
//! calldata. Instead the bytecode is published once as a "factory
//! dependency" of some transaction and later referenced by its versioned
//! hash:
//!
//! ```text
//! | version (1) | 0 | length in words (u16, BE) | sha256(bytecode)[4..32] |
//! ```
use alloy::primitives::B256;
use sha2::{Digest, Sha256};

/// Version byte of the bytecode hash format.
pub const BYTECODE_HASH_VERSION: u8 = 1;

/// Maximum bytecode size, in 32-byte words.
pub const MAX_BYTECODE_WORDS: usize = u16::MAX as usize;

/// Reasons a bytecode can't be hashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BytecodeError {
    /// The length isn't a whole number of 32-byte words.
    #[error("length of {0} bytes is not divisible by 32")]
    NotWordAligned(usize),
    /// The bytecode is longer than [`MAX_BYTECODE_WORDS`].
    #[error("{0} words exceed the maximum of {MAX_BYTECODE_WORDS}")]
    TooLong(usize),
    /// The number of words is even.
    #[error("length in words must be odd, got {0}")]
    EvenWordCount(usize),
}

/// Computes the versioned hash of `bytecode`.
///
/// # Errors
///
/// May fail if `bytecode` is not word aligned, is too long, or has an even
/// number of words.
pub fn hash_bytecode(bytecode: &[u8]) -> Result<B256, BytecodeError> {
    if bytecode.len() % 32 != 0 {
        return Err(BytecodeError::NotWordAligned(bytecode.len()));
    }

    let words = bytecode.len() / 32;
    let length = u16::try_from(words)
        .map_err(|_| BytecodeError::TooLong(words))?;
    if words % 2 == 0 {
        return Err(BytecodeError::EvenWordCount(words));
    }

    let mut hash: [u8; 32] = Sha256::digest(bytecode).into();
    hash[0] = BYTECODE_HASH_VERSION;
    hash[1] = 0;
    hash[2..4].copy_from_slice(&length.to_be_bytes());

    Ok(B256::from(hash))
}
