//! Contract address derivation used by the rollup's contract deployer.
//!
//! These differ from the L1 `CREATE`/`CREATE2` rules: both are prefixed with
//! a domain tag and `CREATE` uses the deployment nonce rather than the
//! transaction nonce.
use alloy::primitives::{keccak256, Address, B256, U256};

const CREATE_PREFIX: &[u8] = b"zksyncCreate";
const CREATE2_PREFIX: &[u8] = b"zksyncCreate2";

/// Address of a contract deployed by `sender` through `create` with the
/// given deployment `nonce`.
#[must_use]
pub fn create_address(sender: Address, nonce: U256) -> Address {
    let mut preimage = Vec::with_capacity(96);
    preimage.extend_from_slice(keccak256(CREATE_PREFIX).as_slice());
    preimage.extend_from_slice(sender.into_word().as_slice());
    preimage.extend_from_slice(&nonce.to_be_bytes::<32>());

    Address::from_word(keccak256(preimage))
}

/// Address of a contract deployed by `sender` through `create2`.
///
/// `input` is the constructor calldata, which takes part in the derivation.
#[must_use]
pub fn create2_address(
    sender: Address,
    salt: B256,
    bytecode_hash: B256,
    input: &[u8],
) -> Address {
    let mut preimage = Vec::with_capacity(160);
    preimage.extend_from_slice(keccak256(CREATE2_PREFIX).as_slice());
    preimage.extend_from_slice(sender.into_word().as_slice());
    preimage.extend_from_slice(salt.as_slice());
    preimage.extend_from_slice(bytecode_hash.as_slice());
    preimage.extend_from_slice(keccak256(input).as_slice());

    Address::from_word(keccak256(preimage))
}
