//! Call data for the pass, daily check-in and raffle contracts.

use anyhow::{Context, Result};
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};

pub const PASS_CONTRACT: &str = "0xC92Df682A8DC28717C92D7B5832376e6aC15a90D";
pub const DAILY_CONTRACT: &str = "0xE3bA0072d1da98269133852fba1795419D72BaF4";
pub const RAFFLE_CONTRACT: &str = "0x557764618fc2f4eca692d422ba79c70f237113e6";

const MINT_SELECTOR: [u8; 4] = [0xf7, 0x5e, 0x03, 0x84];
const DAILY_SELECTOR: [u8; 4] = [0x9e, 0x4c, 0xda, 0x43];
const RAFFLE_SELECTOR: [u8; 4] = [0x9f, 0xc9, 0x6c, 0x7e];
const TIME_UNTIL_NEXT_SIGN_IN: &str = "getTimeUntilNextSignIn(address)";

pub fn contract_address(address: &str) -> Result<Address> {
    address
        .parse::<Address>()
        .with_context(|| format!("Invalid contract address {}", address))
}

/// Decodes a `0x`-prefixed hex signature handed out by the service.
pub fn decode_signature(signature: &str) -> Result<Vec<u8>> {
    hex::decode(signature.trim_start_matches("0x"))
        .with_context(|| format!("Malformed signature '{}'", signature))
}

fn with_selector(selector: [u8; 4], args: &[Token]) -> Bytes {
    let mut data = selector.to_vec();
    data.extend(abi::encode(args));
    Bytes::from(data)
}

/// `mint((address owner, uint256 category, bytes signature))`
pub fn mint_pass(owner: Address, signature: &[u8]) -> Bytes {
    with_selector(
        MINT_SELECTOR,
        &[Token::Tuple(vec![
            Token::Address(owner),
            Token::Uint(U256::one()),
            Token::Bytes(signature.to_vec()),
        ])],
    )
}

pub fn daily_sign_in() -> Bytes {
    Bytes::from(DAILY_SELECTOR.to_vec())
}

/// `raffle((address owner, uint256 xp, uint256 nonce, bytes signature))`
pub fn raffle(owner: Address, xp: U256, nonce: U256, signature: &[u8]) -> Bytes {
    with_selector(
        RAFFLE_SELECTOR,
        &[Token::Tuple(vec![
            Token::Address(owner),
            Token::Uint(xp),
            Token::Uint(nonce),
            Token::Bytes(signature.to_vec()),
        ])],
    )
}

pub fn time_until_next_sign_in(owner: Address) -> Bytes {
    let selector = ethers::utils::id(TIME_UNTIL_NEXT_SIGN_IN);
    with_selector(selector, &[Token::Address(owner)])
}

pub fn decode_uint(output: &[u8]) -> Result<U256> {
    let tokens = abi::decode(&[ParamType::Uint(256)], output).context("Failed to decode uint256")?;
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .context("Empty uint256 output")
}
