//! EIP-712 order signing for the Polymarket CTF Exchange.
//!
//! Orders are EIP-712 typed-data signatures over the exchange's `Order`
//! struct under the "Polymarket CTF Exchange" v1 domain on Polygon. This
//! strategy only ever buys, so the builder always produces BUY orders with
//! EOA signatures.

use alloy_primitives::{keccak256, Address, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, SolStruct};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use updown_arb_core::VenueError;

/// Environment variable holding the hex signing key.
pub const PRIVATE_KEY_ENV: &str = "POLYMARKET_PRIVATE_KEY";

/// CTF Exchange contract address on Polygon mainnet.
const CTF_EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";

/// Zero address: public order, any taker.
const PUBLIC_TAKER: &str = "0x0000000000000000000000000000000000000000";

/// USDC and CTF tokens both use 6 decimals.
const AMOUNT_SCALE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Order lifetime before on-chain expiration.
const ORDER_TTL_SECS: i64 = 300;

sol! {
    #[derive(Debug)]
    struct Order {
        uint256 salt;
        address maker;
        address signer;
        address taker;
        uint256 tokenId;
        uint256 makerAmount;
        uint256 takerAmount;
        uint256 expiration;
        uint256 nonce;
        uint256 feeRateBps;
        uint8 side;
        uint8 signatureType;
    }
}

/// Wire shape of a signed order as the CLOB API expects it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrder {
    pub salt: String,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    pub token_id: String,
    pub maker_amount: String,
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    pub fee_rate_bps: String,
    pub side: u8,
    pub signature_type: u8,
    pub signature: String,
}

/// Builds and signs BUY orders for one wallet.
pub struct OrderSigner {
    key: PrivateKeySigner,
    funder: Address,
    chain_id: u64,
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderSigner")
            .field("funder", &self.funder)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl OrderSigner {
    /// Creates a signer from a hex private key.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Configuration` when the key or funder address
    /// does not parse.
    pub fn new(private_key: &str, funder: &str, chain_id: u64) -> Result<Self, VenueError> {
        let trimmed = private_key.trim();
        let hex_key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let key: PrivateKeySigner = hex_key
            .parse()
            .map_err(|e| VenueError::Configuration(format!("invalid private key: {e}")))?;
        let funder: Address = funder
            .parse()
            .map_err(|e| VenueError::Configuration(format!("invalid funder address: {e}")))?;

        Ok(Self {
            key,
            funder,
            chain_id,
        })
    }

    /// Creates a signer with the key read from the environment.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::Configuration` when the variable is missing or
    /// the key is invalid.
    pub fn from_env(funder: &str, chain_id: u64) -> Result<Self, VenueError> {
        let key = std::env::var(PRIVATE_KEY_ENV)
            .map_err(|_| VenueError::Configuration(format!("missing env var {PRIVATE_KEY_ENV}")))?;
        Self::new(&key, funder, chain_id)
    }

    /// Builds, signs, and serializes a BUY order for `size` shares of
    /// `token_id` at `price`.
    ///
    /// Amounts are scaled to 6-decimal raw units: the maker amount is the
    /// USDC cost (`price * size`), the taker amount is the share count.
    ///
    /// # Errors
    ///
    /// Returns `VenueError::InvalidOrder` for non-positive amounts and
    /// `VenueError::Signing` when signing fails.
    pub fn build_buy_order(
        &self,
        token_id: &str,
        size: Decimal,
        price: Decimal,
    ) -> Result<ApiOrder, VenueError> {
        let token: U256 = token_id
            .parse()
            .map_err(|e| VenueError::InvalidOrder(format!("invalid token ID {token_id}: {e}")))?;

        let (maker_amount, taker_amount) = scale_amounts(size, price)?;
        let salt = U256::from(rand::random::<u64>());
        let expiration = U256::from(
            (Utc::now().timestamp() + ORDER_TTL_SECS)
                .unsigned_abs(),
        );

        let order = Order {
            salt,
            maker: self.funder,
            signer: self.funder,
            taker: PUBLIC_TAKER.parse().map_err(|e| {
                VenueError::Signing(format!("taker address: {e}"))
            })?,
            tokenId: token,
            makerAmount: maker_amount,
            takerAmount: taker_amount,
            expiration,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: 0, // BUY
            signatureType: 0, // EOA
        };

        let signature = self.sign(&order)?;

        Ok(ApiOrder {
            salt: order.salt.to_string(),
            maker: format!("{:#x}", order.maker),
            signer: format!("{:#x}", order.signer),
            taker: format!("{:#x}", order.taker),
            token_id: order.tokenId.to_string(),
            maker_amount: order.makerAmount.to_string(),
            taker_amount: order.takerAmount.to_string(),
            expiration: order.expiration.to_string(),
            nonce: order.nonce.to_string(),
            fee_rate_bps: order.feeRateBps.to_string(),
            side: order.side,
            signature_type: order.signatureType,
            signature,
        })
    }

    /// Returns the funder address, 0x-prefixed.
    #[must_use]
    pub fn funder_address(&self) -> String {
        format!("{:#x}", self.funder)
    }

    fn sign(&self, order: &Order) -> Result<String, VenueError> {
        let domain = alloy_sol_types::Eip712Domain {
            name: Some("Polymarket CTF Exchange".into()),
            version: Some("1".into()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(
                CTF_EXCHANGE
                    .parse()
                    .map_err(|e| VenueError::Signing(format!("exchange address: {e}")))?,
            ),
            salt: None,
        };

        // keccak256("\x19\x01" || domainSeparator || structHash)
        let domain_separator = domain.hash_struct();
        let struct_hash = order.eip712_hash_struct();
        let signing_hash = keccak256(
            [
                &[0x19, 0x01],
                domain_separator.as_slice(),
                struct_hash.as_slice(),
            ]
            .concat(),
        );

        let signature = self
            .key
            .sign_hash_sync(&signing_hash)
            .map_err(|e| VenueError::Signing(e.to_string()))?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

/// Scales share size and price into 6-decimal raw maker/taker amounts.
fn scale_amounts(size: Decimal, price: Decimal) -> Result<(U256, U256), VenueError> {
    if size <= Decimal::ZERO || price <= Decimal::ZERO {
        return Err(VenueError::InvalidOrder(format!(
            "size and price must be positive, got size={size} price={price}"
        )));
    }

    let cost = (price * size * AMOUNT_SCALE).trunc();
    let shares = (size * AMOUNT_SCALE).trunc();

    let maker = cost
        .to_u128()
        .ok_or_else(|| VenueError::InvalidOrder(format!("cost out of range: {cost}")))?;
    let taker = shares
        .to_u128()
        .ok_or_else(|| VenueError::InvalidOrder(format!("size out of range: {shares}")))?;

    Ok((U256::from(maker), U256::from(taker)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // Well-known throwaway test key.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_FUNDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn signer() -> OrderSigner {
        OrderSigner::new(TEST_KEY, TEST_FUNDER, 137).unwrap()
    }

    #[test]
    fn test_scale_amounts_six_decimals() {
        let (maker, taker) = scale_amounts(dec!(20), dec!(0.50)).unwrap();
        assert_eq!(maker, U256::from(10_000_000u64)); // $10 cost
        assert_eq!(taker, U256::from(20_000_000u64)); // 20 shares
    }

    #[test]
    fn test_scale_amounts_rejects_non_positive() {
        assert!(scale_amounts(dec!(0), dec!(0.50)).is_err());
        assert!(scale_amounts(dec!(20), dec!(-0.1)).is_err());
    }

    #[test]
    fn test_signed_order_shape() {
        let order = signer()
            .build_buy_order("98765", dec!(20), dec!(0.30))
            .unwrap();

        assert_eq!(order.side, 0);
        assert_eq!(order.signature_type, 0);
        assert_eq!(order.maker_amount, "6000000");
        assert_eq!(order.taker_amount, "20000000");
        assert_eq!(order.maker.to_lowercase(), TEST_FUNDER.to_lowercase());
        // 0x-prefixed 65-byte signature.
        assert!(order.signature.starts_with("0x"));
        assert_eq!(order.signature.len(), 132);
    }

    #[test]
    fn test_chain_id_changes_signature() {
        let polygon = OrderSigner::new(TEST_KEY, TEST_FUNDER, 137).unwrap();
        let amoy = OrderSigner::new(TEST_KEY, TEST_FUNDER, 80002).unwrap();

        let order = Order {
            salt: U256::from(1u64),
            maker: TEST_FUNDER.parse().unwrap(),
            signer: TEST_FUNDER.parse().unwrap(),
            taker: Address::ZERO,
            tokenId: U256::from(1u64),
            makerAmount: U256::from(1_000_000u64),
            takerAmount: U256::from(2_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: 0,
            signatureType: 0,
        };

        assert_ne!(polygon.sign(&order).unwrap(), amoy.sign(&order).unwrap());
    }

    #[test]
    fn test_invalid_token_id_rejected() {
        let err = signer()
            .build_buy_order("not-a-number", dec!(20), dec!(0.30))
            .unwrap_err();
        assert!(matches!(err, VenueError::InvalidOrder(_)));
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        assert!(OrderSigner::new("zz", TEST_FUNDER, 137).is_err());
    }

    #[test]
    fn test_api_order_serializes_camel_case() {
        let order = signer()
            .build_buy_order("98765", dec!(20), dec!(0.30))
            .unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"tokenId\""));
        assert!(json.contains("\"makerAmount\""));
        assert!(json.contains("\"feeRateBps\""));
        assert!(json.contains("\"signatureType\""));
    }
}
