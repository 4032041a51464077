//! # Callback Authentication
//!
//! Gateway callbacks arrive without a user session. Each callback URL handed
//! to the gateway carries `sig = hex(HMAC-SHA256(secret, "<route>:<tran_id>"))`,
//! and the success handler refuses to touch an order unless the signature
//! matches both the success route and the `tran_id` in the callback body.
//! The shopper's browser sees the fail and cancel URLs, so their signatures
//! must never be accepted on the success route.

use crate::error::{CommerceError, CommerceResult};
use crate::order::OrderId;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TRANSACTION_PREFIX: &str = "txn_";

/// Minimum secret length accepted at startup
pub const MIN_SECRET_LEN: usize = 16;

/// `txn_<order id>` correlation between a gateway session and an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionId(OrderId);

impl TransactionId {
    pub fn for_order(order_id: OrderId) -> Self {
        Self(order_id)
    }

    pub fn order_id(&self) -> OrderId {
        self.0
    }

    /// Strict parse: exactly `txn_` followed by decimal digits.
    pub fn parse(raw: &str) -> CommerceResult<Self> {
        let malformed = || CommerceError::MalformedTransactionId(raw.to_string());
        let digits = raw.strip_prefix(TRANSACTION_PREFIX).ok_or_else(malformed)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        digits.parse().map(Self).map_err(|_| malformed())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", TRANSACTION_PREFIX, self.0)
    }
}

/// Callback endpoint a signature is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackRoute {
    Success,
    Fail,
    Cancel,
}

impl CallbackRoute {
    /// Path segment under `/api/v1/payment/`
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackRoute::Success => "success",
            CallbackRoute::Fail => "fail",
            CallbackRoute::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for CallbackRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signs and verifies callback URLs with a shared secret
#[derive(Clone)]
pub struct CallbackSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner").finish_non_exhaustive()
    }
}

impl CallbackSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> CommerceResult<Self> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(CommerceError::Configuration(format!(
                "callback secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    pub fn sign(&self, route: CallbackRoute, transaction_id: &str) -> String {
        let message = format!("{}:{}", route, transaction_id);
        compute_hmac_sha256(&self.secret, &message)
    }

    pub fn verify(
        &self,
        route: CallbackRoute,
        transaction_id: &str,
        signature: Option<&str>,
    ) -> CommerceResult<()> {
        let signature = signature.ok_or_else(|| {
            CommerceError::CallbackVerificationFailed("missing signature".to_string())
        })?;
        let expected = self.sign(route, transaction_id);
        if !constant_time_compare(&signature.to_ascii_lowercase(), &expected) {
            return Err(CommerceError::CallbackVerificationFailed(
                "signature mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

fn compute_hmac_sha256(secret: &[u8], message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
