use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, the value the gateway
/// returns as `razorpay_signature` for a completed payment.
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> Result<String, PaymentError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidKey)?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Exact comparison against the recomputed digest. No case folding, no prefix matches.
pub fn verify(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool, PaymentError> {
    Ok(sign(secret, order_id, payment_id)? == signature)
}
