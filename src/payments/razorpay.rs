use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use super::{signature, CreatePaymentOrder, PaymentError, PaymentGateway, PaymentOrder};
use crate::config::RazorpayConfig;

/// Razorpay REST client
#[derive(Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
}

impl RazorpayGateway {
    pub fn new(config: &RazorpayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/v1/orders", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> String {
        self.key_id.clone()
    }

    #[instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
    async fn create_order(&self, request: CreatePaymentOrder) -> Result<PaymentOrder, PaymentError> {
        if self.key_id.is_empty() || self.key_secret.is_empty() {
            return Err(PaymentError::NotConfigured(
                "Razorpay key id and secret are required".into(),
            ));
        }

        let response = self
            .client
            .post(self.orders_url())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Razorpay order request failed");
                PaymentError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.description)
                .unwrap_or(body);
            error!(status = status.as_u16(), %message, "Razorpay rejected order creation");
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let order = response.json::<PaymentOrder>().await.map_err(|e| {
            error!(error = %e, "Razorpay returned an unreadable order");
            PaymentError::InvalidResponse(e.to_string())
        })?;

        debug!(remote_order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, PaymentError> {
        signature::verify(&self.key_secret, order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: String) -> RazorpayGateway {
        RazorpayGateway::new(&RazorpayConfig {
            key_id: "rzp_test_key".into(),
            key_secret: "rzp_test_secret".into(),
            base_url,
            ..RazorpayConfig::default()
        })
        .unwrap()
    }

    fn request() -> CreatePaymentOrder {
        CreatePaymentOrder {
            amount: 75_000,
            currency: "INR".into(),
            receipt: "receipt_1700000000000".into(),
            payment_capture: 1,
        }
    }

    #[tokio::test]
    async fn creates_order_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(basic_auth("rzp_test_key", "rzp_test_secret"))
            .and(body_partial_json(json!({
                "amount": 75000,
                "currency": "INR",
                "receipt": "receipt_1700000000000",
                "payment_capture": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "order_Nx1",
                "entity": "order",
                "amount": 75000,
                "amount_paid": 0,
                "amount_due": 75000,
                "currency": "INR",
                "receipt": "receipt_1700000000000",
                "status": "created",
                "attempts": 0,
                "notes": [],
                "created_at": 1700000000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = gateway(server.uri()).create_order(request()).await.unwrap();
        assert_eq!(order.id, "order_Nx1");
        assert_eq!(order.amount, 75_000);
        assert_eq!(order.status, "created");
    }

    #[tokio::test]
    async fn surfaces_gateway_error_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "The amount must be atleast INR 1.00"
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(server.uri()).create_order(request()).await.unwrap_err();
        assert_matches!(
            err,
            PaymentError::Rejected { status: 400, ref message } if message.contains("atleast INR 1.00")
        );
    }

    #[tokio::test]
    async fn refuses_to_call_without_credentials() {
        let gw = RazorpayGateway::new(&RazorpayConfig::default()).unwrap();
        assert_matches!(
            gw.create_order(request()).await,
            Err(PaymentError::NotConfigured(_))
        );
    }

    #[test]
    fn verifies_with_key_secret() {
        let gw = gateway("http://localhost".into());
        let sig = signature::sign("rzp_test_secret", "order_abc", "pay_123").unwrap();
        assert!(gw.verify_signature("order_abc", "pay_123", &sig).unwrap());
        assert!(!gw.verify_signature("order_abc", "pay_123", "deadbeef").unwrap());
        assert_eq!(gw.key_id(), "rzp_test_key");
    }
}
