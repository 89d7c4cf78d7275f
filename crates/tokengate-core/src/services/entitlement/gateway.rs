//! Payment verification gateways
//!
//! The transition manager never trusts a client-supplied payment id on its
//! own: a gateway must report the payment captured before any plan change.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::catalog::PlanConfig;
use crate::config::RazorpayCredentials;
use crate::error::{Error, Result};

const RAZORPAY_API: &str = "https://api.razorpay.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MOCK_ORDER_PREFIX: &str = "mock_order_";

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// Types
// ============================================================================

/// What the gateway knows about a payment or order
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCapture {
    pub payment_id: String,
    /// Ledger key for the capture. A payment made against an order
    /// reports that order, so every id naming it lands on one record.
    pub order_id: String,
    pub captured: bool,
    /// Major currency units (rupees, not paise)
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub method: Option<String>,
}

impl PaymentCapture {
    fn captured(payment_id: &str) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            order_id: payment_id.to_string(),
            captured: true,
            amount: None,
            currency: None,
            method: None,
        }
    }

    fn not_captured(payment_id: &str) -> Self {
        Self {
            captured: false,
            ..Self::captured(payment_id)
        }
    }
}

/// An order opened with the gateway for client-side checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    /// Public key the checkout widget needs; absent for mock orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// External payment confirmation
#[async_trait]
pub trait PaymentVerificationGateway: Send + Sync {
    /// Short identifier used in logs and as the recorded payment method
    fn name(&self) -> &'static str;

    /// Report whether `payment_id` (a payment or an order id) is captured
    async fn confirm(&self, payment_id: &str) -> Result<PaymentCapture>;

    /// Whether an upgrade must complete a checkout opened by the same user.
    /// Only gateways whose confirmations an operator vouches for opt out.
    fn requires_checkout(&self) -> bool {
        true
    }

    /// Open an order for `plan`
    async fn create_order(&self, plan: &PlanConfig, receipt: &str) -> Result<GatewayOrder>;

    /// Check the checkout callback signature
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// HMAC-SHA256 of `"{order_id}|{payment_id}"`, hex encoded
pub fn checkout_signature(secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// Razorpay
// ============================================================================

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

pub(crate) fn to_minor_units(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

/// Razorpay REST gateway
pub struct RazorpayGateway {
    client: reqwest::Client,
    credentials: RazorpayCredentials,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(credentials: RazorpayCredentials) -> Result<Self> {
        Self::with_base_url(credentials, RAZORPAY_API)
    }

    pub fn with_base_url(credentials: RazorpayCredentials, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("[entitlement:gateway] GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.key_id, Some(&self.credentials.key_secret))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::gateway(format!("Razorpay returned {}: {}", status, body)));
        }

        Ok(Some(response.json::<T>().await?))
    }
}

#[async_trait]
impl PaymentVerificationGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn confirm(&self, payment_id: &str) -> Result<PaymentCapture> {
        if payment_id.starts_with("order_") {
            let Some(order) = self
                .get_json::<RazorpayOrder>(&format!("/v1/orders/{}", payment_id))
                .await?
            else {
                return Ok(PaymentCapture::not_captured(payment_id));
            };

            return Ok(PaymentCapture {
                payment_id: order.id.clone(),
                order_id: order.id,
                captured: order.status == "paid",
                amount: Some(to_major_units(order.amount)),
                currency: Some(order.currency),
                method: None,
            });
        }

        let Some(payment) = self
            .get_json::<RazorpayPayment>(&format!("/v1/payments/{}", payment_id))
            .await?
        else {
            return Ok(PaymentCapture::not_captured(payment_id));
        };

        log::info!(
            "[entitlement:gateway] Razorpay payment {} is {}",
            payment.id,
            payment.status
        );
        Ok(PaymentCapture {
            order_id: payment.order_id.unwrap_or_else(|| payment.id.clone()),
            payment_id: payment.id,
            captured: payment.status == "captured",
            amount: Some(to_major_units(payment.amount)),
            currency: Some(payment.currency),
            method: payment.method,
        })
    }

    async fn create_order(&self, plan: &PlanConfig, receipt: &str) -> Result<GatewayOrder> {
        let request = CreateOrderRequest {
            amount: to_minor_units(plan.price),
            currency: &plan.currency,
            receipt,
            payment_capture: 1,
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.credentials.key_id, Some(&self.credentials.key_secret))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::gateway(format!("Order creation failed ({}): {}", status, body)));
        }

        let order: RazorpayOrder = response.json().await?;
        log::info!(
            "[entitlement:gateway] Created Razorpay order {} for {} ({})",
            order.id,
            plan.plan_id,
            order.status
        );

        Ok(GatewayOrder {
            order_id: order.id,
            amount: to_major_units(order.amount),
            currency: order.currency,
            key_id: Some(self.credentials.key_id.clone()),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        match checkout_signature(&self.credentials.key_secret, order_id, payment_id) {
            Ok(expected) => expected.eq_ignore_ascii_case(signature.trim()),
            Err(e) => {
                log::error!("[entitlement:gateway] Signature check failed: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// Development
// ============================================================================

/// Stand-in used when no Razorpay credentials are configured.
///
/// Confirms exactly the orders it issued, so a guessed id never upgrades.
#[derive(Default)]
pub struct DevelopmentGateway {
    issued: Mutex<HashSet<String>>,
}

impl DevelopmentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_issued(&self, order_id: &str) -> bool {
        self.issued
            .lock()
            .map(|issued| issued.contains(order_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl PaymentVerificationGateway for DevelopmentGateway {
    fn name(&self) -> &'static str {
        "development"
    }

    async fn confirm(&self, payment_id: &str) -> Result<PaymentCapture> {
        if self.is_issued(payment_id) {
            Ok(PaymentCapture::captured(payment_id))
        } else {
            log::warn!("[entitlement:gateway] Unknown mock order {}", payment_id);
            Ok(PaymentCapture::not_captured(payment_id))
        }
    }

    async fn create_order(&self, plan: &PlanConfig, receipt: &str) -> Result<GatewayOrder> {
        let order_id = format!("{}{}", MOCK_ORDER_PREFIX, uuid::Uuid::new_v4().simple());
        self.issued
            .lock()
            .map_err(|_| Error::internal("Mock order registry poisoned"))?
            .insert(order_id.clone());

        log::warn!(
            "[entitlement:gateway] Razorpay not configured, issued mock order {} ({})",
            order_id,
            receipt
        );
        Ok(GatewayOrder {
            order_id,
            amount: plan.price,
            currency: plan.currency.clone(),
            key_id: None,
        })
    }

    fn verify_signature(&self, order_id: &str, _payment_id: &str, _signature: &str) -> bool {
        self.is_issued(order_id)
    }
}

// ============================================================================
// Operator
// ============================================================================

/// Accepts every payment id. For administrative tooling where an operator
/// has already confirmed the payment out of band.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperatorConfirmedGateway;

#[async_trait]
impl PaymentVerificationGateway for OperatorConfirmedGateway {
    fn name(&self) -> &'static str {
        "operator"
    }

    async fn confirm(&self, payment_id: &str) -> Result<PaymentCapture> {
        Ok(PaymentCapture {
            method: Some("manual".to_string()),
            ..PaymentCapture::captured(payment_id)
        })
    }

    fn requires_checkout(&self) -> bool {
        false
    }

    async fn create_order(&self, _plan: &PlanConfig, _receipt: &str) -> Result<GatewayOrder> {
        Err(Error::validation("Operator gateway cannot open orders"))
    }

    fn verify_signature(&self, _order_id: &str, _payment_id: &str, _signature: &str) -> bool {
        true
    }
}
