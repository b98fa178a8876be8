//! UPI payment handoff.
//!
//! No payment API is called. A deep link carrying the merchant payload and the
//! payable amount is handed to whatever the platform uses to open external
//! links, and nothing is awaited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopfront_core::{Money, OrderId};

/// Payment apps offered on the payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpiApp {
    PhonePe,
    Paytm,
    GooglePay,
    OtherUpi,
}

impl UpiApp {
    pub const ALL: [UpiApp; 4] = [UpiApp::PhonePe, UpiApp::Paytm, UpiApp::GooglePay, UpiApp::OtherUpi];

    /// URI scheme the app registers for.
    pub fn scheme(&self) -> &'static str {
        match self {
            UpiApp::PhonePe => "phonepe",
            UpiApp::Paytm => "paytmmp",
            UpiApp::GooglePay | UpiApp::OtherUpi => "upi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpiApp::PhonePe => "PhonePe",
            UpiApp::Paytm => "Paytm",
            UpiApp::GooglePay => "Google Pay",
            UpiApp::OtherUpi => "Other UPI apps",
        }
    }
}

impl core::fmt::Display for UpiApp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

const ACCEPTED_SCHEMES: [&str; 4] = ["upi", "phonepe", "paytmmp", "gpay"];

/// `{scheme}://pay?{merchant_payload}&am={amount}`
pub fn build_payment_uri(app: UpiApp, merchant_payload: &str, amount: Money) -> String {
    format!(
        "{}://pay?{}&am={}",
        app.scheme(),
        merchant_payload,
        amount.upi_amount()
    )
}

/// Whether `uri` uses one of the UPI app schemes.
pub fn is_valid_upi_uri(uri: &str) -> bool {
    uri.split_once(':')
        .is_some_and(|(scheme, _)| ACCEPTED_SCHEMES.contains(&scheme))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("refusing to open non-UPI link: {0}")]
    InvalidUri(String),

    #[error("payment app could not be opened: {0}")]
    LaunchFailed(String),
}

/// Platform handler for external links.
pub trait PaymentLauncher {
    /// Hand `uri` off. `Ok` means the handoff was attempted, not that payment happened.
    fn open(&mut self, uri: &str) -> Result<(), HandoffError>;
}

impl<L: PaymentLauncher + ?Sized> PaymentLauncher for &mut L {
    fn open(&mut self, uri: &str) -> Result<(), HandoffError> {
        (**self).open(uri)
    }
}

impl<L: PaymentLauncher + ?Sized> PaymentLauncher for Box<L> {
    fn open(&mut self, uri: &str) -> Result<(), HandoffError> {
        (**self).open(uri)
    }
}

/// Tracking record logged for every handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    /// Sequence number of the handoff within the current order.
    pub attempt: u64,
    pub order_id: OrderId,
    pub method: UpiApp,
    pub amount: Money,
    pub uri: String,
    pub timestamp: DateTime<Utc>,
}
