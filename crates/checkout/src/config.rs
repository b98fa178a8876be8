//! Checkout timing and fee configuration.

use std::str::FromStr;

use chrono::Duration;

use shopfront_cart::FeePolicy;
use shopfront_core::Money;

pub const RETURN_GRACE_ENV: &str = "SHOPFRONT_RETURN_GRACE_SECS";
pub const FALLBACK_TIMEOUT_ENV: &str = "SHOPFRONT_FALLBACK_TIMEOUT_SECS";
pub const PAYMENT_WINDOW_ENV: &str = "SHOPFRONT_PAYMENT_WINDOW_SECS";
pub const PLACEMENT_CLEAR_DELAY_ENV: &str = "SHOPFRONT_PLACEMENT_CLEAR_DELAY_MS";
pub const SALE_COUNTDOWN_ENV: &str = "SHOPFRONT_SALE_COUNTDOWN_SECS";
pub const DELIVERY_CHARGES_ENV: &str = "SHOPFRONT_DELIVERY_CHARGES";
pub const PACKAGING_FEE_ENV: &str = "SHOPFRONT_PACKAGING_FEE";

/// Fixed merchant part of every UPI link. The amount is appended per order.
pub const DEFAULT_MERCHANT_PAYLOAD: &str = "ver=01&mode=01&pa=netc.34161FA820328AA2D24366C0@mairtel&purpose=00&mc=4784&pn=NETC%20FASTag%20Recharge&orgid=159753&qrMedium=04";

/// Timers of the payment-wait screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Delay after the page comes back to the foreground before settling.
    pub return_grace: Duration,
    /// Unconditional settlement deadline.
    pub fallback_timeout: Duration,
    /// Length of the visible countdown.
    pub payment_window: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            return_grace: Duration::seconds(28),
            fallback_timeout: Duration::seconds(123),
            payment_window: Duration::seconds(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub monitor: MonitorConfig,
    /// Delay between placing an order and clearing the cart, so the
    /// confirmation view can still show pre-clear totals.
    pub placement_clear_delay: Duration,
    pub sale_countdown: Duration,
    pub fees: FeePolicy,
    pub merchant_payload: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            placement_clear_delay: Duration::milliseconds(3_000),
            sale_countdown: Duration::seconds(3_600),
            fees: FeePolicy::FREE,
            merchant_payload: DEFAULT_MERCHANT_PAYLOAD.to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Defaults overridden by `SHOPFRONT_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parse_var::<i64, _>(&lookup, key)
                .filter(|v| *v > 0)
                .and_then(Duration::try_seconds)
                .unwrap_or(default)
        };

        let monitor = MonitorConfig {
            return_grace: secs(RETURN_GRACE_ENV, defaults.monitor.return_grace),
            fallback_timeout: secs(FALLBACK_TIMEOUT_ENV, defaults.monitor.fallback_timeout),
            payment_window: secs(PAYMENT_WINDOW_ENV, defaults.monitor.payment_window),
        };
        let placement_clear_delay = parse_var::<i64, _>(&lookup, PLACEMENT_CLEAR_DELAY_ENV)
            .filter(|v| *v >= 0)
            .and_then(Duration::try_milliseconds)
            .unwrap_or(defaults.placement_clear_delay);

        let fee = |key: &str, default: Money| {
            parse_var::<Money, _>(&lookup, key)
                .filter(|m| !m.amount().is_sign_negative())
                .unwrap_or(default)
        };
        let fees = FeePolicy::new(
            fee(DELIVERY_CHARGES_ENV, defaults.fees.delivery_charges),
            fee(PACKAGING_FEE_ENV, defaults.fees.packaging_fee),
        );

        Self {
            monitor,
            placement_clear_delay,
            sale_countdown: secs(SALE_COUNTDOWN_ENV, defaults.sale_countdown),
            fees,
            merchant_payload: defaults.merchant_payload,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value; using default");
            None
        }
    }
}
