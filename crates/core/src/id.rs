//! Strongly-typed identifiers used across the storefront.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier of a catalog product (e.g. `"P1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

/// Identifier of a placed order (e.g. `"OD1760601234567042"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

macro_rules! impl_string_newtype {
    ($t:ty) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

impl_string_newtype!(ProductId);
impl_string_newtype!(OrderId);

impl OrderId {
    /// Generate an order id from the placement instant plus a random suffix.
    ///
    /// Format: `OD{unix_millis}{0..=999}`. Ids are roughly time-ordered; the
    /// suffix separates orders placed within the same millisecond.
    pub fn generate<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u32 = rng.gen_range(0..1000);
        Self(format!("OD{}{}", now.timestamp_millis(), suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_order_id_carries_prefix_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let id = OrderId::generate(now, &mut rng);
        let expected_prefix = format!("OD{}", now.timestamp_millis());

        assert!(id.as_str().starts_with(&expected_prefix));
        let suffix = &id.as_str()[expected_prefix.len()..];
        let suffix: u32 = suffix.parse().unwrap();
        assert!(suffix < 1000);
    }

    #[test]
    fn product_id_is_transparent_in_json() {
        let id = ProductId::from("P1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P1\"");
    }
}
