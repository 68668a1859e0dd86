use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    InEscrow,
    Released,
    Disputed,
    Refunded,
}

impl EscrowStatus {
    pub const ALL: [EscrowStatus; 4] = [
        EscrowStatus::InEscrow,
        EscrowStatus::Released,
        EscrowStatus::Disputed,
        EscrowStatus::Refunded,
    ];

    /// Name used in the persisted JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowStatus::InEscrow => "in_escrow",
            EscrowStatus::Released => "released",
            EscrowStatus::Disputed => "disputed",
            EscrowStatus::Refunded => "refunded",
        }
    }

    /// Human-readable label for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            EscrowStatus::InEscrow => "In Escrow",
            EscrowStatus::Released => "Released",
            EscrowStatus::Disputed => "Disputed",
            EscrowStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscrowStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EscrowStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

/// Maps a raw status string (or its absence) to a display label.
/// Unrecognised values fall back to `"Unknown"`.
pub fn status_label(status: Option<&str>) -> &'static str {
    status
        .and_then(|s| s.parse::<EscrowStatus>().ok())
        .map_or("Unknown", |status| status.label())
}

/// The single escrow record kept by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EscrowTransaction {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub account_id: String,
    pub listing_title: String,
    #[serde(with = "amount")]
    pub amount: Decimal,
    pub status: EscrowStatus,
    /// Creation instant in epoch milliseconds.
    pub timestamp: i64,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl EscrowTransaction {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_string());
        }
        if self.amount <= Decimal::ZERO {
            return Err(format!("amount must be positive, got {}", self.amount));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == EscrowStatus::InEscrow
    }
}

/// Caller-supplied fields for a new escrow. Status, id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEscrow {
    pub buyer_id: String,
    pub seller_id: String,
    pub account_id: String,
    pub listing_title: String,
    #[serde(with = "amount::option")]
    pub amount: Option<Decimal>,
}

impl NewEscrow {
    pub fn new(
        buyer_id: impl Into<String>,
        seller_id: impl Into<String>,
        account_id: impl Into<String>,
        listing_title: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            account_id: account_id.into(),
            listing_title: listing_title.into(),
            amount: Some(amount),
        }
    }

    /// Returns the validated amount, or the reason the input is rejected.
    /// All missing fields are reported together.
    pub fn validate(&self) -> Result<Decimal, Error> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("buyerId", &self.buyer_id),
            ("sellerId", &self.seller_id),
            ("accountId", &self.account_id),
            ("listingTitle", &self.listing_title),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        match self.amount {
            Some(amount) if amount <= Decimal::ZERO => Err(Error::InvalidAmount),
            Some(amount) if !amount::round_trips(&amount) => Err(Error::AmountPrecision(amount)),
            Some(amount) => Ok(amount),
            None => Err(Error::InvalidAmount),
        }
    }
}

/// Amounts are persisted as plain JSON numbers; strings are rejected.
mod amount {
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    use rust_decimal::Decimal;
    use serde::de;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if amount.fract().is_zero() {
            if let Some(whole) = amount.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        let value = amount
            .to_f64()
            .ok_or_else(|| S::Error::custom("amount out of range"))?;
        serializer.serialize_f64(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_number(f64::deserialize(deserializer)?)
    }

    /// True if `amount` reads back unchanged after being written as a JSON
    /// number.
    pub fn round_trips(amount: &Decimal) -> bool {
        amount.to_f64().and_then(Decimal::from_f64).as_ref() == Some(amount)
    }

    fn from_number<E: de::Error>(value: f64) -> Result<Decimal, E> {
        if !value.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        Decimal::from_f64(value).ok_or_else(|| E::custom("amount out of range"))
    }

    /// Same encoding for an amount that may be absent.
    pub mod option {
        use rust_decimal::Decimal;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(amount: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match amount {
                Some(amount) => super::serialize(amount, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<f64>::deserialize(deserializer)?
                .map(super::from_number::<D::Error>)
                .transpose()
        }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-01-01T10:00:00.000Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
