//! JSON encoding and decoding of the persisted escrow record.
//!
//! Decoding is two-staged so callers can tell text that is not JSON at all
//! ([`Error::InvalidFormat`]) from JSON that does not describe an escrow
//! ([`Error::InvalidStructure`]).

use crate::{EscrowTransaction, Error};

pub fn decode_record(raw: &str) -> Result<EscrowTransaction, Error> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| Error::InvalidFormat)?;
    let record: EscrowTransaction =
        serde_json::from_value(value).map_err(|err| Error::InvalidStructure(err.to_string()))?;
    record.validate().map_err(Error::InvalidStructure)?;
    Ok(record)
}

pub fn encode_record(record: &EscrowTransaction) -> Result<String, Error> {
    serde_json::to_string(record).map_err(|err| Error::Serialization(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EscrowStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample() -> EscrowTransaction {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        EscrowTransaction {
            id: "escrow_1741944413000_deadbeef".into(),
            buyer_id: "b1".into(),
            seller_id: "s1".into(),
            account_id: "a1".into(),
            listing_title: "PUBG Conqueror".into(),
            amount: dec!(45000),
            status: EscrowStatus::Disputed,
            timestamp: at.timestamp_millis(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_encode_then_decode() {
        let record = sample();
        let raw = encode_record(&record).unwrap();
        assert_eq!(decode_record(&raw).unwrap(), record);
    }

    #[test]
    fn test_decode_not_json() {
        assert_eq!(decode_record("not json {"), Err(Error::InvalidFormat));
        assert_eq!(decode_record(""), Err(Error::InvalidFormat));
    }

    #[test]
    fn test_decode_wrong_shape() {
        for raw in ["42", "[]", "null", r#"{"id":"x"}"#] {
            assert!(matches!(
                decode_record(raw),
                Err(Error::InvalidStructure(_))
            ));
        }
    }

    #[test]
    fn test_decode_missing_status_names_field() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value.as_object_mut().unwrap().remove("status");
        match decode_record(&value.to_string()) {
            Err(Error::InvalidStructure(detail)) => assert!(detail.contains("status")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_decode_runs_invariant_checks() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["amount"] = serde_json::json!(0);
        assert!(matches!(
            decode_record(&value.to_string()),
            Err(Error::InvalidStructure(_))
        ));
    }
}
