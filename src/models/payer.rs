//! Payer account model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PayerId, PhoneNumber};

/// An account that can be credited by confirmed payments.
///
/// The balance is only ever incremented through reconciliation, and at
/// most once per confirmed payment; callbacks are matched to a payer by
/// the phone number carried in the callback metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    /// Unique identifier.
    pub id: PayerId,
    /// Registered phone number.
    pub phone: PhoneNumber,
    /// Display name.
    pub name: String,
    /// Running balance in the gateway's currency unit.
    pub balance: Decimal,
}

impl Payer {
    /// Creates a payer with a zero starting balance.
    #[inline]
    #[must_use]
    pub fn new(id: PayerId, phone: PhoneNumber, name: String) -> Self {
        Self {
            id,
            phone,
            name,
            balance: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_payer_starts_at_zero() {
        let payer = Payer::new(
            PayerId::new(1_i64),
            PhoneNumber::new("254712345678").unwrap(),
            "Jane Student".to_owned(),
        );
        assert_eq!(payer.balance, Decimal::ZERO);
    }
}
