use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest and largest fee that is submitted, in tenths.
const MIN_FEE_TENTHS: u32 = 10;
const MAX_FEE_TENTHS: u32 = 200;

/// Largest difference between a read back fee and the submitted one that still counts as equal.
const FEE_TOLERANCE: f64 = 1e-6;

/// A monthly fee with one decimal place, stored as a whole number of tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fee {
    tenths: u32,
}

impl Fee {
    pub fn from_tenths(tenths: u32) -> Self {
        Self { tenths }
    }

    /// A random fee between 1.0 and 20.0 inclusive.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_tenths(rng.gen_range(MIN_FEE_TENTHS..=MAX_FEE_TENTHS))
    }

    pub fn value(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }

    /// Whether a `monthly_fee` read back from the service is this fee.
    ///
    /// Numbers and numeric strings are accepted and must equal the fee once parsed. Only float
    /// representation noise below [FEE_TOLERANCE] is ignored, so `15.54` does not match `15.5`.
    pub fn matches(&self, monthly_fee: &serde_json::Value) -> bool {
        let value = match monthly_fee {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match value {
            Some(value) if value.is_finite() => (value - self.value()).abs() < FEE_TOLERANCE,
            _ => false,
        }
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

#[derive(Debug, Serialize)]
pub struct AdjustmentRequest {
    pub new_fee: f64,
}

/// The fields of an account that the verification reads.
#[derive(Debug, Deserialize)]
pub struct AccountResponse {
    pub monthly_fee: serde_json::Value,
}

/// Progress of a single adjustment.
///
/// `Start -> AdjustSent -> AdjustAccepted -> Wait -> Verify -> Verified | Mismatch`, or
/// `AdjustSent -> AdjustRejected` when the service refuses the adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentState {
    Start,
    AdjustSent { fee: Fee },
    AdjustRejected { status: u16 },
    AdjustAccepted { fee: Fee },
    Wait { fee: Fee },
    Verify { fee: Fee },
    Verified,
    Mismatch,
}

impl AdjustmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AdjustmentState::AdjustRejected { .. }
                | AdjustmentState::Verified
                | AdjustmentState::Mismatch
        )
    }

    /// The state after the service answered the adjustment with `status`.
    pub fn on_adjust_response(fee: Fee, status: u16) -> Self {
        match status {
            200 | 204 => AdjustmentState::AdjustAccepted { fee },
            status => AdjustmentState::AdjustRejected { status },
        }
    }
}
