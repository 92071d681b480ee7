//! Discount codes and their resolution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CommerceError;

/// A percentage discount code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountCode {
    /// Code customers enter (e.g., "SAVE10").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Fraction of the subtotal taken off, in [0, 1).
    pub rate: Decimal,
    /// Whether the code can currently be used.
    #[serde(default = "default_active")]
    pub active: bool,
    /// When the code stops being accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl DiscountCode {
    /// Create a percentage discount (`percent` of 10 means 10% off).
    pub fn percentage(code: impl Into<String>, name: impl Into<String>, percent: u32) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            rate: Decimal::new(i64::from(percent), 2),
            active: true,
            expires_at: None,
        }
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Check the rate is in [0, 1) and the code is non-empty.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.code.trim().is_empty() {
            return Err(CommerceError::ValidationError(
                "discount code must not be empty".into(),
            ));
        }
        if self.rate < Decimal::ZERO || self.rate >= Decimal::ONE {
            return Err(CommerceError::ValidationError(format!(
                "discount {} rate {} is outside [0, 1)",
                self.code, self.rate
            )));
        }
        Ok(())
    }

    /// Check if the code is usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |ends| now <= ends)
    }

    /// Whether `input` names this code (trimmed, case-insensitive).
    pub fn matches(&self, input: &str) -> bool {
        self.code.trim().eq_ignore_ascii_case(input.trim())
    }
}

/// The set of codes a shop accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct DiscountCodes {
    codes: Vec<DiscountCode>,
}

impl DiscountCodes {
    pub fn new(codes: Vec<DiscountCode>) -> Self {
        Self { codes }
    }

    pub fn codes(&self) -> &[DiscountCode] {
        &self.codes
    }

    /// Look up a code that is usable right now.
    pub fn resolve(&self, input: &str) -> Result<&DiscountCode, CommerceError> {
        self.resolve_at(input, Utc::now())
    }

    /// Look up a code that is usable at `now`.
    pub fn resolve_at(&self, input: &str, now: DateTime<Utc>) -> Result<&DiscountCode, CommerceError> {
        let invalid = |reason: &str| CommerceError::InvalidDiscountCode {
            code: input.trim().to_string(),
            reason: reason.to_string(),
        };

        let code = self
            .codes
            .iter()
            .find(|c| c.matches(input))
            .ok_or_else(|| invalid("unknown code"))?;

        if !code.active {
            return Err(invalid("code is not active"));
        }
        if !code.is_valid_at(now) {
            return Err(invalid("code has expired"));
        }
        Ok(code)
    }

    /// Resolve an optional code entry.
    ///
    /// Blank input means no code. An invalid code resolves to a zero rate
    /// with the failure reported, rather than failing the caller.
    pub fn resolve_optional(&self, input: Option<&str>) -> DiscountResolution {
        let Some(input) = input.filter(|s| !s.trim().is_empty()) else {
            return DiscountResolution::None;
        };

        match self.resolve(input) {
            Ok(code) => DiscountResolution::Applied {
                code: code.code.clone(),
                rate: code.rate,
            },
            Err(CommerceError::InvalidDiscountCode { code, reason }) => {
                DiscountResolution::Rejected { code, reason }
            }
            Err(other) => DiscountResolution::Rejected {
                code: input.trim().to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        for (i, code) in self.codes.iter().enumerate() {
            code.validate()?;
            if self.codes[..i].iter().any(|c| c.matches(&code.code)) {
                return Err(CommerceError::ValidationError(format!(
                    "duplicate discount code: {}",
                    code.code
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of resolving a customer's discount entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountResolution {
    /// No code was entered.
    None,
    /// The code was accepted.
    Applied { code: String, rate: Decimal },
    /// The code was entered but refused; pricing proceeds without it.
    Rejected { code: String, reason: String },
}

impl DiscountResolution {
    /// Rate to price with; zero unless a code was applied.
    pub fn rate(&self) -> Decimal {
        match self {
            DiscountResolution::Applied { rate, .. } => *rate,
            _ => Decimal::ZERO,
        }
    }

    /// The accepted code, if any.
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            DiscountResolution::Applied { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, DiscountResolution::Rejected { .. })
    }
}
