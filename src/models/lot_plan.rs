//! Lot/plan identifier parsing.
//!
//! Users type cadastral identifiers in the form their state's land registry
//! prints them:
//!
//! - **QLD**: `3RP123456` (lot digits followed by a plan code)
//! - **NSW**: `43/DP12345` (lot/plan) or `43/1/DP12345` (lot/section/plan)
//!
//! The presence of a `/` routes an identifier to NSW; everything else must
//! match the QLD pattern.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// QLD lot/plan pattern, e.g. `3RP123456`, `12SP789`, `101CP1234`.
static QLD_LOT_PLAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Z]{1,3}[0-9]+)$").expect("valid QLD pattern"));

/// State land registry an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    /// Queensland
    #[serde(rename = "QLD")]
    Qld,
    /// New South Wales
    #[serde(rename = "NSW")]
    Nsw,
}

impl Jurisdiction {
    /// Short code used on the wire (`"QLD"` / `"NSW"`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Qld => "QLD",
            Self::Nsw => "NSW",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Reasons a typed identifier cannot be routed to a lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Input was blank after trimming.
    #[error("identifier is empty")]
    Empty,
    /// Input contained a `/` but not two or three segments.
    #[error("'{0}' has too many '/' separated parts")]
    TooManyParts(String),
    /// A segment of a NSW identifier was blank.
    #[error("'{0}' is missing a lot or plan")]
    MissingPart(String),
    /// NSW plan label carried no plan number.
    #[error("plan '{0}' has no plan number")]
    NoPlanNumber(String),
    /// Input matched neither format.
    #[error("'{0}' is not a recognised lot/plan code")]
    Unrecognised(String),
}

/// A parsed, upper-cased lot/plan identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotPlan {
    /// Registry the identifier routes to.
    pub jurisdiction: Jurisdiction,
    /// Lot number as typed.
    pub lot: String,
    /// NSW section number, if one was given.
    pub section: Option<String>,
    /// Plan code or label (e.g. `RP123456`, `DP12345`).
    pub plan: String,
}

impl LotPlan {
    /// Parses a raw user identifier.
    ///
    /// ```
    /// use parcelview::models::{Jurisdiction, LotPlan};
    ///
    /// let qld = LotPlan::parse(" 3rp123456 ").unwrap();
    /// assert_eq!(qld.jurisdiction, Jurisdiction::Qld);
    /// assert_eq!((qld.lot.as_str(), qld.plan.as_str()), ("3", "RP123456"));
    ///
    /// let nsw = LotPlan::parse("43/1/DP12345").unwrap();
    /// assert_eq!(nsw.section.as_deref(), Some("1"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] when the input matches neither format.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let normalized = input.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if normalized.contains('/') {
            return Self::parse_nsw(&normalized);
        }

        let caps = QLD_LOT_PLAN
            .captures(&normalized)
            .ok_or_else(|| IdentifierError::Unrecognised(normalized.clone()))?;

        Ok(Self {
            jurisdiction: Jurisdiction::Qld,
            lot: caps[1].to_string(),
            section: None,
            plan: caps[2].to_string(),
        })
    }

    fn parse_nsw(normalized: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = normalized.split('/').map(str::trim).collect();
        let (lot, section, plan) = match parts.as_slice() {
            [lot, plan] => (*lot, None, *plan),
            [lot, section, plan] => (*lot, Some(*section).filter(|s| !s.is_empty()), *plan),
            _ => return Err(IdentifierError::TooManyParts(normalized.to_string())),
        };

        if lot.is_empty() || plan.is_empty() {
            return Err(IdentifierError::MissingPart(normalized.to_string()));
        }

        let lot_plan = Self {
            jurisdiction: Jurisdiction::Nsw,
            lot: lot.to_string(),
            section: section.map(str::to_string),
            plan: plan.to_string(),
        };
        // Reject early so a bad label never reaches the upstream query.
        lot_plan.plan_number()?;
        Ok(lot_plan)
    }

    /// Digits of the plan label, as the NSW service indexes plans numerically.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::NoPlanNumber`] when the label has no digits.
    pub fn plan_number(&self) -> Result<u64, IdentifierError> {
        let digits: String = self.plan.chars().filter(char::is_ascii_digit).collect();
        digits
            .parse::<u64>()
            .map_err(|_| IdentifierError::NoPlanNumber(self.plan.clone()))
    }

    /// Builds the ArcGIS `where` clause selecting this parcel.
    ///
    /// ```
    /// use parcelview::models::LotPlan;
    ///
    /// let qld = LotPlan::parse("3RP123456").unwrap();
    /// assert_eq!(qld.where_clause().unwrap(), "lot='3' AND plan='RP123456'");
    /// ```
    ///
    /// # Errors
    ///
    /// Fails only for NSW identifiers whose plan has no number.
    pub fn where_clause(&self) -> Result<String, IdentifierError> {
        match self.jurisdiction {
            Jurisdiction::Qld => Ok(format!(
                "lot='{}' AND plan='{}'",
                sql_quote(&self.lot),
                sql_quote(&self.plan)
            )),
            Jurisdiction::Nsw => {
                let section = match &self.section {
                    Some(section) => format!("sectionnumber='{}'", sql_quote(section)),
                    None => "(sectionnumber IS NULL OR sectionnumber='')".to_string(),
                };
                Ok(format!(
                    "lotnumber='{}' AND plannumber={} AND {}",
                    sql_quote(&self.lot),
                    self.plan_number()?,
                    section
                ))
            }
        }
    }
}

impl fmt::Display for LotPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.jurisdiction, &self.section) {
            (Jurisdiction::Qld, _) => write!(f, "{}{}", self.lot, self.plan),
            (Jurisdiction::Nsw, Some(section)) => write!(f, "{}/{}/{}", self.lot, section, self.plan),
            (Jurisdiction::Nsw, None) => write!(f, "{}/{}", self.lot, self.plan),
        }
    }
}

/// Doubles single quotes for ArcGIS SQL string literals.
fn sql_quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qld_pattern() {
        let caps = QLD_LOT_PLAN.captures("101CP1234").unwrap();
        assert_eq!(&caps[1], "101");
        assert_eq!(&caps[2], "CP1234");
        assert!(!QLD_LOT_PLAN.is_match("3/RP123456"));
    }

    #[test]
    fn test_parse_qld() {
        let lp = LotPlan::parse("3RP123456").unwrap();
        assert_eq!(lp.jurisdiction, Jurisdiction::Qld);
        assert_eq!(lp.lot, "3");
        assert_eq!(lp.plan, "RP123456");
        assert_eq!(lp.section, None);
    }

    #[test]
    fn test_parse_qld_lowercase_and_whitespace() {
        let lp = LotPlan::parse("  12sp789\t").unwrap();
        assert_eq!(lp.lot, "12");
        assert_eq!(lp.plan, "SP789");
    }

    #[test]
    fn test_parse_nsw_lot_plan() {
        let lp = LotPlan::parse("4/DP765432").unwrap();
        assert_eq!(lp.jurisdiction, Jurisdiction::Nsw);
        assert_eq!(lp.lot, "4");
        assert_eq!(lp.section, None);
        assert_eq!(lp.plan, "DP765432");
    }

    #[test]
    fn test_parse_nsw_with_section() {
        let lp = LotPlan::parse("43 / 1 / dp12345").unwrap();
        assert_eq!(lp.lot, "43");
        assert_eq!(lp.section.as_deref(), Some("1"));
        assert_eq!(lp.plan, "DP12345");
    }

    #[test]
    fn test_parse_nsw_blank_section_is_none() {
        let lp = LotPlan::parse("43//DP12345").unwrap();
        assert_eq!(lp.section, None);
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(LotPlan::parse("   "), Err(IdentifierError::Empty));
        assert!(matches!(LotPlan::parse("1/2/3/DP4"), Err(IdentifierError::TooManyParts(_))));
        assert!(matches!(LotPlan::parse("/DP4"), Err(IdentifierError::MissingPart(_))));
        assert!(matches!(LotPlan::parse("4/DP"), Err(IdentifierError::NoPlanNumber(_))));
        assert!(matches!(LotPlan::parse("RP123456"), Err(IdentifierError::Unrecognised(_))));
        assert!(matches!(LotPlan::parse("3ABCD123"), Err(IdentifierError::Unrecognised(_))));
    }

    #[test]
    fn test_plan_number() {
        let lp = LotPlan::parse("4/DP0765432").unwrap();
        assert_eq!(lp.plan_number().unwrap(), 765_432);
    }

    #[test]
    fn test_where_clause_nsw_without_section() {
        let lp = LotPlan::parse("4/DP765432").unwrap();
        assert_eq!(
            lp.where_clause().unwrap(),
            "lotnumber='4' AND plannumber=765432 AND (sectionnumber IS NULL OR sectionnumber='')"
        );
    }

    #[test]
    fn test_where_clause_nsw_with_section() {
        let lp = LotPlan::parse("43/1/DP12345").unwrap();
        assert_eq!(
            lp.where_clause().unwrap(),
            "lotnumber='43' AND plannumber=12345 AND sectionnumber='1'"
        );
    }

    #[test]
    fn test_where_clause_escapes_quotes() {
        let lp = LotPlan::parse("4'/DP1").unwrap();
        assert!(lp.where_clause().unwrap().starts_with("lotnumber='4'''"));
    }

    #[test]
    fn test_display_round_trips_input_shape() {
        assert_eq!(LotPlan::parse("3rp123456").unwrap().to_string(), "3RP123456");
        assert_eq!(LotPlan::parse("43/1/DP12345").unwrap().to_string(), "43/1/DP12345");
        assert_eq!(LotPlan::parse("4/DP765432").unwrap().to_string(), "4/DP765432");
    }
}
