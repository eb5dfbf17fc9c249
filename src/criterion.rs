use std::fmt;
use std::str::FromStr;

use crate::data::model::Value;
use crate::error::CriterionError;

// ---------------------------------------------------------------------------
// Criterion – one parsed selection predicate
// ---------------------------------------------------------------------------

/// Operator tokens, in the order they are looked for.
const GREATER_THAN: &str = "_gt_";
const LESS_THAN: &str = "_ls_";
const EQUAL: char = '=';

/// The comparison a criterion applies to its column, with a typed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Keep rows whose value is strictly greater.
    GreaterThan(f64),
    /// Keep rows whose value is strictly less.
    LessThan(f64),
    /// Keep rows whose value equals the literal, compared in the cell's own type.
    Equal(String),
}

impl Comparison {
    /// Evaluate the comparison against one cell.
    ///
    /// * `GreaterThan` / `LessThan` only hold for numeric cells.
    /// * `Equal` parses the literal as the cell's type; a literal that does not
    ///   parse, or a null cell, never matches.
    pub fn matches(&self, cell: &Value) -> bool {
        match self {
            Comparison::GreaterThan(bound) => cell.as_f64().is_some_and(|v| v > *bound),
            Comparison::LessThan(bound) => cell.as_f64().is_some_and(|v| v < *bound),
            Comparison::Equal(literal) => match cell {
                Value::String(s) => s == literal,
                Value::Integer(i) => literal.parse::<i64>().is_ok_and(|l| l == *i),
                Value::Float(f) => literal.parse::<f64>().is_ok_and(|l| l == *f),
                Value::Bool(b) => literal.parse::<bool>().is_ok_and(|l| l == *b),
                Value::Null => false,
            },
        }
    }
}

/// A selection criterion such as `z_gt_0.6`, `z_ls_0.7` or `type=ELG`.
///
/// Immutable once parsed; the raw string is kept for provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    raw: String,
    column: String,
    comparison: Comparison,
}

impl Criterion {
    /// Parse a raw criterion.
    ///
    /// Tokens are checked in the order `_gt_`, `_ls_`, `=`; the first one found
    /// wins and the string is split at its first occurrence. So `a_gt_b=c`
    /// is a greater-than criterion on column `a` with the (malformed) value `b=c`.
    pub fn parse(raw: &str) -> Result<Self, CriterionError> {
        let (column, comparison) = if let Some((column, value)) = raw.split_once(GREATER_THAN) {
            (column, Comparison::GreaterThan(parse_bound(raw, value)?))
        } else if let Some((column, value)) = raw.split_once(LESS_THAN) {
            (column, Comparison::LessThan(parse_bound(raw, value)?))
        } else if let Some((column, value)) = raw.split_once(EQUAL) {
            (column, Comparison::Equal(value.to_string()))
        } else {
            return Err(CriterionError::Unrecognized {
                raw: raw.to_string(),
            });
        };

        Ok(Criterion {
            raw: raw.to_string(),
            column: column.to_string(),
            comparison,
        })
    }

    /// The string this criterion was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    /// Evaluate the criterion against the value of its column.
    pub fn matches(&self, cell: &Value) -> bool {
        self.comparison.matches(cell)
    }
}

fn parse_bound(raw: &str, literal: &str) -> Result<f64, CriterionError> {
    literal
        .parse::<f64>()
        .map_err(|source| CriterionError::MalformedNumber {
            raw: raw.to_string(),
            literal: literal.to_string(),
            source,
        })
}

impl FromStr for Criterion {
    type Err = CriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Criterion::parse(s)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_greater_than() {
        let c = Criterion::parse("z_gt_0.6").unwrap();
        assert_eq!(c.column(), "z");
        assert_eq!(c.comparison(), &Comparison::GreaterThan(0.6));
        assert_eq!(c.raw(), "z_gt_0.6");
    }

    #[test]
    fn parses_less_than_with_exponent() {
        let c: Criterion = "Haflux_ls_8e-16".parse().unwrap();
        assert_eq!(c.column(), "Haflux");
        assert_eq!(c.comparison(), &Comparison::LessThan(8e-16));
    }

    #[test]
    fn parses_equal_as_verbatim_literal() {
        let c = Criterion::parse("type=ELG").unwrap();
        assert_eq!(c.column(), "type");
        assert_eq!(c.comparison(), &Comparison::Equal("ELG".into()));

        // Only the first '=' splits.
        let c = Criterion::parse("note=a=b").unwrap();
        assert_eq!(c.column(), "note");
        assert_eq!(c.comparison(), &Comparison::Equal("a=b".into()));
    }

    #[test]
    fn greater_than_is_checked_before_less_than() {
        let c = Criterion::parse("a_ls_b_gt_1").unwrap();
        assert_eq!(c.column(), "a_ls_b");
        assert_eq!(c.comparison(), &Comparison::GreaterThan(1.0));
    }

    #[test]
    fn greater_than_is_checked_before_equal() {
        let err = Criterion::parse("flag_gt_x=ELG").unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            CriterionError::MalformedNumber { ref literal, .. } if literal == "x=ELG"
        ));
    }

    #[test]
    fn splits_at_first_token_occurrence() {
        let err = Criterion::parse("z_gt_0.3_gt_0.4").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_number_is_fatal() {
        let err = Criterion::parse("z_gt_abc").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "criterion 'z_gt_abc': 'abc' is not a number");
    }

    #[test]
    fn unrecognized_token_is_not_fatal() {
        let err = Criterion::parse("z>0.3").unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(
            err,
            CriterionError::Unrecognized {
                raw: "z>0.3".into()
            }
        );
    }

    #[test]
    fn display_is_raw_string() {
        let c = Criterion::parse("type=ELG").unwrap();
        assert_eq!(c.to_string(), "type=ELG");
    }

    #[test]
    fn ordered_comparisons_need_numeric_cells() {
        let gt = Comparison::GreaterThan(0.3);
        assert!(gt.matches(&Value::Float(0.5)));
        assert!(gt.matches(&Value::Integer(1)));
        assert!(!gt.matches(&Value::Float(0.3)));
        assert!(!gt.matches(&Value::String("0.5".into())));
        assert!(!gt.matches(&Value::Null));

        let ls = Comparison::LessThan(0.3);
        assert!(ls.matches(&Value::Float(0.1)));
        assert!(!ls.matches(&Value::Float(f64::NAN)));
    }

    #[test]
    fn equal_compares_in_cell_type() {
        let eq = Comparison::Equal("ELG".into());
        assert!(eq.matches(&Value::String("ELG".into())));
        assert!(!eq.matches(&Value::String("elg".into())));
        assert!(!eq.matches(&Value::Integer(1)));
        assert!(!eq.matches(&Value::Null));

        let eq = Comparison::Equal("3".into());
        assert!(eq.matches(&Value::Integer(3)));
        assert!(eq.matches(&Value::Float(3.0)));
        assert!(eq.matches(&Value::String("3".into())));

        assert!(Comparison::Equal("true".into()).matches(&Value::Bool(true)));
    }
}
