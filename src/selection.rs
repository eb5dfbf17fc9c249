//! Selection engine: applies criteria to the catalogue and the two reference
//! tables and scores the selection.
//!
//! ```text
//!   raw criteria ──► Criterion::parse ──► [Criterion]
//!                                              │
//!        ┌─────────────────────┬───────────────┴───────┐
//!        ▼                     ▼                       ▼
//!   catalogue (Retain)    random (Mask)           ideal (Mask)
//!        │                     │                       │
//!        │                  R = ids                 I = ids
//!        │                     └──────── R ∩ I ────────┘
//!        ▼                                 │
//!   filtered rows          completeness = |R∩I|/|I|, purity = |R∩I|/|R|
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::criterion::Criterion;
use crate::data::filter::{Diagnostic, Role, apply_criteria};
use crate::data::model::{Dataset, TableMeta, Value};
use crate::error::{CriterionError, SelectError};

/// Default name of the identifier column in the random and ideal tables.
pub const DEFAULT_ID_COLUMN: &str = "ID";

// ---------------------------------------------------------------------------
// Fraction – a ratio that may be undefined
// ---------------------------------------------------------------------------

/// A ratio of two counts. Undefined when the denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: usize,
    pub denominator: usize,
}

impl Fraction {
    pub fn new(numerator: usize, denominator: usize) -> Self {
        Fraction {
            numerator,
            denominator,
        }
    }

    /// The ratio, or `None` when the denominator is zero.
    pub fn value(&self) -> Option<f64> {
        (self.denominator != 0).then(|| self.numerator as f64 / self.denominator as f64)
    }

    pub fn is_defined(&self) -> bool {
        self.denominator != 0
    }

    /// The ratio with `NaN` standing in for an undefined value.
    pub fn value_or_nan(&self) -> f64 {
        self.value().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{v} ({}/{})", self.numerator, self.denominator),
            None => write!(f, "undefined ({}/0)", self.numerator),
        }
    }
}

// ---------------------------------------------------------------------------
// SelectionResult
// ---------------------------------------------------------------------------

/// Everything a selection run produces.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Catalogue rows passing every applicable criterion, in original order.
    pub catalogue: Dataset,
    /// |R ∩ I| / |I|
    pub completeness: Fraction,
    /// |R ∩ I| / |R|
    pub purity: Fraction,
    /// Criteria applied to the catalogue, in input order.
    pub applied: Vec<Criterion>,
    /// Number of random rows selected (before identifier deduplication).
    pub random_selected: usize,
    /// Number of ideal rows selected (before identifier deduplication).
    pub ideal_selected: usize,
    /// Warnings for every skipped criterion / table pair.
    pub diagnostics: Vec<Diagnostic>,
}

impl SelectionResult {
    /// `column → raw criterion` for every criterion applied to the catalogue.
    /// When a column is filtered more than once the last criterion wins.
    pub fn provenance(&self) -> BTreeMap<&str, &str> {
        self.applied
            .iter()
            .map(|c| (c.column(), c.raw()))
            .collect()
    }

    /// Header entries for the output table: one `<column>_sel` per applied
    /// column, then `purity` and `complete`. Undefined statistics are `NaN`.
    pub fn metadata(&self) -> TableMeta {
        let mut meta = TableMeta::new();
        for criterion in &self.applied {
            meta.insert(format!("{}_sel", criterion.column()), criterion.raw());
        }
        meta.insert("purity", self.purity.value_or_nan());
        meta.insert("complete", self.completeness.value_or_nan());
        meta
    }
}

// ---------------------------------------------------------------------------
// SelectionEngine
// ---------------------------------------------------------------------------

/// Applies selection criteria to a catalogue and scores them against the
/// random and ideal reference tables.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    id_column: String,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ID_COLUMN)
    }
}

impl SelectionEngine {
    /// `id_column` names the identifier column shared by the random and ideal tables.
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
        }
    }

    /// Run the selection.
    ///
    /// Fails if a `_gt_` / `_ls_` criterion has a malformed number or if a
    /// reference table lacks the identifier column. Unrecognised criteria and
    /// missing columns are reported in [`SelectionResult::diagnostics`].
    pub fn select<S: AsRef<str>>(
        &self,
        catalogue: &Dataset,
        random: &Dataset,
        ideal: &Dataset,
        criteria: &[S],
    ) -> Result<SelectionResult, SelectError> {
        let mut diagnostics = Vec::new();
        let parsed = parse_criteria(criteria, &mut diagnostics)?;

        // Check identifiers before doing any work.
        let random_id = self.id_index(random, Role::Random)?;
        let ideal_id = self.id_index(ideal, Role::Ideal)?;

        let pass = apply_criteria(catalogue, &parsed, Role::Catalogue);
        let filtered = pass.retained(catalogue);
        let applied: Vec<Criterion> = pass.applied.into_iter().cloned().collect();
        diagnostics.extend(pass.diagnostics);

        let (random_ids, random_selected) =
            selected_ids(random, random_id, &parsed, Role::Random, &mut diagnostics);
        let (ideal_ids, ideal_selected) =
            selected_ids(ideal, ideal_id, &parsed, Role::Ideal, &mut diagnostics);

        let common = random_ids.intersection(&ideal_ids).count();

        Ok(SelectionResult {
            catalogue: filtered,
            completeness: Fraction::new(common, ideal_ids.len()),
            purity: Fraction::new(common, random_ids.len()),
            applied,
            random_selected,
            ideal_selected,
            diagnostics,
        })
    }

    fn id_index(&self, dataset: &Dataset, role: Role) -> Result<usize, SelectError> {
        dataset
            .column_index(&self.id_column)
            .ok_or_else(|| SelectError::MissingIdColumn {
                role,
                column: self.id_column.clone(),
            })
    }
}

/// Identifiers (column `id`) of the rows of a reference table passing every
/// applicable criterion, plus the number of such rows.
fn selected_ids<'d>(
    dataset: &'d Dataset,
    id: usize,
    criteria: &[Criterion],
    role: Role,
    diagnostics: &mut Vec<Diagnostic>,
) -> (HashSet<&'d Value>, usize) {
    let pass = apply_criteria(dataset, criteria, role);
    let count = pass.selected();
    diagnostics.extend(pass.diagnostics);

    let ids = dataset
        .rows
        .iter()
        .zip(&pass.mask)
        .filter(|(_, keep)| **keep)
        .map(|(row, _)| &row[id])
        .collect();
    (ids, count)
}

/// Parse every raw criterion in order. Unrecognised strings become
/// diagnostics; a malformed number aborts.
fn parse_criteria<S: AsRef<str>>(
    raw: &[S],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<Criterion>, SelectError> {
    let mut parsed = Vec::with_capacity(raw.len());
    for r in raw {
        match Criterion::parse(r.as_ref()) {
            Ok(criterion) => parsed.push(criterion),
            Err(CriterionError::Unrecognized { raw }) => {
                diagnostics.push(Diagnostic::Unrecognized { raw });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(parsed)
}
