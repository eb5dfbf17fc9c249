use std::fmt;

use crate::criterion::Criterion;

use super::model::Dataset;

// ---------------------------------------------------------------------------
// Dataset roles and diagnostics
// ---------------------------------------------------------------------------

/// Which of the three input tables a pass runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Catalogue,
    Random,
    Ideal,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Catalogue => "catalogue",
            Role::Random => "random",
            Role::Ideal => "ideal",
        })
    }
}

/// A non-fatal condition met while selecting. The affected criterion is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The criterion contains none of the recognised operator tokens.
    Unrecognized { raw: String },
    /// The criterion's column does not exist in one of the tables.
    MissingColumn {
        column: String,
        raw: String,
        role: Role,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unrecognized { raw } => {
                write!(f, "Do not understand selection criterion {raw}")
            }
            Diagnostic::MissingColumn { column, raw, role } => {
                write!(f, "No column named {column} in the {role} file (criterion {raw} skipped)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate pass: one routine for all three tables
// ---------------------------------------------------------------------------

/// Outcome of [`apply_criteria`] over one table.
#[derive(Debug, Clone)]
pub struct FilterPass<'c> {
    /// One entry per row; `true` when the row passes every applied criterion.
    pub mask: Vec<bool>,
    /// Criteria whose column exists in the table, in application order.
    pub applied: Vec<&'c Criterion>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FilterPass<'_> {
    /// Number of rows passing.
    pub fn selected(&self) -> usize {
        self.mask.iter().filter(|k| **k).count()
    }

    /// The passing rows of `dataset`, in original order.
    pub fn retained(&self, dataset: &Dataset) -> Dataset {
        dataset.retain_mask(&self.mask)
    }
}

/// Evaluate `criteria` conjunctively over every row of `dataset`.
///
/// The mask starts all-true and is AND-ed with each criterion in turn.
/// A criterion whose column is missing from the table leaves the mask
/// untouched and yields a [`Diagnostic::MissingColumn`] tagged with `role`.
pub fn apply_criteria<'c>(
    dataset: &Dataset,
    criteria: &'c [Criterion],
    role: Role,
) -> FilterPass<'c> {
    let mut mask = vec![true; dataset.len()];
    let mut applied = Vec::with_capacity(criteria.len());
    let mut diagnostics = Vec::new();

    for criterion in criteria {
        let Some(col) = dataset.column_index(criterion.column()) else {
            diagnostics.push(Diagnostic::MissingColumn {
                column: criterion.column().to_string(),
                raw: criterion.raw().to_string(),
                role,
            });
            continue;
        };

        for (keep, row) in mask.iter_mut().zip(&dataset.rows) {
            *keep = *keep && criterion.matches(&row[col]);
        }
        log::debug!(
            "{role}: {criterion} leaves {} of {} rows",
            mask.iter().filter(|k| **k).count(),
            dataset.len()
        );
        applied.push(criterion);
    }

    FilterPass {
        mask,
        applied,
        diagnostics,
    }
}
