use std::num::ParseFloatError;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::filter::Role;

/// Errors raised while turning a raw string into a [`Criterion`](crate::criterion::Criterion).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CriterionError {
    /// None of `_gt_`, `_ls_` or `=` occurs in the string.
    ///
    /// Not fatal: the criterion is skipped with a warning.
    #[error("do not understand selection criterion '{raw}'")]
    Unrecognized {
        /// The criterion as given on the command line
        raw: String,
    },

    /// The value of a `_gt_` / `_ls_` criterion is not a number.
    #[error("criterion '{raw}': '{literal}' is not a number")]
    MalformedNumber {
        /// The criterion as given on the command line
        raw: String,
        /// The text that failed to parse
        literal: String,
        /// Parser error
        #[source]
        source: ParseFloatError,
    },
}

impl CriterionError {
    /// Whether this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CriterionError::MalformedNumber { .. })
    }
}

/// Fatal errors of the selection engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectError {
    #[error(transparent)]
    Criterion(#[from] CriterionError),

    /// A reference dataset lacks the identifier column.
    #[error("no identifier column '{column}' in the {role} file")]
    MissingIdColumn {
        /// Which reference dataset
        role: Role,
        /// Name of the identifier column
        column: String,
    },
}

/// Errors of the table I/O layer.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("file {} exists. Delete it first or change the output filename", .0.display())]
    AlreadyExists(PathBuf),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// The file exists but could not be read or written as a table.
    #[error("cannot process table {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
