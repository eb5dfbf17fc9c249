use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::selection::DEFAULT_ID_COLUMN;

/// Environment variable overriding the identifier column name.
pub const ID_COLUMN_ENV: &str = "SSPF_ID_COLUMN";

pub const USAGE: &str = "usage: sspf CATALOGUE RANDOM IDEAL OUTPUT [CRITERION...]\n\
     criteria look like z_gt_0.6, z_ls_0.7 or type=ELG";

/// Inputs of one selection run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Table to subsample.
    pub catalogue: PathBuf,
    /// Reference table with unbiased coverage.
    pub random: PathBuf,
    /// Reference table of true targets.
    pub ideal: PathBuf,
    /// Where the subsample is written. Must not exist yet.
    pub output: PathBuf,
    /// Raw selection criteria, in order.
    pub criteria: Vec<String>,
    /// Identifier column shared by the random and ideal tables.
    pub id_column: String,
}

impl RunConfig {
    /// Build from positional arguments (program name excluded):
    /// catalogue, random, ideal, output, then any number of criteria.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let (Some(catalogue), Some(random), Some(ideal), Some(output)) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            bail!("{USAGE}");
        };

        Ok(Self {
            catalogue: catalogue.into(),
            random: random.into(),
            ideal: ideal.into(),
            output: output.into(),
            criteria: args.collect(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
        })
    }

    /// Apply [`ID_COLUMN_ENV`] if it is set and non-empty.
    pub fn with_env(self) -> Self {
        self.with_id_override(std::env::var(ID_COLUMN_ENV).ok())
    }

    /// Replace the identifier column with `value`, trimmed. `None` and blank
    /// values keep the current one.
    pub fn with_id_override(self, value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(col) if !col.is_empty() => self.with_id_column(col),
            _ => self,
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }
}
