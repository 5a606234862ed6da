use thiserror::Error;

/// Result alias for `furrow`.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Config and schema errors are fatal and surface before any training or
/// clustering work starts. Data errors are per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid parameter or configuration.
    Config,
    /// Header does not match the declared fields.
    Schema,
    /// A row or value could not be used.
    Data,
    /// Vector length disagrees with the model or dataset.
    Dimension,
    /// A metric has no value for the accumulated data.
    UndefinedMetric,
}

/// Errors returned by encoding, training, evaluation, and clustering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Distance measure name not present in the registry.
    #[error("unknown distance measure '{0}'")]
    UnknownMeasure(String),

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// A declared field is absent from the header.
    #[error("field '{field}' not found in header")]
    MissingField {
        /// Declared field name.
        field: String,
    },

    /// Row has the wrong number of cells.
    #[error("expected {expected} columns, found {found}")]
    ColumnCount {
        /// Header width.
        expected: usize,
        /// Row width.
        found: usize,
    },

    /// A numeric cell did not parse.
    #[error("field '{field}': cannot parse '{value}' as a number")]
    Unparsable {
        /// Field name.
        field: String,
        /// Offending cell.
        value: String,
    },

    /// Target value not in the frozen dictionary, or the dictionary is full.
    #[error("target value '{value}' cannot be mapped: {reason}")]
    UnknownCategory {
        /// Offending target value.
        value: String,
        /// Why it could not be mapped.
        reason: &'static str,
    },

    /// Label outside the model's or evaluator's category range.
    #[error("label {label} out of range for {n_categories} categories")]
    LabelOutOfRange {
        /// Offending label.
        label: usize,
        /// Number of categories.
        n_categories: usize,
    },

    /// Vector dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Metric has no defined value.
    #[error("{metric} is undefined: {reason}")]
    UndefinedMetric {
        /// Metric name.
        metric: &'static str,
        /// Why.
        reason: &'static str,
    },

    /// A row-level error, tagged with the zero-based row index.
    #[error("row {index}: {source}")]
    Row {
        /// Zero-based index among data rows (header excluded).
        index: usize,
        /// Underlying error.
        source: Box<Error>,
    },
}

impl Error {
    /// Coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput
            | Error::InvalidParameter { .. }
            | Error::UnknownMeasure(_)
            | Error::InvalidClusterCount { .. } => ErrorKind::Config,
            Error::MissingField { .. } => ErrorKind::Schema,
            Error::ColumnCount { .. }
            | Error::Unparsable { .. }
            | Error::UnknownCategory { .. }
            | Error::LabelOutOfRange { .. } => ErrorKind::Data,
            Error::DimensionMismatch { .. } => ErrorKind::Dimension,
            Error::UndefinedMetric { .. } => ErrorKind::UndefinedMetric,
            Error::Row { source, .. } => source.kind(),
        }
    }

    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn at_row(self, index: usize) -> Self {
        Error::Row {
            index,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_errors_keep_the_inner_kind() {
        let err = Error::Unparsable {
            field: "x".into(),
            value: "abc".into(),
        }
        .at_row(3);
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().starts_with("row 3:"));
    }

    #[test]
    fn config_errors_are_config() {
        assert_eq!(Error::invalid("t1", "negative").kind(), ErrorKind::Config);
        assert_eq!(
            Error::UnknownMeasure("nope".into()).kind(),
            ErrorKind::Config
        );
    }
}
