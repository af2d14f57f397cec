//! Error types for the search pipeline.

use thiserror::Error;

/// Errors that abort a search. None of them are retried.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The match expression names a field the index does not carry.
    #[error("field `{field}` is not in the index schema (indexed field: `{indexed}`)")]
    SchemaMismatch { field: String, indexed: String },

    /// A candidate image has no entry in the surrogate table.
    #[error("no textual surrogate for image `{image_id}`")]
    MissingSurrogate { image_id: String },

    /// The surrogate JSON could not be read or parsed.
    #[error("surrogate source unavailable: {0}")]
    SurrogateSourceUnavailable(String),

    /// The index could not be opened or queried.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_names_both_fields() {
        let err = SearchError::SchemaMismatch { field: "caption".into(), indexed: "textual_surrogate".into() };
        let msg = err.to_string();
        assert!(msg.contains("`caption`"));
        assert!(msg.contains("`textual_surrogate`"));
    }

    #[test]
    fn missing_surrogate_display() {
        let err = SearchError::MissingSurrogate { image_id: "3".into() };
        assert_eq!(err.to_string(), "no textual surrogate for image `3`");
    }

    #[test]
    fn unavailable_variants_display() {
        let err = SearchError::IndexUnavailable("meta.json: not found".into());
        assert_eq!(err.to_string(), "index unavailable: meta.json: not found");
        let err = SearchError::SurrogateSourceUnavailable("bad json".into());
        assert_eq!(err.to_string(), "surrogate source unavailable: bad json");
    }
}
