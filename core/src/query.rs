//! Compiling free-text queries into boolean match expressions.

use crate::tokenizer::tokenize;
use std::fmt;

/// A boolean predicate over one indexed token field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchExpression {
    /// Matches every indexed document.
    MatchAll,
    /// The field must contain this exact (already stemmed) token.
    Term { field: String, text: String },
    /// Every child must match.
    And(Vec<MatchExpression>),
}

impl MatchExpression {
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        MatchExpression::Term { field: field.into(), text: text.into() }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, MatchExpression::MatchAll)
    }
}

impl fmt::Display for MatchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchExpression::MatchAll => write!(f, "*"),
            MatchExpression::Term { field, text } => write!(f, "{field}:{text}"),
            MatchExpression::And(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Turns a user query into a conjunction of stemmed terms against a single field.
///
/// The field name is not checked here; an unknown field surfaces as
/// [`SearchError::SchemaMismatch`](crate::SearchError::SchemaMismatch) when the
/// expression is run against an index.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    field: String,
}

impl QueryCompiler {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }

    /// A query with no extractable tokens compiles to [`MatchExpression::MatchAll`],
    /// so an empty search box returns the whole corpus.
    pub fn compile(&self, query: &str) -> MatchExpression {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return MatchExpression::MatchAll;
        }
        MatchExpression::And(
            tokens
                .into_iter()
                .map(|text| MatchExpression::Term { field: self.field.clone(), text })
                .collect(),
        )
    }
}
