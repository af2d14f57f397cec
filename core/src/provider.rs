//! The seam between the pipeline and whatever index answers match expressions.

use crate::error::{Result, SearchError};
use crate::index::{DocId, ImageMeta, Posting};
use crate::query::MatchExpression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A candidate image returned by an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub image_id: String,
    pub url: String,
}

/// Something that can open search sessions over an index.
pub trait IndexProvider {
    /// Acquire a search session. The session is released when the returned
    /// searcher is dropped.
    fn searcher(&self) -> Result<Box<dyn Searcher + '_>>;
}

/// An open search session.
pub trait Searcher {
    /// Run `expr` and return matching images in the index's own relevance order,
    /// truncated to `limit` when given.
    fn search(&self, expr: &MatchExpression, limit: Option<usize>) -> Result<Vec<SearchResult>>;
}

/// Read access to postings, implemented by the in-memory and on-disk indexes.
pub(crate) trait PostingSource {
    /// The single token field this index carries.
    fn field(&self) -> &str;
    /// Every document id, in ascending order.
    fn all_docs(&self) -> Vec<DocId>;
    /// Postings for a stemmed term; empty when the term is unknown.
    fn postings(&self, term: &str) -> Result<Vec<Posting>>;
    fn meta(&self, doc_id: DocId) -> Option<&ImageMeta>;
}

/// Evaluate `expr` against `source`, ordering matches by summed posting weight
/// (descending) and then by doc id.
pub(crate) fn execute<S: PostingSource + ?Sized>(
    source: &S,
    expr: &MatchExpression,
    limit: Option<usize>,
) -> Result<Vec<SearchResult>> {
    let scores = evaluate(source, expr)?;
    let mut scored: Vec<(DocId, f32)> = scores.into_iter().collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    if let Some(limit) = limit {
        scored.truncate(limit);
    }

    let mut results = Vec::with_capacity(scored.len());
    for (doc_id, _) in scored {
        match source.meta(doc_id) {
            Some(meta) => results.push(SearchResult { image_id: meta.image_id.clone(), url: meta.url.clone() }),
            None => tracing::warn!(doc_id, "posting references a document with no metadata"),
        }
    }
    Ok(results)
}

fn evaluate<S: PostingSource + ?Sized>(source: &S, expr: &MatchExpression) -> Result<HashMap<DocId, f32>> {
    match expr {
        MatchExpression::MatchAll => Ok(source.all_docs().into_iter().map(|d| (d, 0.0)).collect()),
        MatchExpression::Term { field, text } => {
            if field != source.field() {
                return Err(SearchError::SchemaMismatch { field: field.clone(), indexed: source.field().to_string() });
            }
            Ok(source.postings(text)?.into_iter().map(|p| (p.doc_id, p.weight)).collect())
        }
        MatchExpression::And(children) => {
            let mut acc: Option<HashMap<DocId, f32>> = None;
            for child in children {
                let matched = evaluate(source, child)?;
                acc = Some(match acc {
                    None => matched,
                    Some(prev) => prev
                        .into_iter()
                        .filter_map(|(doc, w)| matched.get(&doc).map(|w2| (doc, w + w2)))
                        .collect(),
                });
            }
            // An empty conjunction is vacuously true.
            Ok(acc.unwrap_or_else(|| source.all_docs().into_iter().map(|d| (d, 0.0)).collect()))
        }
    }
}
