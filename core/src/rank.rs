//! Overlap scoring and stable re-ranking of index results.

use crate::config::MissingSurrogatePolicy;
use crate::error::{Result, SearchError};
use crate::provider::SearchResult;
use crate::surrogate::SurrogateTable;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Number of distinct whitespace-separated words shared by `query` and `text`.
///
/// Words are compared verbatim: no lowercasing, no punctuation stripping, no stemming.
pub fn word_overlap(query: &str, text: &str) -> u32 {
    let query_words: HashSet<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0;
    }
    let text_words: HashSet<&str> = text.split_whitespace().collect();
    query_words.intersection(&text_words).count() as u32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer {
    policy: MissingSurrogatePolicy,
}

impl RelevanceScorer {
    pub fn new(policy: MissingSurrogatePolicy) -> Self {
        Self { policy }
    }

    pub fn score(&self, query: &str, result: &SearchResult, surrogates: &SurrogateTable) -> Result<u32> {
        match surrogates.get(&result.image_id) {
            Some(record) => Ok(word_overlap(query, &record.textual_surrogate)),
            None => match self.policy {
                MissingSurrogatePolicy::Fail => {
                    Err(SearchError::MissingSurrogate { image_id: result.image_id.clone() })
                }
                MissingSurrogatePolicy::ScoreZero => {
                    tracing::warn!(image_id = %result.image_id, "no surrogate for result, scoring 0");
                    Ok(0)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub result: SearchResult,
    pub score: u32,
}

/// Results ordered by descending score; equal scores keep index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankedList(Vec<ScoredResult>);

impl RankedList {
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredResult> { self.0.iter() }

    pub fn as_slice(&self) -> &[ScoredResult] { &self.0 }

    pub fn into_vec(self) -> Vec<ScoredResult> { self.0 }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a ScoredResult;
    type IntoIter = std::slice::Iter<'a, ScoredResult>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultRanker {
    scorer: RelevanceScorer,
}

impl ResultRanker {
    pub fn new(scorer: RelevanceScorer) -> Self {
        Self { scorer }
    }

    /// Score each result once per image id and sort by score, descending.
    ///
    /// The sort is stable so the index's own ordering breaks ties. The first
    /// scoring error aborts the ranking and nothing is returned.
    pub fn rank(&self, results: Vec<SearchResult>, query: &str, surrogates: &SurrogateTable) -> Result<RankedList> {
        let mut cache: HashMap<String, u32> = HashMap::new();
        let mut scored = Vec::with_capacity(results.len());
        for result in results {
            let score = match cache.get(&result.image_id) {
                Some(&s) => s,
                None => {
                    let s = self.scorer.score(query, &result, surrogates)?;
                    cache.insert(result.image_id.clone(), s);
                    s
                }
            };
            scored.push(ScoredResult { result, score });
        }
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(RankedList(scored))
    }
}
