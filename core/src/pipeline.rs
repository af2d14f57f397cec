use crate::config::SearchConfig;
use crate::error::Result;
use crate::provider::IndexProvider;
use crate::query::QueryCompiler;
use crate::rank::{RankedList, RelevanceScorer, ResultRanker};
use crate::surrogate::SurrogateSource;

/// What one search hands to the presenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub ranked: RankedList,
    pub total: usize,
}

/// Compile, fetch, score and rank for a single query.
///
/// Holds no state between calls; the index and surrogate source are passed
/// in per search.
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    compiler: QueryCompiler,
    ranker: ResultRanker,
    limit: Option<usize>,
}

impl SearchPipeline {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            compiler: QueryCompiler::new(config.field.clone()),
            ranker: ResultRanker::new(RelevanceScorer::new(config.missing_surrogate)),
            limit: config.limit,
        }
    }

    /// Run `query` end to end. Any failure aborts with no partial output; the
    /// search session is released on every path.
    pub fn search(&self, query: &str, index: &dyn IndexProvider, surrogates: &dyn SurrogateSource) -> Result<SearchOutcome> {
        let expr = self.compiler.compile(query);
        tracing::debug!(%expr, "compiled query");

        let searcher = index.searcher()?;
        let results = searcher.search(&expr, self.limit)?;
        let table = surrogates.load()?;
        let ranked = self.ranker.rank(results, query, &table)?;
        drop(searcher);

        let total = ranked.len();
        tracing::info!(query, total, "search complete");
        Ok(SearchOutcome { ranked, total })
    }
}
