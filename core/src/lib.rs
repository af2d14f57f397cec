//! Query compilation, overlap scoring and ranking for surrogate-based image search.
//!
//! A search runs once per query: the [`QueryCompiler`] turns free text into a
//! [`MatchExpression`], an [`IndexProvider`] returns candidate images, and the
//! [`ResultRanker`] orders them by how many raw words the query shares with each
//! image's textual surrogate.

pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod rank;
pub mod surrogate;
pub mod tokenizer;

pub use config::{MissingSurrogatePolicy, SearchConfig};
pub use error::{Result, SearchError};
pub use index::{DocId, ImageMeta, IndexBuilder, InvertedIndex, Posting, TermId};
pub use persist::IndexReader;
pub use pipeline::{SearchOutcome, SearchPipeline};
pub use provider::{IndexProvider, SearchResult, Searcher};
pub use query::{MatchExpression, QueryCompiler};
pub use rank::{RankedList, RelevanceScorer, ResultRanker, ScoredResult};
pub use surrogate::{SurrogateFile, SurrogateRecord, SurrogateSource, SurrogateTable};
