use picsearch_core::persist::{save_index, IndexPaths};
use picsearch_core::{
    IndexBuilder, IndexProvider, IndexReader, MatchExpression, MissingSurrogatePolicy, SearchConfig, SearchError,
    SearchPipeline, SearchResult, Searcher, SurrogateFile, SurrogateTable,
};
use std::cell::{Cell, RefCell};
use std::fs;
use tempfile::tempdir;

const RED_CAR_SURROGATES: &str = r#"{
    "1": {"textual_surrogate": "a red car on the street", "url": "u1"},
    "2": {"textual_surrogate": "blue bicycle", "url": "u2"}
}"#;

/// Returns a fixed result list and counts session opens and closes.
struct StubIndex {
    results: Vec<SearchResult>,
    opened: Cell<usize>,
    closed: Cell<usize>,
    seen: RefCell<Vec<MatchExpression>>,
}

impl StubIndex {
    fn returning(ids: &[&str]) -> Self {
        Self {
            results: ids.iter().map(|id| SearchResult { image_id: id.to_string(), url: format!("u{id}") }).collect(),
            opened: Cell::new(0),
            closed: Cell::new(0),
            seen: RefCell::new(Vec::new()),
        }
    }
}

struct StubSearcher<'a> {
    index: &'a StubIndex,
}

impl Searcher for StubSearcher<'_> {
    fn search(&self, expr: &MatchExpression, limit: Option<usize>) -> picsearch_core::Result<Vec<SearchResult>> {
        self.index.seen.borrow_mut().push(expr.clone());
        let mut out = self.index.results.clone();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

impl Drop for StubSearcher<'_> {
    fn drop(&mut self) {
        self.index.closed.set(self.index.closed.get() + 1);
    }
}

impl IndexProvider for StubIndex {
    fn searcher(&self) -> picsearch_core::Result<Box<dyn Searcher + '_>> {
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(StubSearcher { index: self }))
    }
}

struct DownIndex;

impl IndexProvider for DownIndex {
    fn searcher(&self) -> picsearch_core::Result<Box<dyn Searcher + '_>> {
        Err(SearchError::IndexUnavailable("connection refused".into()))
    }
}

fn ids(outcome: &picsearch_core::SearchOutcome) -> Vec<&str> {
    outcome.ranked.iter().map(|s| s.result.image_id.as_str()).collect()
}

#[test]
fn red_car_ranks_matching_surrogate_first() {
    let index = StubIndex::returning(&["2", "1"]);
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let outcome = SearchPipeline::new(&SearchConfig::default()).search("red car", &index, &table).unwrap();

    assert_eq!(outcome.total, 2);
    assert_eq!(ids(&outcome), vec!["1", "2"]);
    let scores: Vec<u32> = outcome.ranked.iter().map(|s| s.score).collect();
    assert_eq!(scores, vec![2, 0]);
    assert_eq!(index.opened.get(), 1);
    assert_eq!(index.closed.get(), 1);
}

#[test]
fn query_reaches_index_as_conjunction() {
    let index = StubIndex::returning(&[]);
    let table = SurrogateTable::default();
    SearchPipeline::new(&SearchConfig::default()).search("red cars", &index, &table).unwrap();
    assert_eq!(
        index.seen.borrow().as_slice(),
        &[MatchExpression::And(vec![
            MatchExpression::term("textual_surrogate", "red"),
            MatchExpression::term("textual_surrogate", "car"),
        ])]
    );
}

#[test]
fn empty_query_returns_everything_unscored() {
    let index = StubIndex::returning(&["1", "2"]);
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let outcome = SearchPipeline::new(&SearchConfig::default()).search("   ", &index, &table).unwrap();
    assert_eq!(index.seen.borrow()[0], MatchExpression::MatchAll);
    assert_eq!(ids(&outcome), vec!["1", "2"]);
    assert!(outcome.ranked.iter().all(|s| s.score == 0));
}

#[test]
fn missing_surrogate_fails_and_releases_session() {
    let index = StubIndex::returning(&["1", "3"]);
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let err = SearchPipeline::new(&SearchConfig::default()).search("red car", &index, &table).unwrap_err();
    assert!(matches!(err, SearchError::MissingSurrogate { ref image_id } if image_id == "3"));
    assert_eq!(index.opened.get(), 1);
    assert_eq!(index.closed.get(), 1);
}

#[test]
fn score_zero_policy_keeps_unknown_images() {
    let index = StubIndex::returning(&["3", "1"]);
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let config = SearchConfig { missing_surrogate: MissingSurrogatePolicy::ScoreZero, ..SearchConfig::default() };
    let outcome = SearchPipeline::new(&config).search("red car", &index, &table).unwrap();
    assert_eq!(ids(&outcome), vec!["1", "3"]);
}

#[test]
fn unreadable_surrogates_abort_before_scoring() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("textual_surrogates.json");
    fs::write(&path, "{ not json").unwrap();
    let index = StubIndex::returning(&["1"]);
    let err = SearchPipeline::new(&SearchConfig::default())
        .search("red", &index, &SurrogateFile::new(&path))
        .unwrap_err();
    assert!(matches!(err, SearchError::SurrogateSourceUnavailable(_)));
    assert_eq!(index.closed.get(), 1);
}

#[test]
fn unavailable_index_is_surfaced() {
    let err = SearchPipeline::new(&SearchConfig::default())
        .search("red", &DownIndex, &SurrogateTable::default())
        .unwrap_err();
    assert!(matches!(err, SearchError::IndexUnavailable(_)));
}

#[test]
fn limit_is_passed_to_the_index() {
    let index = StubIndex::returning(&["1", "2"]);
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let config = SearchConfig { limit: Some(1), ..SearchConfig::default() };
    let outcome = SearchPipeline::new(&config).search("", &index, &table).unwrap();
    assert_eq!(outcome.total, 1);
}

#[test]
fn wrong_field_is_schema_mismatch_with_no_output() {
    let mut builder = IndexBuilder::new("textual_surrogate");
    builder.add_image("1", "u1", "a red car on the street");
    let index = builder.finish();
    let table = SurrogateTable::from_json_str(RED_CAR_SURROGATES).unwrap();
    let config = SearchConfig { field: "caption".into(), ..SearchConfig::default() };
    let err = SearchPipeline::new(&config).search("red", &index, &table).unwrap_err();
    assert!(matches!(err, SearchError::SchemaMismatch { .. }));
}

#[test]
fn on_disk_index_end_to_end() {
    let dir = tempdir().unwrap();
    let surrogates_path = dir.path().join("textual_surrogates.json");
    fs::write(
        &surrogates_path,
        r#"{
            "1": {"textual_surrogate": "a red car on the street", "url": "u1"},
            "2": {"textual_surrogate": "red cars", "url": "u2"},
            "3": {"textual_surrogate": "blue bicycle", "url": "u3"},
            "4": {"textual_surrogate": null, "url": "u4"}
        }"#,
    )
    .unwrap();

    let table = SurrogateTable::load(&surrogates_path).unwrap();
    let mut records: Vec<_> = table.iter().collect();
    records.sort_by(|a, b| a.image_id.cmp(&b.image_id));
    let mut builder = IndexBuilder::new("textual_surrogate");
    for r in records {
        builder.add_image(&r.image_id, &r.url, &r.textual_surrogate);
    }
    let index_dir = dir.path().join("image_index");
    save_index(&IndexPaths::new(&index_dir), &builder.finish(), "2024-01-01T00:00:00Z").unwrap();

    let reader = IndexReader::open(&index_dir).unwrap();
    let pipeline = SearchPipeline::new(&SearchConfig::default());

    // Both 1 and 2 contain the stems of "red" and "car"; only 1 shares both raw words.
    let outcome = pipeline.search("red car", &reader, &SurrogateFile::new(&surrogates_path)).unwrap();
    assert_eq!(ids(&outcome), vec!["1", "2"]);
    assert_eq!(outcome.ranked.as_slice()[0].score, 2);
    assert_eq!(outcome.ranked.as_slice()[1].score, 1);
    assert_eq!(outcome.ranked.as_slice()[0].result.url, "u1");

    let everything = pipeline.search("", &reader, &SurrogateFile::new(&surrogates_path)).unwrap();
    assert_eq!(everything.total, 4);
}
