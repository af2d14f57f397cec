use crate::error::{self, SearchError};
use crate::provider::{execute, IndexProvider, PostingSource, SearchResult, Searcher};
use crate::query::MatchExpression;
use crate::{DocId, ImageMeta, InvertedIndex, Posting, TermId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Bumped whenever the on-disk layout changes.
pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    /// Name of the single token field the postings were built from.
    pub field: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn dictionary(&self) -> PathBuf { self.root.join("dictionary.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn postings_dir(&self) -> PathBuf { self.root.join("postings") }
    fn postings_file(&self, term_id: TermId) -> PathBuf {
        self.postings_dir().join(format!("{term_id:08}.postings.bin"))
    }
}

fn write_bincode<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    let mut f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: PathBuf) -> Result<T> {
    let mut f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decode {}", path.display()))?;
    Ok(value)
}

pub fn save_dictionary(paths: &IndexPaths, dict: &HashMap<String, TermId>) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(paths.dictionary(), dict)
}

pub fn load_dictionary(paths: &IndexPaths) -> Result<HashMap<String, TermId>> {
    read_bincode(paths.dictionary())
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<DocId, ImageMeta>) -> Result<()> {
    write_bincode(paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<DocId, ImageMeta>> {
    read_bincode(paths.docs())
}

pub fn save_postings_for_term(paths: &IndexPaths, term_id: TermId, postings: &[Posting]) -> Result<()> {
    create_dir_all(paths.postings_dir())?;
    write_bincode(paths.postings_file(term_id), &postings)
}

pub fn load_postings_for_term(paths: &IndexPaths, term_id: TermId) -> Result<Vec<Posting>> {
    read_bincode(paths.postings_file(term_id))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let mut f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf).with_context(|| format!("parse {}", path.display()))?;
    Ok(meta)
}

/// Write every part of `index` under `paths.root`.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, created_at: &str) -> Result<()> {
    save_dictionary(paths, &index.dictionary)?;
    create_dir_all(paths.postings_dir())?;
    for (term_id, postings) in &index.postings {
        save_postings_for_term(paths, *term_id, postings)?;
    }
    save_docs(paths, &index.docs)?;
    let meta = MetaFile {
        num_docs: index.num_docs,
        created_at: created_at.to_string(),
        version: INDEX_VERSION,
        field: index.field.clone(),
    };
    save_meta(paths, &meta)
}

/// Load only the header structures required to search: dictionary, docs, meta.
pub fn load_index_header(paths: &IndexPaths) -> Result<(HashMap<String, TermId>, HashMap<DocId, ImageMeta>, MetaFile)> {
    let meta = load_meta(paths)?;
    let dict = load_dictionary(paths)?;
    let docs = load_docs(paths)?;
    Ok((dict, docs, meta))
}

/// An index directory opened for searching.
///
/// The dictionary and document table stay in memory; postings are read from
/// disk per term while a search runs.
pub struct IndexReader {
    paths: IndexPaths,
    dictionary: HashMap<String, TermId>,
    docs: HashMap<DocId, ImageMeta>,
    meta: MetaFile,
}

impl IndexReader {
    pub fn open<P: AsRef<Path>>(root: P) -> error::Result<Self> {
        let paths = IndexPaths::new(root);
        let (dictionary, docs, meta) =
            load_index_header(&paths).map_err(|e| SearchError::IndexUnavailable(format!("{e:#}")))?;
        if meta.version != INDEX_VERSION {
            return Err(SearchError::IndexUnavailable(format!(
                "unsupported index version {} (expected {INDEX_VERSION})",
                meta.version
            )));
        }
        tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, field = %meta.field, "index opened");
        Ok(Self { paths, dictionary, docs, meta })
    }

    pub fn meta_file(&self) -> &MetaFile { &self.meta }

    pub fn num_docs(&self) -> u32 { self.meta.num_docs }
}

impl PostingSource for IndexReader {
    fn field(&self) -> &str { &self.meta.field }

    fn all_docs(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.docs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn postings(&self, term: &str) -> error::Result<Vec<Posting>> {
        match self.dictionary.get(term) {
            Some(&tid) => load_postings_for_term(&self.paths, tid)
                .map_err(|e| SearchError::IndexUnavailable(format!("{e:#}"))),
            None => Ok(Vec::new()),
        }
    }

    fn meta(&self, doc_id: DocId) -> Option<&ImageMeta> { self.docs.get(&doc_id) }
}

struct DiskSearcher<'a> {
    reader: &'a IndexReader,
}

impl Searcher for DiskSearcher<'_> {
    fn search(&self, expr: &MatchExpression, limit: Option<usize>) -> error::Result<Vec<SearchResult>> {
        execute(self.reader, expr, limit)
    }
}

impl Drop for DiskSearcher<'_> {
    fn drop(&mut self) {
        tracing::debug!(root = %self.reader.paths.root.display(), "searcher closed");
    }
}

impl IndexProvider for IndexReader {
    fn searcher(&self) -> error::Result<Box<dyn Searcher + '_>> {
        if !self.paths.postings_dir().is_dir() {
            return Err(SearchError::IndexUnavailable(format!(
                "{} is missing",
                self.paths.postings_dir().display()
            )));
        }
        tracing::debug!(root = %self.paths.root.display(), "searcher opened");
        Ok(Box::new(DiskSearcher { reader: self }))
    }
}
