use crate::error::Result;
use crate::provider::{execute, IndexProvider, PostingSource, SearchResult, Searcher};
use crate::query::MatchExpression;
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub image_id: String,
    /// Reference to the externally hosted image bytes.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32, // normalized tf-idf weight
}

/// In-memory inverted index over a single token field.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub field: String,
    pub dictionary: HashMap<String, TermId>,
    pub postings: HashMap<TermId, Vec<Posting>>, // postings sorted by doc_id
    pub docs: HashMap<DocId, ImageMeta>,
    pub num_docs: u32,
}

impl InvertedIndex {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), ..Self::default() }
    }
}

impl PostingSource for InvertedIndex {
    fn field(&self) -> &str { &self.field }

    fn all_docs(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.docs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn postings(&self, term: &str) -> Result<Vec<Posting>> {
        Ok(self
            .dictionary
            .get(term)
            .and_then(|tid| self.postings.get(tid))
            .cloned()
            .unwrap_or_default())
    }

    fn meta(&self, doc_id: DocId) -> Option<&ImageMeta> { self.docs.get(&doc_id) }
}

struct MemorySearcher<'a> {
    index: &'a InvertedIndex,
}

impl Searcher for MemorySearcher<'_> {
    fn search(&self, expr: &MatchExpression, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        execute(self.index, expr, limit)
    }
}

impl IndexProvider for InvertedIndex {
    fn searcher(&self) -> Result<Box<dyn Searcher + '_>> {
        Ok(Box::new(MemorySearcher { index: self }))
    }
}

/// Accumulates images and produces an [`InvertedIndex`] with L2-normalized tf-idf weights.
pub struct IndexBuilder {
    field: String,
    smoothed_idf: bool,
    next_doc_id: DocId,
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    postings_raw: HashMap<TermId, Vec<(DocId, u32)>>,
    docs: HashMap<DocId, ImageMeta>,
    doc_id_map: HashMap<String, DocId>,
}

impl IndexBuilder {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            smoothed_idf: false,
            next_doc_id: 0,
            dictionary: HashMap::new(),
            df: Vec::new(),
            postings_raw: HashMap::new(),
            docs: HashMap::new(),
            doc_id_map: HashMap::new(),
        }
    }

    /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df).
    pub fn smoothed_idf(mut self, smoothed: bool) -> Self {
        self.smoothed_idf = smoothed;
        self
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    /// Index one image. Returns false (and keeps the first entry) when `image_id` was already added.
    pub fn add_image(&mut self, image_id: &str, url: &str, text: &str) -> bool {
        if self.doc_id_map.contains_key(image_id) {
            tracing::warn!(image_id, "duplicate image id, keeping first entry");
            return false;
        }
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        self.doc_id_map.insert(image_id.to_string(), doc_id);

        let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
        let mut seen_in_doc: HashSet<TermId> = HashSet::new();
        for term in tokenize(text) {
            let next_term_id = self.dictionary.len() as TermId;
            let tid = *self.dictionary.entry(term).or_insert(next_term_id);
            if self.df.len() <= tid as usize {
                self.df.resize(tid as usize + 1, 0);
            }
            *tf_counts.entry(tid).or_insert(0) += 1;
            if seen_in_doc.insert(tid) {
                self.df[tid as usize] += 1;
            }
        }
        for (tid, tf_raw) in tf_counts {
            self.postings_raw.entry(tid).or_default().push((doc_id, tf_raw));
        }

        self.docs.insert(doc_id, ImageMeta { image_id: image_id.to_string(), url: url.to_string() });
        true
    }

    pub fn finish(self) -> InvertedIndex {
        let num_docs = self.next_doc_id;
        let n = num_docs.max(1) as f32;

        // First pass: raw tf-idf per posting and per-document norms.
        let mut doc_norms: Vec<f32> = vec![0.0; num_docs as usize];
        let mut weighted: Vec<(TermId, Vec<(DocId, f32)>)> = Vec::with_capacity(self.postings_raw.len());
        for (term_id, plist) in self.postings_raw {
            let df_t = self.df[term_id as usize].max(1) as f32;
            let idf = if self.smoothed_idf { (1.0 + n / df_t).ln() } else { (n / df_t).ln() };
            let plist: Vec<(DocId, f32)> = plist
                .into_iter()
                .map(|(doc_id, tf_raw)| {
                    let tf = if tf_raw > 0 { 1.0 + (tf_raw as f32).ln() } else { 0.0 };
                    let tfidf = tf * idf;
                    doc_norms[doc_id as usize] += tfidf * tfidf;
                    (doc_id, tfidf)
                })
                .collect();
            weighted.push((term_id, plist));
        }
        for dn in doc_norms.iter_mut() {
            *dn = dn.sqrt();
            if *dn == 0.0 { *dn = 1.0; }
        }

        // Second pass: normalize and sort each list by doc_id.
        let mut postings = HashMap::with_capacity(weighted.len());
        for (term_id, plist) in weighted {
            let mut out: Vec<Posting> = plist
                .into_iter()
                .map(|(doc_id, tfidf)| Posting { doc_id, weight: tfidf / doc_norms[doc_id as usize] })
                .collect();
            out.sort_by_key(|p| p.doc_id);
            postings.insert(term_id, out);
        }

        tracing::debug!(num_docs, num_terms = self.dictionary.len(), "index built");
        InvertedIndex {
            field: self.field,
            dictionary: self.dictionary,
            postings,
            docs: self.docs,
            num_docs,
        }
    }
}
