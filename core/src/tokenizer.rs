use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","us","very",
            "was","we","were","what","when","where","which","while","who","whom","why","will","with","would",
            "yet","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Words shorter than this (in chars) are dropped.
const MIN_TOKEN_CHARS: usize = 2;

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into stemmed terms using NFKC normalization, lowercase, stopword removal, and stemming.
///
/// The index builder and the query compiler both go through this function, so a
/// query term and an indexed term for the same word always agree.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|mat| mat.as_str())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS && !is_stopword(token))
        .map(|token| STEMMER.stem(token).into_owned())
        .collect()
}
