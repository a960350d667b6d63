//! TF-IDF keyword extraction.
//!
//! Every call to [`KeywordExtractor::extract_keywords`] treats its input as
//! one new document: the corpus is updated first, then the document's terms
//! are scored against the updated statistics. As a consequence the very first
//! document of a fresh corpus scores every term at exactly zero and yields no
//! keywords.
//!
//! Corpus statistics are shared by everything that holds the extractor, so
//! keyword quality for one session depends on all text processed so far.
//! Only the update step is serialized; scoring works from an idf snapshot
//! taken inside the same critical section.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use contextkeeper_core::message::Keyword;
use serde::Serialize;
use tracing::debug;

/// Japanese function words plus common English stop words.
const STOP_WORDS: &[&str] = &[
    // Japanese
    "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある", "いる",
    "も", "する", "から", "な", "こと", "として", "い", "や", "れる", "など", "なっ", "ない",
    "この", "ため", "その", "あっ", "よう", "また", "もの", "という", "あり", "まで", "られ",
    "なる", "へ", "か", "だ", "これ", "によって", "により", "おり", "より", "による", "ず",
    "なり", "られる", "において", "ば", "なかっ", "なく", "しかし", "について", "せ", "だっ",
    "その他", "ここ", "そこ", "それ", "どこ", "いつ", "なぜ", "どう", "どの", "どんな",
    "です", "ます", "である", "でした", "だった", "ください", "ちょっと", "ちゃん",
    "さん", "くん", "みたい", "みたいな", "っぽい", "感じ", "ような",
    "と思い", "と思う", "と思います", "けど", "でも", "ただし",
    // English
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
    "by", "from", "as", "is", "was", "are", "were", "be", "been", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "can",
    "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
];

/// Minimum token length, in characters.
const MIN_TOKEN_CHARS: usize = 2;

/// Latin letters, hiragana, katakana, and CJK unified ideographs.
fn is_token_char(c: char) -> bool {
    matches!(
        c,
        'a'..='z' | 'A'..='Z' | '\u{3040}'..='\u{309f}' | '\u{30a0}'..='\u{30ff}' | '\u{4e00}'..='\u{9faf}'
    )
}

#[derive(Debug, Default)]
struct Corpus {
    document_frequency: HashMap<String, usize>,
    total_documents: usize,
    /// Sum of token counts over all documents, for the average length.
    total_tokens: usize,
}

impl Corpus {
    fn add_document(&mut self, tokens: &[String]) {
        self.total_documents += 1;
        self.total_tokens += tokens.len();
        let unique: HashSet<&String> = tokens.iter().collect();
        for token in unique {
            *self.document_frequency.entry(token.clone()).or_insert(0) += 1;
        }
    }

    fn idf(&self, term: &str) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        match self.document_frequency.get(term) {
            None | Some(0) => 0.0,
            Some(&df) => (self.total_documents as f64 / df as f64).ln(),
        }
    }
}

/// Aggregate corpus statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total_documents: usize,
    pub unique_terms: usize,
    pub avg_document_length: f64,
}

/// TF-IDF keyword extractor with a shared, growing corpus.
pub struct KeywordExtractor {
    corpus: Mutex<Corpus>,
    stop_words: HashSet<&'static str>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self {
            corpus: Mutex::new(Corpus::default()),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Split text into lower-cased letter runs, dropping short tokens and
    /// stop words.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.trim().to_lowercase();
        lowered
            .split(|c: char| !is_token_char(c))
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .filter(|token| !self.stop_words.contains(token))
            .map(str::to_string)
            .collect()
    }

    /// Extract up to `top_k` keywords from `text`, highest score first.
    ///
    /// Ties keep first-occurrence order. Terms scoring zero are dropped.
    /// Blank input returns nothing and leaves the corpus untouched.
    pub fn extract_keywords(&self, text: &str, top_k: usize) -> Vec<Keyword> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let tokens = self.tokenize(text);

        // Unique terms in first-occurrence order, with their counts.
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            let count = counts.entry(token.as_str()).or_insert(0);
            if *count == 0 {
                order.push(token.as_str());
            }
            *count += 1;
        }

        let idf: HashMap<&str, f64> = {
            let mut corpus = self.corpus.lock().unwrap_or_else(PoisonError::into_inner);
            corpus.add_document(&tokens);
            order.iter().map(|term| (*term, corpus.idf(term))).collect()
        };

        if tokens.is_empty() {
            return Vec::new();
        }

        let total = tokens.len() as f64;
        let mut scored: Vec<(&str, f64)> = order
            .iter()
            .map(|term| {
                let tf = counts[term] as f64 / total;
                (*term, tf * idf[term])
            })
            .collect();

        // Stable sort keeps first-occurrence order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        let keywords: Vec<Keyword> = scored
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(term, score)| Keyword::new(term, score))
            .collect();

        debug!(
            count = keywords.len(),
            tokens = tokens.len(),
            "Extracted keywords"
        );
        keywords
    }

    pub fn get_corpus_stats(&self) -> CorpusStats {
        let corpus = self.corpus.lock().unwrap_or_else(PoisonError::into_inner);
        CorpusStats {
            total_documents: corpus.total_documents,
            unique_terms: corpus.document_frequency.len(),
            avg_document_length: corpus.total_tokens as f64 / corpus.total_documents.max(1) as f64,
        }
    }

    /// Forget every document seen so far.
    pub fn reset_corpus(&self) {
        let mut corpus = self.corpus.lock().unwrap_or_else(PoisonError::into_inner);
        *corpus = Corpus::default();
        debug!("Keyword corpus reset");
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}
