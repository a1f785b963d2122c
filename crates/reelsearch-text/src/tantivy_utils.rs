use tantivy::tokenizer::{Language, Stemmer, StopWordFilter, TextAnalyzer, WhitespaceTokenizer};

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// Recorded in cache artifacts alongside the stopword digest.
pub const STEMMER_LANGUAGE: &str = "english";

/// Per-word analyzer: stopword removal followed by English stemming.
/// Input is expected to be lowercased and free of punctuation already.
pub fn build_analyzer<I>(stop_words: I) -> TextAnalyzer
where
    I: IntoIterator<Item = String>,
{
    TextAnalyzer::builder(WhitespaceTokenizer::default())
        .filter(StopWordFilter::remove(stop_words))
        .filter(Stemmer::new(Language::English))
        .build()
}
