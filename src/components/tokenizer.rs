//! Word tokenizer with optional rule-based lemmatization
//!
//! A small stand-in for a linguistic toolkit: enough to map inflected
//! question words onto shared base forms ("does" -> "do", "libraries" ->
//! "library") so that paraphrased questions share tokens.

use crate::components::params::ComponentParams;
use crate::errors::Result;
use std::collections::HashSet;

/// Irregular forms that suffix rules cannot recover
const IRREGULAR: &[(&str, &str)] = &[
    ("am", "be"),
    ("is", "be"),
    ("are", "be"),
    ("was", "be"),
    ("were", "be"),
    ("been", "be"),
    ("being", "be"),
    ("does", "do"),
    ("did", "do"),
    ("done", "do"),
    ("doing", "do"),
    ("has", "have"),
    ("had", "have"),
    ("having", "have"),
    ("goes", "go"),
    ("went", "go"),
    ("gone", "go"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("people", "person"),
];

/// Splits text into word tokens
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lowercase: bool,
    lemmatize: bool,
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Create a lower-casing tokenizer without lemmatization
    pub fn new() -> Self {
        Self {
            lowercase: true,
            lemmatize: false,
            stopwords: HashSet::new(),
        }
    }

    /// Build from stage parameters (`lowercase`, `lemmatize`, `stopwords`)
    pub fn from_params(params: &ComponentParams) -> Result<Self> {
        Ok(Self::new()
            .with_lowercase(params.get_bool("lowercase", true)?)
            .with_lemmatization(params.get_bool("lemmatize", false)?)
            .with_stopwords(params.get_string_list("stopwords")?))
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_lemmatization(mut self, lemmatize: bool) -> Self {
        self.lemmatize = lemmatize;
        self
    }

    /// Tokens dropped after normalisation
    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = stopwords.into_iter().map(Into::into).collect();
        self
    }

    /// Tokenize a single text
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .map(|raw| raw.trim_matches('\''))
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                let word = if self.lowercase {
                    raw.to_lowercase()
                } else {
                    raw.to_string()
                };
                if self.lemmatize {
                    lemmatize(&word)
                } else {
                    word
                }
            })
            .filter(|word| !self.stopwords.contains(word))
            .collect()
    }

    /// Tokenize a batch of texts
    pub fn tokenize_batch(&self, texts: &[String]) -> Vec<Vec<String>> {
        texts.iter().map(|text| self.tokenize(text)).collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce a word to an approximate base form
pub fn lemmatize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((_, base)) = IRREGULAR.iter().find(|(form, _)| *form == lower) {
        return base.to_string();
    }

    let word = word.strip_suffix("'s").unwrap_or(word);
    let len = word.chars().count();

    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if len > 4
        && ["sses", "xes", "ches", "shes"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if len > 3
        && word.ends_with('s')
        && !["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 1].to_string();
    }
    if len > 5 && word.ends_with("ing") {
        return undouble(&word[..word.len() - 3]);
    }
    if len > 4 && word.ends_with("ed") {
        let stem = &word[..word.len() - 2];
        if let Some(prefix) = stem.strip_suffix('i') {
            return format!("{}y", prefix);
        }
        return undouble(stem);
    }

    word.to_string()
}

/// "stopp" -> "stop", "runn" -> "run"
fn undouble(stem: &str) -> String {
    let mut chars = stem.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if a == b && !"aeiouls".contains(a) => {
            stem[..stem.len() - a.len_utf8()].to_string()
        }
        _ => stem.to_string(),
    }
}
