use std::collections::HashSet;
use std::path::Path;

use crate::errors::{NewsSentimentError, Result};

const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "said", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

const HUNGARIAN: &[&str] = &[
    "a", "az", "egy", "és", "is", "hogy", "nem", "meg", "de", "ez", "azt", "van", "volt", "már",
    "csak", "még", "mint", "ki", "be", "el", "fel", "le", "ha", "mert", "vagy", "sem", "így",
    "úgy", "után", "alatt", "között", "szerint", "miatt", "pedig", "amely", "ami", "aki", "itt",
    "ott", "lesz", "lett", "kell", "minden", "majd", "most", "sok", "ezt", "ezek", "azok", "nagyon",
];

/// Неизменяемый набор стоп-слов; загружается один раз на процесс
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    language: String,
    words: HashSet<String>,
}

impl StopWords {
    pub fn new<I, S>(language: &str, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopWords {
            language: language.to_string(),
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Встроенный список для языка
    pub fn builtin(language: &str) -> Result<Self> {
        let words = match language.to_lowercase().as_str() {
            "english" | "en" => ENGLISH,
            "hungarian" | "hu" => HUNGARIAN,
            other => {
                return Err(NewsSentimentError::Configuration(format!(
                    "No built-in stop words for language '{}'",
                    other
                )))
            }
        };
        Ok(Self::new(language, words.iter()))
    }

    /// Файл со словами по одному на строку; строки с `#` пропускаются
    pub fn from_file(language: &str, path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let words = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'));
        Ok(Self::new(language, words))
    }

    pub fn load(language: &str, path: Option<&str>) -> Result<Self> {
        let stopwords = match path {
            Some(path) => Self::from_file(language, path)?,
            None => Self::builtin(language)?,
        };
        tracing::info!(
            "Загружено {} стоп-слов для языка {}",
            stopwords.len(),
            stopwords.language
        );
        Ok(stopwords)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.trim().to_lowercase())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
