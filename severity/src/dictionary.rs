use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use hashbrown::{HashMap, HashSet};

use crate::errors::{Result, SeverityError};

/// Set of tokens excluded from the vector space.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one stop word per line.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut words = HashSet::new();
        for line in rdr.lines() {
            words.insert(line?);
        }
        Ok(Self(words))
    }

    /// Loads a stop-word file.
    ///
    /// A missing or unreadable file is not an error: a warning is logged and
    /// the returned set is empty.
    pub fn load<P>(path: P) -> Self
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        match File::open(path)
            .map_err(SeverityError::from)
            .and_then(|f| Self::from_reader(BufReader::new(f)))
        {
            Ok(words) => words,
            Err(e) => {
                log::warn!(
                    "Could not load stop words from {}; will not exclude stop words: {e}",
                    path.display()
                );
                Self::new()
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S> FromIterator<S> for StopWords
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Frozen mapping from retained tokens to 0-based feature indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    ids: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Dictionary {
    /// Creates a dictionary whose indices follow the order of `tokens`.
    ///
    /// # Errors
    ///
    /// [`SeverityError::InvalidModel`] will be returned if a token appears twice.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let mut ids = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if ids.insert(token.clone(), i).is_some() {
                return Err(SeverityError::invalid_model(format!(
                    "duplicated dictionary token: {token}"
                )));
            }
        }
        Ok(Self { ids, tokens })
    }

    /// Gets the index of a token.
    #[inline(always)]
    pub fn get(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Gets tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Corpus-wide term counter that freezes into a [`Dictionary`].
///
/// Counts are only meaningful once every document has been added, so the
/// builder is consumed by [`DictionaryBuilder::build()`].
pub struct DictionaryBuilder<'a> {
    min_term_count: usize,
    sort_by_frequency: bool,
    stop_words: Option<&'a StopWords>,
    ids: HashMap<String, usize>,
    // (token, global count) in first-occurrence order.
    counts: Vec<(String, usize)>,
}

impl<'a> DictionaryBuilder<'a> {
    /// Creates a new builder.
    ///
    /// # Arguments
    ///
    /// * `min_term_count` - Tokens occurring fewer times than this in the whole
    ///                      corpus are not retained.
    pub fn new(min_term_count: usize) -> Self {
        Self {
            min_term_count,
            sort_by_frequency: true,
            stop_words: None,
            ids: HashMap::new(),
            counts: vec![],
        }
    }

    /// Sets tokens that are never counted.
    pub fn stop_words(mut self, stop_words: &'a StopWords) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    /// Orders the dictionary by descending global count (the default) instead
    /// of first occurrence.
    pub fn sort_by_frequency(mut self, sort_by_frequency: bool) -> Self {
        self.sort_by_frequency = sort_by_frequency;
        self
    }

    /// Counts every token of a document.
    pub fn add_tokens<S>(&mut self, tokens: &[S])
    where
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref();
            if self.stop_words.map_or(false, |sw| sw.contains(token)) {
                continue;
            }
            if let Some(&id) = self.ids.get(token) {
                self.counts[id].1 += 1;
            } else {
                self.ids.insert(token.to_string(), self.counts.len());
                self.counts.push((token.to_string(), 1));
            }
        }
    }

    /// Freezes the counts into a dictionary.
    pub fn build(self) -> Dictionary {
        let mut counts = self.counts;
        if self.sort_by_frequency {
            // Ties are ordered by descending token.
            counts.sort_by(|(w1, c1), (w2, c2)| c2.cmp(c1).then_with(|| w2.cmp(w1)));
        }
        let tokens: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.min_term_count)
            .map(|(token, _)| token)
            .collect();
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        log::info!("Dictionary size: {}", tokens.len());
        Dictionary { ids, tokens }
    }
}
