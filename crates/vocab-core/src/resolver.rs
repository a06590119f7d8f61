//! Translation lookup: user definitions first, then the dictionary

use std::sync::Arc;

use crate::cache::DatasetCache;

pub struct TranslationResolver {
    cache: Arc<DatasetCache>,
}

impl TranslationResolver {
    pub fn new(cache: Arc<DatasetCache>) -> Self {
        TranslationResolver { cache }
    }

    /// Translation for one word, or an empty string.
    pub fn resolve(&self, word: &str) -> String {
        let user = self.cache.user_words();
        let dict = self.cache.dictionary();
        let key = word.trim().to_lowercase();
        lookup(user.definition(&key), dict.get(&key).map(String::as_str))
    }

    /// Resolve many words against one consistent snapshot of the cache.
    pub fn resolve_all<'a, I>(&self, words: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let user = self.cache.user_words();
        let dict = self.cache.dictionary();
        words
            .into_iter()
            .map(|w| {
                let key = w.trim().to_lowercase();
                let zh = lookup(user.definition(&key), dict.get(&key).map(String::as_str));
                (w.to_string(), zh)
            })
            .collect()
    }
}

fn lookup(user: Option<&str>, dictionary: Option<&str>) -> String {
    user.filter(|d| !d.is_empty())
        .or(dictionary)
        .unwrap_or_default()
        .to_string()
}
