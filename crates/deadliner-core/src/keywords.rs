/// Case-insensitive "contains any of" matcher.
///
/// Used for every keyword test in the pipeline: relevance marking,
/// exclusion, and the keyword/firm/extension flags on candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    needles: Vec<String>,
}

impl KeywordSet {
    /// Build a set from raw keywords. Empty keywords are dropped so they can't
    /// match every line.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { needles }
    }

    /// True if `text` contains at least one keyword, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        if self.needles.is_empty() {
            return false;
        }
        let haystack = text.to_lowercase();
        self.needles.iter().any(|n| haystack.contains(n.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }
}
