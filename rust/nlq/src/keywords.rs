//! Last-resort keyword extraction used when no pattern rule matched.

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "all", "any", "are", "was", "were",
    "show", "find", "get", "list", "give", "me", "my", "our", "about", "into", "have", "has",
    "incident", "incidents", "ticket", "tickets", "record", "records", "please", "which", "what",
    "where", "there", "their", "them", "some",
];

/// Pulls search keywords out of free text. Results are deduplicated and keep
/// first-occurrence order.
pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StopwordExtractor;

impl KeywordExtractor for StopwordExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        for token in text
            .to_lowercase()
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| token.chars().count() > 2)
            .filter(|token| !STOPWORDS.contains(token))
        {
            if !keywords.iter().any(|existing| existing == token) {
                keywords.push(token.to_string());
            }
        }
        keywords
    }
}
