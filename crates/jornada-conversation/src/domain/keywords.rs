//! Keyword matching over free text.
//!
//! Matching is case-insensitive and word-aware: `"sim"` matches
//! `"Sim, eu topo!"` but not `"assim"`. Multi-word keywords match whole
//! word sequences.

use super::script::Keywords;

/// How the user answered the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferReply {
    /// Accepted; reveal the payment instructions.
    Affirmative,
    /// Asked how payment works.
    Question,
    /// Anything else.
    Other,
}

fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect();
    format!(" {} ", words.join(" "))
}

/// Returns `true` if `text` contains `keyword` as whole words.
#[must_use]
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    let keyword = normalize(keyword);
    if keyword.trim().is_empty() {
        return false;
    }
    normalize(text).contains(&keyword)
}

/// Returns `true` if `text` contains any of `keywords`.
#[must_use]
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| contains_keyword(text, keyword))
}

/// Returns `true` if `text` is small talk rather than a name.
#[must_use]
pub fn is_filler(text: &str, keywords: &Keywords) -> bool {
    contains_any(text, &keywords.filler)
}

/// Returns `true` if `text` is the quick reply that opens the story viewer.
#[must_use]
pub fn is_stories_open(text: &str, keywords: &Keywords) -> bool {
    normalize(text) == normalize(&keywords.stories_open)
}

/// Routes a reply to the offer. Acceptance wins over a question.
#[must_use]
pub fn classify_offer_reply(text: &str, keywords: &Keywords) -> OfferReply {
    if contains_any(text, &keywords.affirmative) {
        OfferReply::Affirmative
    } else if contains_any(text, &keywords.question) {
        OfferReply::Question
    } else {
        OfferReply::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::script::Script;

    fn keywords() -> Keywords {
        Script::builtin().unwrap().keywords
    }

    #[test]
    fn test_affirmative_reply_routes_to_reveal() {
        assert_eq!(
            classify_offer_reply("Sim, eu topo!", &keywords()),
            OfferReply::Affirmative
        );
        assert_eq!(
            classify_offer_reply("Com certeza! Eu topo!", &keywords()),
            OfferReply::Affirmative
        );
    }

    #[test]
    fn test_question_reply_routes_to_explanation() {
        assert_eq!(
            classify_offer_reply("Como funciona o pagamento?", &keywords()),
            OfferReply::Question
        );
    }

    #[test]
    fn test_unrelated_reply_is_other() {
        assert_eq!(
            classify_offer_reply("hmm, não sei", &keywords()),
            OfferReply::Other
        );
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert!(!contains_keyword("foi assim mesmo", "sim"));
        assert!(contains_keyword("SIM!", "sim"));
    }

    #[test]
    fn test_multi_word_keyword_matches_sequence() {
        assert!(contains_keyword("Oi, tudo bem?", "tudo bem"));
        assert!(!contains_keyword("tudo certo, bem", "tudo bem"));
    }

    #[test]
    fn test_filler_detection_handles_accents() {
        assert!(is_filler("Tudo ÓTIMO por aqui", &keywords()));
        assert!(!is_filler("Ana", &keywords()));
    }

    #[test]
    fn test_stories_open_requires_exact_reply() {
        assert!(is_stories_open("ver status", &keywords()));
        assert!(!is_stories_open("quero ver status depois", &keywords()));
    }

    #[test]
    fn test_blank_keyword_never_matches() {
        assert!(!contains_keyword("qualquer coisa", "  "));
    }
}
