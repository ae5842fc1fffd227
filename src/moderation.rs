pub const DEFLECTION_MESSAGE: &str = "I appreciate your interest in book recommendations, but I'd prefer to keep our conversation respectful. Could you please rephrase your request without offensive language? I'm here to help you find amazing books to read!";

const DEFAULT_DENYLIST: &[&str] = &[
    "fuck",
    "shit",
    "damn",
    "bitch",
    "bastard",
    "asshole",
    "motherfucker",
    "cocksucker",
    "cunt",
    "piss",
];

/// Substring denylist. Matches inside longer words too, so expect false
/// positives ("scunthorpe").
#[derive(Debug, Clone)]
pub struct ModerationGate {
    terms: Vec<String>,
}

impl ModerationGate {
    pub fn builtin() -> Self {
        Self::from_terms(DEFAULT_DENYLIST.iter().copied())
    }

    /// Blank terms are dropped; matching is done on lowercase text.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { terms }
    }

    pub fn is_inappropriate(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.terms.iter().any(|term| text.contains(term.as_str()))
    }
}

impl Default for ModerationGate {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_denylisted_terms_in_any_case() {
        let gate = ModerationGate::builtin();
        assert!(gate.is_inappropriate("fuck this give me a book"));
        assert!(gate.is_inappropriate("What the SHIT is going on"));
        assert!(gate.is_inappropriate("DaMn, recommend something"));
    }

    #[test]
    fn flags_terms_embedded_in_longer_words() {
        let gate = ModerationGate::builtin();
        assert!(gate.is_inappropriate("a book set in Scunthorpe"));
    }

    #[test]
    fn passes_clean_requests() {
        let gate = ModerationGate::builtin();
        assert!(!gate.is_inappropriate("I want a book about government surveillance"));
        assert!(!gate.is_inappropriate(""));
    }

    #[test]
    fn custom_terms_replace_the_builtin_list() {
        let gate = ModerationGate::from_terms([" Spoiler ", "", "  "]);
        assert!(!gate.is_inappropriate("an ordinary request"));
        assert!(gate.is_inappropriate("no SPOILERS please"));
        assert!(!gate.is_inappropriate("damn"));
    }
}
