//! Pattern intent tier
//!
//! Fast deterministic matching against a fixed taxonomy. Patterns cover
//! English, romanised Hindi (code-mixed "Hinglish") and Devanagari. Order is
//! significant: the first matching pattern wins, so compliance stops and
//! negations are checked before their positive look-alikes, and an interest
//! cue beats a leading "yes".

use regex::Regex;
use tracing::warn;

use crate::domain::value_objects::{Intent, IntentMatch, IntentSource};

/// Default confidence reported for a pattern hit
pub const PATTERN_CONFIDENCE: f32 = 0.85;

const DEFAULT_PATTERNS: &[(Intent, &str)] = &[
    (
        Intent::DoNotCall,
        r"(?i)\b(do not|don't|dont|never)\s+(call|phone|disturb)\b|\b(stop|quit)\s+calling\b|\bremove\s+(my|this)\s+number\b|\bdnd\b|\b(call|phone)\s+mat\s+(karo|karna|kijiye)\b|कॉल\s*मत|फ़ोन\s*मत|फोन\s*मत",
    ),
    (
        Intent::WrongNumber,
        r"(?i)\bwrong\s+(number|person)\b|\bno\s+one\s+(here\s+)?by\s+that\s+name\b|\bgala?t\s+number\b|गलत\s*नंबर",
    ),
    (
        Intent::CallbackRequest,
        r"(?i)\bcall\s+(me\s+)?(back|later|tomorrow|again)\b|\bcallback\b|\b(baad|bad)\s+m(e|ei|ein|ai)n?\s+(call|phone|baat)\b|\bkal\s+(call|phone)\b|बाद\s*में",
    ),
    (
        Intent::Busy,
        r"(?i)\b(i'?m|i am|am)\s+(busy|driving|in a meeting)\b|\bbusy\s+(right now|now|hoon|hu)\b|\babhi\s+(time|samay)\s+nahi\b|\bnot\s+a\s+good\s+time\b|व्यस्त",
    ),
    (
        Intent::NotInterested,
        r"(?i)\bnot\s+interested\b|\bno\s+thanks?\b|\b(don't|dont|do not)\s+(need|want)\b|\binterest(ed)?\s+nahi\b|\bnahi\s+chahiye\b|\bzaroorat\s+nahi\b|नहीं\s*चाहिए|ज़रूरत\s*नहीं|जरूरत\s*नहीं",
    ),
    (
        Intent::AppointmentIntent,
        r"(?i)\b(book|schedule|fix|set up|arrange)\b.*\b(appointment|meeting|demo|visit|call)\b|\bappointment\b|\bdemo\b|\bmeet\s+(you|tomorrow|today)\b|\bmil(te|enge)\s+hain\b|मिलते\s*हैं",
    ),
    (
        Intent::Objection,
        r"(?i)\b(too\s+)?(expensive|costly|pricey)\b|\bmeh?nga\b|\balready\s+(have|using|use|got)\b|\bno\s+budget\b|\bthink\s+about\s+it\b|\bsend\s+(me\s+)?(the\s+)?details\b|\bnot\s+sure\b|\b(trust|scam|fraud)\b|महंगा|सोच\s*कर",
    ),
    (
        Intent::Interested,
        r"(?i)\binterested\b|\btell\s+me\s+more\b|\bsounds\s+(good|great|interesting)\b|\bbatao\b|\bbataiye\b|\binterest\s+hai\b|\bhow\s+does\s+it\s+work\b|बताइए|बताओ|दिलचस्प",
    ),
    // A bare sign-off after a filler word ("ok bye") is not an affirmative
    (
        Intent::Goodbye,
        r"(?i)^\s*((ok|okay|alright|thanks|thank\s+you|ji|haan|theek\s+hai|chalo)[\s,.!]+)*(bye|goodbye|good\s+bye|alvida)\b",
    ),
    (
        Intent::Confirmation,
        r"(?i)^\s*(yes|yeah|yep|yup|sure|ok|okay|done|confirmed|correct|perfect|haan|ha|han|ji|ji haan|theek hai|thik hai|bilkul|chalega|pakka)\b|^\s*(हाँ|हां|जी|ठीक\s*है|बिल्कुल)",
    ),
    (
        Intent::Greeting,
        r"(?i)^\s*(hi|hello|hey|hallo|namaste|namaskar|good\s+(morning|afternoon|evening))\b|^\s*(नमस्ते|नमस्कार|हेलो)",
    ),
    (
        Intent::Goodbye,
        r"(?i)\b(bye|goodbye|good\s+bye|take\s+care|alvida)\b|अलविदा",
    ),
    (
        Intent::Question,
        r"(?i)\?\s*$|^\s*(what|how|why|when|where|who|which|kya|kaise|kitna|kitne|kab|kyun|kaun)\b|क्या|कैसे|कितना|कब",
    ),
];

struct CompiledPattern {
    intent: Intent,
    regex: Regex,
}

/// First-tier classifier
pub struct PatternClassifier {
    patterns: Vec<CompiledPattern>,
    confidence: f32,
}

impl PatternClassifier {
    /// Classifier over the built-in taxonomy
    pub fn new(confidence: f32) -> Self {
        Self::with_patterns(
            DEFAULT_PATTERNS
                .iter()
                .map(|(intent, pattern)| (*intent, pattern.to_string())),
            confidence,
        )
    }

    /// Classifier over a custom ordered pattern list; invalid patterns are skipped
    pub fn with_patterns(
        patterns: impl IntoIterator<Item = (Intent, String)>,
        confidence: f32,
    ) -> Self {
        let patterns = patterns
            .into_iter()
            .filter_map(|(intent, pattern)| match Regex::new(&pattern) {
                Ok(regex) => Some(CompiledPattern { intent, regex }),
                Err(e) => {
                    warn!(intent = %intent, error = %e, "Skipping invalid intent pattern");
                    None
                }
            })
            .collect();

        Self {
            patterns,
            confidence,
        }
    }

    /// Prepend extra patterns so they are tried before the built-in ones
    pub fn prepend(mut self, extra: impl IntoIterator<Item = (Intent, String)>) -> Self {
        let mut head = Self::with_patterns(extra, self.confidence).patterns;
        head.append(&mut self.patterns);
        self.patterns = head;
        self
    }

    pub fn classify(&self, text: &str) -> Option<IntentMatch> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.patterns
            .iter()
            .find(|p| p.regex.is_match(text))
            .map(|p| IntentMatch::new(p.intent, self.confidence, IntentSource::Pattern))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(PATTERN_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(text: &str) -> Option<Intent> {
        PatternClassifier::default().classify(text).map(|m| m.intent)
    }

    #[test]
    fn test_all_default_patterns_compile() {
        assert_eq!(PatternClassifier::default().len(), DEFAULT_PATTERNS.len());
    }

    #[test]
    fn test_english() {
        assert_eq!(intent("Please don't call me again"), Some(Intent::DoNotCall));
        assert_eq!(intent("Sorry, wrong number"), Some(Intent::WrongNumber));
        assert_eq!(intent("I'm busy, call me back later"), Some(Intent::CallbackRequest));
        assert_eq!(intent("I am not interested"), Some(Intent::NotInterested));
        assert_eq!(intent("Yes I'm interested"), Some(Intent::Interested));
        assert_eq!(intent("That sounds good, I'm interested"), Some(Intent::Interested));
        assert_eq!(intent("It is too expensive for us"), Some(Intent::Objection));
        assert_eq!(intent("Let's book a demo on Monday"), Some(Intent::AppointmentIntent));
        assert_eq!(intent("Hello?"), Some(Intent::Greeting));
        assert_eq!(intent("How much does it cost?"), Some(Intent::Question));
        assert_eq!(intent("ok bye"), Some(Intent::Goodbye));
        assert_eq!(intent("alright, bye then"), Some(Intent::Goodbye));
    }

    #[test]
    fn test_hinglish_and_devanagari() {
        assert_eq!(intent("bhai call mat karo"), Some(Intent::DoNotCall));
        assert_eq!(intent("galat number hai"), Some(Intent::WrongNumber));
        assert_eq!(intent("abhi time nahi hai"), Some(Intent::Busy));
        assert_eq!(intent("mujhe nahi chahiye"), Some(Intent::NotInterested));
        assert_eq!(intent("haan batao"), Some(Intent::Interested));
        assert_eq!(intent("thoda aur batao"), Some(Intent::Interested));
        assert_eq!(intent("ye bahut mehnga hai"), Some(Intent::Objection));
        assert_eq!(intent("मुझे नहीं चाहिए"), Some(Intent::NotInterested));
        assert_eq!(intent("नमस्ते जी"), Some(Intent::Greeting));
        assert_eq!(intent("गलत नंबर"), Some(Intent::WrongNumber));
    }

    #[test]
    fn test_bare_affirmatives_stay_confirmations() {
        assert_eq!(intent("Yes, confirmed"), Some(Intent::Confirmation));
        assert_eq!(intent("ok"), Some(Intent::Confirmation));
        assert_eq!(intent("haan ji"), Some(Intent::Confirmation));
        assert_eq!(intent("Okay, thanks, bye"), Some(Intent::Goodbye));
        assert_eq!(intent("yes, tell me more"), Some(Intent::Interested));
    }

    #[test]
    fn test_no_match_falls_through() {
        assert_eq!(intent("the weather is nice"), None);
        assert_eq!(intent("   "), None);
    }

    #[test]
    fn test_confidence_is_constant() {
        let m = PatternClassifier::default().classify("dnd").expect("match");
        assert_eq!(m.confidence, PATTERN_CONFIDENCE);
        assert_eq!(m.source, IntentSource::Pattern);
    }

    #[test]
    fn test_prepended_patterns_win() {
        let classifier = PatternClassifier::default()
            .prepend([(Intent::Interested, r"(?i)\bkitna\s+padega\b".to_string())]);
        assert_eq!(
            classifier.classify("kitna padega?").map(|m| m.intent),
            Some(Intent::Interested)
        );
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let classifier =
            PatternClassifier::with_patterns([(Intent::Busy, "(unclosed".to_string())], 0.9);
        assert!(classifier.is_empty());
    }
}
