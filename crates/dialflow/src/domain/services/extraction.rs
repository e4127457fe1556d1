//! Entity and qualification extraction
//!
//! Runs on every lead utterance regardless of which classifier tier produced
//! the intent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::entities::QualificationData;

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(:\d{2})?\s*(am|pm|baje|o'clock)\b|\b(morning|afternoon|evening|noon|tonight|subah|dopahar|shaam|sham|raat)\b|सुबह|दोपहर|शाम|\d{1,2}\s*बजे",
    )
    .expect("valid time pattern")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(today|tomorrow|day after tomorrow|aaj|kal|parso|parson|monday|tuesday|wednesday|thursday|friday|saturday|sunday|next week|this week|weekend|somvar|mangalvar|budhvar|guruvar|shukravar|shanivar|ravivar)\b|\b\d{1,2}(st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b|\b\d{1,2}[/-]\d{1,2}([/-]\d{2,4})?\b|आज|कल|परसों",
    )
    .expect("valid date pattern")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+91[\s-]?|\b0)?[6-9]\d{4}[\s-]?\d{5}\b|\+\d{10,14}\b")
        .expect("valid phone pattern")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid email pattern")
});

static DECISION_MAKER_YES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(i'?m|i am|main)\s+(the\s+)?(owner|proprietor|director|founder|malik)\b|\bi\s+(own|run)\s+(it|this|the)\b|\bi\s+(decide|make the decisions?)\b|\bmera\s+(hi\s+)?(business|clinic|shop|dukaan)\b|\bmain\s+hi\s+dekhta\b",
    )
    .expect("valid decision-maker pattern")
});

static DECISION_MAKER_NO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bnot\s+the\s+(owner|decision)|\b(ask|talk to|speak to|check with)\s+(my\s+)?(boss|partner|manager|owner|sir)\b|\b(sir|boss|malik)\s+se\s+(baat|poochna)",
    )
    .expect("valid non-decision-maker pattern")
});

static PROVIDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:using|use|with|through|via|on)\s+(justdial|google ads|google|facebook|instagram|indiamart|sulekha|practo|an? agency|another agency)\b",
    )
    .expect("valid provider pattern")
});

static PAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(problem|issue|struggl\w*|not getting|very few|too few|less|low|losing|slow)\b.*\b(customers?|clients?|patients?|leads?|calls?|business|sales|enquir\w*)\b|\b(customers?|patients?|leads?|business)\s+(kam|nahi aa)",
    )
    .expect("valid pain-point pattern")
});

static BUDGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:budget|spend|afford|₹|\brs\.?|\binr)\s*(?:is|of|around|about|upto|up to)?\s*([\d,.]+\s*(?:k|lakh|lakhs|thousand|hazaar|crore)?)|([\d,.]+\s*(?:k|lakh|lakhs|thousand|hazaar))\s*(?:per month|a month|monthly|mahina|mahine)",
    )
    .expect("valid budget pattern")
});

static TIMELINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(urgent(ly)?|asap|immediately|right away|this week|next week|this month|next month|in \d+ (days?|weeks?|months?)|jaldi|turant)\b|तुरंत|जल्दी",
    )
    .expect("valid timeline pattern")
});

/// Structured mentions found in an utterance
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub times: Vec<String>,
    pub dates: Vec<String>,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
            && self.dates.is_empty()
            && self.phones.is_empty()
            && self.emails.is_empty()
    }

    /// "date time" mention suitable for an appointment or callback slot
    pub fn when(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .dates
            .iter()
            .chain(self.times.iter())
            .map(String::as_str)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

pub fn extract_entities(text: &str) -> ExtractedEntities {
    ExtractedEntities {
        times: find_all(&TIME_RE, text),
        dates: find_all(&DATE_RE, text),
        phones: find_all(&PHONE_RE, text)
            .into_iter()
            .map(|p| p.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect())
            .collect(),
        emails: find_all(&EMAIL_RE, text)
            .into_iter()
            .map(|e| e.to_lowercase())
            .collect(),
    }
}

/// Qualification fields mentioned in an utterance
pub fn extract_qualification(text: &str) -> QualificationData {
    let mut q = QualificationData::default();

    if DECISION_MAKER_NO_RE.is_match(text) {
        q.set_decision_maker(false);
    } else if DECISION_MAKER_YES_RE.is_match(text) {
        q.set_decision_maker(true);
    }

    if let Some(provider) = PROVIDER_RE.captures(text).and_then(|c| c.get(1)) {
        q.set_current_provider(provider.as_str());
    }

    if PAIN_RE.is_match(text) {
        q.set_pain_points(truncate(text.trim(), 200));
    }

    if let Some(caps) = BUDGET_RE.captures(text) {
        if let Some(amount) = caps.get(1).or_else(|| caps.get(2)) {
            q.set_budget(amount.as_str().trim());
        }
    }

    if let Some(timeline) = TIMELINE_RE.find(text) {
        q.set_timeline(timeline.as_str());
    }

    q
}

fn find_all(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let value = m.as_str().trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
