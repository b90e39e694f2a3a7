//! Statistical extraction backend
//!
//! An in-process document entity recognizer combining regex patterns
//! (dates, numerics) with a gazetteer of known names over a fixed tag
//! set (PERSON, ORG, GPE, DATE, CARDINAL). Overlapping matches are
//! resolved by keeping the longest span.
//!
//! This backend does not expose a confidence score; normalized records
//! carry `None`.

use async_trait::async_trait;
use regex::Regex;

use nerpipe_core::Result;

use crate::{EntityBackend, ExtractedEntity, Extraction};

// ============================================================================
// Tag Set
// ============================================================================

/// Fixed label vocabulary of the statistical recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Person,
    Org,
    Gpe,
    Date,
    Cardinal,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Date => "DATE",
            Self::Cardinal => "CARDINAL",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Recognizer
// ============================================================================

/// A matched span before overlap resolution
#[derive(Debug, Clone)]
struct SpanMatch {
    start: usize,
    end: usize,
    text: String,
    tag: Tag,
}

/// Rule-based recognizer over patterns and a gazetteer
pub struct StatisticalExtractor {
    /// Pattern rules (regex -> tag)
    patterns: Vec<(Regex, Tag)>,
    /// Gazetteer terms compiled to case-insensitive, word-bounded rules
    gazetteer: Vec<(Regex, Tag)>,
}

impl StatisticalExtractor {
    /// Create a recognizer with the default English patterns and gazetteer
    pub fn new() -> Self {
        let mut extractor = Self {
            patterns: Vec::new(),
            gazetteer: Vec::new(),
        };

        extractor.init_patterns();
        extractor.init_gazetteer();
        extractor
    }

    fn init_patterns(&mut self) {
        // ISO and slash dates
        self.add_pattern(r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b", Tag::Date);
        self.add_pattern(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{4}\b", Tag::Date);

        // Month-name dates ("May 1", "January 5, 2020")
        self.add_pattern(
            r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(,\s*\d{4})?\b",
            Tag::Date,
        );

        // Weekdays
        self.add_pattern(
            r"\b(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\b",
            Tag::Date,
        );

        // Bare years
        self.add_pattern(r"\b(19|20)\d{2}\b", Tag::Date);

        // Cardinals, including comma-grouped
        self.add_pattern(r"\b\d{1,3}(,\d{3})+\b", Tag::Cardinal);
        self.add_pattern(r"\b\d+\b", Tag::Cardinal);
    }

    fn init_gazetteer(&mut self) {
        // People
        self.add_term("Barack Obama", Tag::Person);
        self.add_term("Angela Merkel", Tag::Person);
        self.add_term("Vladimir Putin", Tag::Person);
        self.add_term("George Bush", Tag::Person);
        self.add_term("Tony Blair", Tag::Person);

        // Organizations
        self.add_term("United Nations", Tag::Org);
        self.add_term("European Union", Tag::Org);
        self.add_term("White House", Tag::Org);
        self.add_term("NATO", Tag::Org);
        self.add_term("Google", Tag::Org);
        self.add_term("Reuters", Tag::Org);

        // Geopolitical entities
        self.add_term("Hawaii", Tag::Gpe);
        self.add_term("United States", Tag::Gpe);
        self.add_term("London", Tag::Gpe);
        self.add_term("Geneva", Tag::Gpe);
        self.add_term("Iraq", Tag::Gpe);
        self.add_term("Baghdad", Tag::Gpe);
        self.add_term("Chicago", Tag::Gpe);
        self.add_term("Washington", Tag::Gpe);
        self.add_term("Russia", Tag::Gpe);
        self.add_term("China", Tag::Gpe);
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, tag: Tag) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, tag));
        }
    }

    /// Add a gazetteer term, matched case-insensitively on word boundaries
    pub fn add_term(&mut self, term: &str, tag: Tag) {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
        if let Ok(regex) = Regex::new(&pattern) {
            self.gazetteer.push((regex, tag));
        }
    }

    /// Match a rule set against the original text; offsets are byte
    /// indices into `text` itself, never a transformed copy
    fn match_rules(rules: &[(Regex, Tag)], text: &str) -> Vec<SpanMatch> {
        let mut matches = Vec::new();

        for (regex, tag) in rules {
            for mat in regex.find_iter(text) {
                matches.push(SpanMatch {
                    start: mat.start(),
                    end: mat.end(),
                    text: mat.as_str().to_string(),
                    tag: *tag,
                });
            }
        }

        matches
    }

    /// Resolve overlapping matches, keeping the longest span
    fn resolve_overlaps(&self, mut matches: Vec<SpanMatch>) -> Vec<SpanMatch> {
        // Longest first; ties broken by position
        matches.sort_by(|a, b| {
            (b.end - b.start)
                .cmp(&(a.end - a.start))
                .then(a.start.cmp(&b.start))
        });

        let mut selected: Vec<SpanMatch> = Vec::new();
        for candidate in matches {
            let overlaps = selected
                .iter()
                .any(|s| candidate.start < s.end && s.start < candidate.end);
            if !overlaps {
                selected.push(candidate);
            }
        }

        selected.sort_by_key(|m| m.start);
        selected
    }

    /// Run the full recognizer over one document
    pub fn recognize(&self, text: &str) -> Vec<ExtractedEntity> {
        let mut matches = Self::match_rules(&self.gazetteer, text);
        matches.extend(Self::match_rules(&self.patterns, text));

        self.resolve_overlaps(matches)
            .into_iter()
            .map(|m| ExtractedEntity {
                text: m.text,
                label: m.tag.to_string(),
                confidence: None,
            })
            .collect()
    }
}

impl Default for StatisticalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityBackend for StatisticalExtractor {
    async fn extract(&self, text: &str) -> Result<Extraction> {
        let entities = self.recognize(text);
        if entities.is_empty() {
            Ok(Extraction::Empty)
        } else {
            Ok(Extraction::Entities(entities))
        }
    }

    fn name(&self) -> &str {
        "statistical"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gazetteer_person_and_gpe() {
        let ner = StatisticalExtractor::new();
        let entities = ner.recognize("Barack Obama was born in Hawaii.");

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "Barack Obama");
        assert_eq!(entities[0].label, "PERSON");
        assert_eq!(entities[1].text, "Hawaii");
        assert_eq!(entities[1].label, "GPE");
    }

    #[test]
    fn test_confidence_is_always_absent() {
        let ner = StatisticalExtractor::new();
        let entities = ner.recognize("The United Nations met in Geneva in 2004.");
        assert!(!entities.is_empty());
        assert!(entities.iter().all(|e| e.confidence.is_none()));
    }

    #[test]
    fn test_date_patterns() {
        let ner = StatisticalExtractor::new();
        let entities = ner.recognize("The summit on 2004-06-15 was postponed to January 5, 2005.");

        let dates: Vec<&str> = entities
            .iter()
            .filter(|e| e.label == "DATE")
            .map(|e| e.text.as_str())
            .collect();
        assert!(dates.contains(&"2004-06-15"));
        assert!(dates.contains(&"January 5, 2005"));
    }

    #[test]
    fn test_longest_span_wins_overlap() {
        let ner = StatisticalExtractor::new();
        // "January 5, 2005" overlaps the bare-year and cardinal patterns;
        // only the full date span must survive
        let entities = ner.recognize("It happened on January 5, 2005.");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "January 5, 2005");
    }

    #[test]
    fn test_cardinal_extraction() {
        let ner = StatisticalExtractor::new();
        let entities = ner.recognize("About 12,000 protesters gathered.");
        assert_eq!(entities[0].text, "12,000");
        assert_eq!(entities[0].label, "CARDINAL");
    }

    #[test]
    fn test_word_boundary_guard() {
        let ner = StatisticalExtractor::new();
        // "china" inside another word must not match
        let entities = ner.recognize("The machinary broke.");
        assert!(entities.iter().all(|e| e.label != "GPE"));
    }

    #[test]
    fn test_gazetteer_offsets_unaffected_by_multibyte_prefix() {
        let ner = StatisticalExtractor::new();
        // "İ" grows by a byte under lowercasing; matching must still
        // report the correct surface text for terms after it
        let entities = ner.recognize("İzmir and London host the talks.");
        let gpes: Vec<_> = entities.iter().filter(|e| e.label == "GPE").collect();
        assert_eq!(gpes.len(), 1);
        assert_eq!(gpes[0].text, "London");
    }

    #[test]
    fn test_case_insensitive_gazetteer_preserves_surface_form() {
        let ner = StatisticalExtractor::new();
        let entities = ner.recognize("BARACK OBAMA spoke.");
        assert_eq!(entities[0].text, "BARACK OBAMA");
        assert_eq!(entities[0].label, "PERSON");
    }

    #[tokio::test]
    async fn test_backend_empty_outcome() {
        let ner = StatisticalExtractor::new();
        let result = ner.extract("nothing notable here").await.unwrap();
        assert_eq!(result, Extraction::Empty);
    }
}
