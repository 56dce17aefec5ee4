/*!
 * Terminology glossary.
 *
 * Loads a tab-separated term table (`english<TAB>translation` per line) and
 * answers two questions:
 * - what is the translation of a term (case-insensitive lookup)
 * - which glossary terms appear in a span of text (whole-word matching)
 *
 * Entries keep file-load order; `relevant_terms` is intentionally biased toward
 * terms that appear earlier in the file.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Default cap on terms injected into one prompt
pub const DEFAULT_MAX_TERMS: usize = 50;

/// One canonical term with all of its surface forms
#[derive(Debug, Clone)]
pub struct GlossaryEntry {
    /// First surface form seen for this term
    pub canonical_term: String,
    /// Translation shared by all surface forms
    pub translation: String,
    /// Distinct surface forms in load order, canonical form first
    pub variants: Vec<String>,
    // @field: Compiled whole-word matchers, one per variant
    patterns: Vec<Regex>,
}

impl GlossaryEntry {
    /// Whether any surface form occurs as a whole word in `text`
    pub fn occurs_in(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }
}

/// Read-only term table shared across concurrent translations
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
    index: HashMap<String, usize>,
}

/// Lookup key: lowercase with whitespace removed
fn canonical_key(term: &str) -> String {
    term.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case-insensitive whole-word pattern for one surface form
fn variant_pattern(variant: &str) -> Option<Regex> {
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(variant))) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            warn!("Skipping glossary variant '{}': {}", variant, e);
            None
        }
    }
}

impl Glossary {
    /// Create an empty glossary
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a glossary file.
    ///
    /// A missing file is not an error: a warning is logged and an empty glossary
    /// is returned so translation can proceed without terminology hints.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Glossary file not found: {:?}", path);
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary file: {:?}", path))?;
        let glossary = Self::parse(&content);
        debug!("Loaded {} glossary terms from {:?}", glossary.len(), path);
        Ok(glossary)
    }

    /// Parse glossary text; empty lines and lines without a tab are ignored
    pub fn parse(content: &str) -> Self {
        let mut glossary = Self::new();
        for line in content.lines() {
            let line = line.trim();
            let Some((english, translation)) = line.split_once('\t') else {
                continue;
            };
            let translation = translation.split('\t').next().unwrap_or_default();
            glossary.insert(english.trim(), translation.trim());
        }
        glossary
    }

    /// Add a term; an existing canonical term keeps its translation and gains the surface form
    pub fn insert(&mut self, term: &str, translation: &str) {
        let key = canonical_key(term);
        if key.is_empty() {
            return;
        }

        match self.index.get(&key) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                if !entry.variants.iter().any(|v| v == term) {
                    entry.variants.push(term.to_string());
                    entry.patterns.extend(variant_pattern(term));
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(GlossaryEntry {
                    canonical_term: term.to_string(),
                    translation: translation.to_string(),
                    variants: vec![term.to_string()],
                    patterns: variant_pattern(term).into_iter().collect(),
                });
            }
        }
    }

    /// Case-insensitive lookup of a term's translation
    pub fn lookup(&self, term: &str) -> Option<&str> {
        self.index
            .get(&canonical_key(term))
            .map(|&position| self.entries[position].translation.as_str())
    }

    /// Terms whose surface forms occur as whole words in `text`.
    ///
    /// Entries are visited in file order and collection stops at `max_terms`.
    pub fn relevant_terms(&self, text: &str, max_terms: usize) -> Vec<(String, String)> {
        let mut relevant = Vec::new();
        if max_terms == 0 {
            return relevant;
        }

        for entry in &self.entries {
            if entry.occurs_in(text) {
                relevant.push((entry.canonical_term.clone(), entry.translation.clone()));
                if relevant.len() >= max_terms {
                    break;
                }
            }
        }
        relevant
    }

    /// Render terms as an indented bullet list for the system prompt
    pub fn format_for_prompt(terms: &[(String, String)]) -> String {
        terms
            .iter()
            .map(|(term, translation)| format!("    - {} → {}", term, translation))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
