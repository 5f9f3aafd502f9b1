//! Query expansion: synonyms, plural bridging and prefix wildcards.
//!
//! The output is a boolean OR-expression in the syntax both lexical
//! backends accept:
//!
//! ```text
//! expr  := term ( " OR " term )*
//! term  := (bare | quoted) "*"?
//! bare  := [alnum_]+
//! quoted:= '"' ( any char, '""' for a literal quote )+ '"'
//! ```

use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::error::{InvError, Result};
use crate::search::synonyms::{self, SynonymTable};

/// Marker appended to a term to request prefix matching.
pub const WILDCARD: char = '*';

const PLURAL_SUFFIXES: [&str; 2] = ["es", "s"];

/// A single lexical term, optionally prefix-matched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LexicalTerm {
    pub text: String,
    pub prefix: bool,
}

impl LexicalTerm {
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prefix: false,
        }
    }

    #[must_use]
    pub fn prefix(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prefix: true,
        }
    }

    /// Whether the text can be emitted without quoting.
    #[must_use]
    pub fn is_bare(&self) -> bool {
        is_bareword(&self.text)
    }

    /// Split the text into lowercase words, the way the indexes tokenize it.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        self.text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl fmt::Display for LexicalTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bare() {
            f.write_str(&self.text)?;
        } else {
            write!(f, "\"{}\"", self.text.replace('"', "\"\""))?;
        }
        if self.prefix {
            write!(f, "{WILDCARD}")?;
        }
        Ok(())
    }
}

fn is_bareword(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Serialize terms as an OR-expression.
#[must_use]
pub fn to_or_expression(terms: &[LexicalTerm]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Parse an OR-expression back into terms.
///
/// Whitespace-separated terms without an explicit `OR` are also accepted.
/// Any other operator, an unterminated quote, an empty phrase or a stray
/// wildcard is a [`InvError::QueryParse`].
pub fn parse_or_expression(input: &str) -> Result<Vec<LexicalTerm>> {
    let mut terms = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else { break };

        let text = if first == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') if chars.next_if_eq(&'"').is_some() => text.push('"'),
                    Some('"') => break,
                    Some(c) => text.push(c),
                    None => {
                        return Err(InvError::QueryParse(format!(
                            "unterminated quote in {input:?}"
                        )));
                    }
                }
            }
            if text.trim().is_empty() {
                return Err(InvError::QueryParse("empty phrase".to_string()));
            }
            text
        } else {
            let mut text = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != WILDCARD) {
                text.push(c);
            }
            if text.is_empty() {
                return Err(InvError::QueryParse(format!(
                    "wildcard without a term in {input:?}"
                )));
            }
            text
        };

        let prefix = chars.next_if_eq(&WILDCARD).is_some();
        if let Some(c) = chars.peek()
            && !c.is_whitespace()
        {
            return Err(InvError::QueryParse(format!(
                "unexpected {c:?} after term {text:?}"
            )));
        }

        if first != '"' {
            if text == "OR" && !prefix {
                continue;
            }
            if matches!(text.as_str(), "AND" | "NOT" | "NEAR") {
                return Err(InvError::QueryParse(format!(
                    "unsupported operator {text}"
                )));
            }
            if !is_bareword(&text) {
                return Err(InvError::QueryParse(format!(
                    "term {text:?} must be quoted"
                )));
            }
        }

        terms.push(LexicalTerm { text, prefix });
    }

    Ok(terms)
}

/// Search terms derived from one raw query. Lives for a single search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    words: Vec<String>,
    terms: BTreeSet<String>,
}

impl ExpandedQuery {
    /// Normalized words of the raw query, in query order.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Every base term (query words, synonyms, bridged forms) before de-duplication.
    #[must_use]
    pub const fn terms(&self) -> &BTreeSet<String> {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms handed to the lexical retriever, sorted.
    ///
    /// A base term is dropped when a shorter bare base term is its prefix,
    /// since that term's wildcard already matches it. Every surviving base
    /// is emitted bare and wildcarded.
    #[must_use]
    pub fn lexical_terms(&self) -> Vec<LexicalTerm> {
        let bare: Vec<&str> = self
            .terms
            .iter()
            .map(String::as_str)
            .filter(|t| is_bareword(t))
            .collect();

        let mut out: Vec<LexicalTerm> = self
            .terms
            .iter()
            .filter(|term| !is_subsumed(term, &bare))
            .flat_map(|term| [LexicalTerm::exact(term.clone()), LexicalTerm::prefix(term.clone())])
            .collect();
        out.sort_by_cached_key(ToString::to_string);
        out
    }

    /// The OR-expression for the lexical retriever.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        to_or_expression(&self.lexical_terms())
    }

    /// Unwildcarded OR of the raw query words, used when the expanded
    /// expression is rejected.
    #[must_use]
    pub fn fallback_query(&self) -> String {
        let terms: Vec<LexicalTerm> = self
            .words
            .iter()
            .unique()
            .map(|w| LexicalTerm::exact(w.clone()))
            .collect();
        to_or_expression(&terms)
    }

    /// Whether `term` is matched by the emitted expression, either directly
    /// or through a wildcard.
    #[must_use]
    pub fn covers(&self, term: &str) -> bool {
        self.lexical_terms().iter().any(|t| {
            t.text == term || (t.prefix && is_bareword(&t.text) && term.starts_with(&t.text))
        })
    }
}

fn is_subsumed(term: &str, bare: &[&str]) -> bool {
    is_bareword(term)
        && bare
            .iter()
            .any(|p| p.len() < term.len() && term.starts_with(p))
}

/// Expands raw queries against a [`SynonymTable`].
#[derive(Debug, Clone, Copy)]
pub struct QueryExpander<'a> {
    table: &'a SynonymTable,
}

impl Default for QueryExpander<'static> {
    fn default() -> Self {
        Self::new(synonyms::catalog())
    }
}

impl<'a> QueryExpander<'a> {
    #[must_use]
    pub const fn new(table: &'a SynonymTable) -> Self {
        Self { table }
    }

    /// Expand a raw query.
    ///
    /// Callers short-circuit blank queries before getting here; a blank
    /// query expands to nothing.
    #[must_use]
    pub fn expand(&self, raw_query: &str) -> ExpandedQuery {
        self.expand_words(tokenize(raw_query))
    }

    /// Expand pre-tokenized words.
    pub fn expand_words<I, S>(&self, words: I) -> ExpandedQuery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        let mut terms = BTreeSet::new();

        for word in &words {
            terms.insert(word.clone());
            self.add_related(word, &mut terms);

            for suffix in PLURAL_SUFFIXES {
                if let Some(stem) = word.strip_suffix(suffix)
                    && !stem.is_empty()
                    && self.table.contains(stem)
                {
                    self.add_related(stem, &mut terms);
                }
                let plural = format!("{word}{suffix}");
                if self.table.contains(&plural) {
                    self.add_related(&plural, &mut terms);
                }
            }
        }

        ExpandedQuery { words, terms }
    }

    fn add_related(&self, term: &str, terms: &mut BTreeSet<String>) {
        terms.extend(self.table.related_terms(term).into_iter().map(str::to_string));
    }
}

/// Lowercase, split on whitespace and trim surrounding punctuation.
#[must_use]
pub fn tokenize(raw_query: &str) -> Vec<String> {
    raw_query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}
