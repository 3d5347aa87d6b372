//! Policy terms and citations
//!
//! Payout line items cite the policy article that governs them. Terms are
//! grouped by the benefit they apply to; coverage codes map onto those
//! groups.

use serde::{Deserialize, Serialize};

use core_kernel::code_enum;
use crate::coverage::codes;

code_enum! {
    /// Section of the policy wording a term belongs to
    pub enum TermCategory {
        General => "GENERAL",
        Coverage => "COVERAGE",
        Exclusion => "EXCLUSION",
        Claim => "CLAIM",
    }
}

/// One article (or clause) of the policy wording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTerm {
    pub term_code: String,
    pub article_number: String,
    pub clause_number: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub calculation_formula: Option<String>,
    pub category: TermCategory,
    /// Benefit groups this term governs (`HOSP_INS`, `SURGERY`, ...)
    pub applies_to: Vec<String>,
}

/// Reference printed next to a payout line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCitation {
    pub article: String,
    pub title: String,
    pub content: String,
    pub formula: String,
}

const EXCERPT_CHARS: usize = 200;

/// Benefit group a coverage code is governed by
pub fn term_group(coverage_code: &str) -> Option<&'static str> {
    match coverage_code {
        codes::HOSP_INSURED => Some("HOSP_INS"),
        codes::HOSP_UNINSURED => Some("HOSP_UNINS"),
        codes::HOSP_DAILY => Some("HOSP_DAILY"),
        codes::OUTPATIENT_INSURED => Some("OUT_INS"),
        codes::OUTPATIENT_UNINSURED => Some("OUT_UNINS"),
        code if code.starts_with(codes::SURGERY_PREFIX) => Some("SURGERY"),
        _ => None,
    }
}

impl PolicyTerm {
    /// Builds the citation, falling back to the computed formula
    pub fn cite(&self, computed_formula: &str) -> TermCitation {
        let article = match &self.clause_number {
            Some(clause) => format!("{} {}", self.article_number, clause),
            None => self.article_number.clone(),
        };
        let content = match &self.summary {
            Some(summary) => summary.clone(),
            None => excerpt(&self.content),
        };
        TermCitation {
            article,
            title: self.title.clone(),
            content,
            formula: self
                .calculation_formula
                .clone()
                .unwrap_or_else(|| computed_formula.to_string()),
        }
    }
}

fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}

/// Term book for a product
#[derive(Debug, Clone, Default)]
pub struct TermBook {
    terms: Vec<PolicyTerm>,
}

impl TermBook {
    pub fn new(terms: Vec<PolicyTerm>) -> Self {
        Self { terms }
    }

    /// First coverage term whose groups include the coverage's group
    pub fn find_for_coverage(&self, coverage_code: &str) -> Option<&PolicyTerm> {
        let group = term_group(coverage_code)?;
        self.terms.iter().find(|t| {
            t.category == TermCategory::Coverage && t.applies_to.iter().any(|g| g == group)
        })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(category: TermCategory, applies_to: &[&str]) -> PolicyTerm {
        PolicyTerm {
            term_code: "T-1".into(),
            article_number: "제3조".into(),
            clause_number: Some("①".into()),
            title: "입원의료비".into(),
            content: "가".repeat(250),
            summary: None,
            calculation_formula: None,
            category,
            applies_to: applies_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_surgery_codes_share_group() {
        assert_eq!(term_group("DIS_SURG_4"), Some("SURGERY"));
        assert_eq!(term_group("UNKNOWN"), None);
    }

    #[test]
    fn test_only_coverage_terms_are_cited() {
        let book = TermBook::new(vec![
            term(TermCategory::Exclusion, &["HOSP_INS"]),
            term(TermCategory::Coverage, &["HOSP_INS", "HOSP_UNINS"]),
        ]);
        let found = book.find_for_coverage("DIS_HOSP_UNINS").unwrap();
        assert_eq!(found.category, TermCategory::Coverage);
        assert!(book.find_for_coverage("DIS_HOSP_DAILY").is_none());
    }

    #[test]
    fn test_citation_excerpts_long_content() {
        let citation = term(TermCategory::Coverage, &[]).cite("a - b");
        assert_eq!(citation.article, "제3조 ①");
        assert_eq!(citation.content.chars().count(), 203);
        assert!(citation.content.ends_with("..."));
        assert_eq!(citation.formula, "a - b");
    }
}
