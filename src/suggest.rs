//! Intake of externally suggested rules.
//!
//! Rule suggestions come from a collaborator outside this crate (in the
//! product, a natural-language helper). Whatever it returns is treated as
//! untrusted input: it is parsed into a [`Rule`], and the dataset is then
//! re-validated with the candidate appended. Nothing is applied without
//! that pass; the caller decides what to do with the resulting report.

use serde_json::Value;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::models::{Rule, RuleParseError};
use crate::report::ValidationReport;
use crate::validation::Validator;

/// What a suggestion source is asked about.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    /// Free-text description of the wanted rule.
    pub description: &'a str,
    /// The data the rule will apply to.
    pub dataset: &'a Dataset,
}

impl<'a> SuggestionContext<'a> {
    /// Describes a wanted rule for the given data.
    pub fn new(description: &'a str, dataset: &'a Dataset) -> Self {
        Self {
            description,
            dataset,
        }
    }
}

/// Errors from suggestion intake.
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// The source could not produce a suggestion.
    #[error("suggestion source failed: {0}")]
    Source(String),

    /// The source answered with something that is not a rule.
    #[error("invalid rule suggestion: {0}")]
    Parse(#[from] RuleParseError),
}

/// Producer of rule suggestions.
pub trait SuggestionSource {
    /// Returns a rule in `{type, parameters, priority}` shape.
    fn suggest(&self, context: &SuggestionContext<'_>) -> Result<Value, SuggestionError>;
}

/// A parsed candidate and the pass run with it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleIntake {
    /// The candidate, with an ID assigned if the source gave none.
    pub rule: Rule,
    /// Findings of the full pass over the dataset plus the candidate.
    pub report: ValidationReport,
}

impl RuleIntake {
    /// Whether the candidate can be adopted without blocking export.
    pub fn is_acceptable(&self) -> bool {
        !self.report.blocks_export()
    }
}

/// Asks `source` for a rule and validates the dataset with it appended.
pub fn intake_rule_suggestion<S: SuggestionSource + ?Sized>(
    source: &S,
    description: &str,
    dataset: &Dataset,
    validator: &Validator,
) -> Result<RuleIntake, SuggestionError> {
    let context = SuggestionContext::new(description, dataset);
    let raw = source.suggest(&context)?;
    let rule = match Rule::from_suggestion(&raw) {
        Ok(rule) => rule,
        Err(err) => {
            tracing::warn!(error = %err, "rejected rule suggestion");
            return Err(err.into());
        }
    };
    Ok(evaluate_candidate(rule, dataset, validator))
}

/// Validates `dataset` with `rule` appended.
///
/// An empty rule ID is replaced by the first free `rule-N`.
pub fn evaluate_candidate(mut rule: Rule, dataset: &Dataset, validator: &Validator) -> RuleIntake {
    if rule.id.is_empty() {
        rule.id = next_rule_id(&dataset.rules);
    }

    let mut rules = dataset.rules.clone();
    rules.push(rule.clone());
    let findings = validator.validate_all(&dataset.clients, &dataset.workers, &dataset.tasks, &rules);
    let report = ValidationReport::new(findings);

    tracing::debug!(
        rule = %rule.id,
        rule_type = rule.type_name(),
        findings = report.len(),
        "evaluated rule candidate"
    );
    RuleIntake { rule, report }
}

fn next_rule_id(rules: &[Rule]) -> String {
    let mut n = rules.len() + 1;
    loop {
        let id = format!("rule-{n}");
        if !rules.iter().any(|r| r.id == id) {
            return id;
        }
        n += 1;
    }
}
