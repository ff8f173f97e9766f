//! Status document to metric samples

use overseer_core::{
    overseer_rules, verbose, ExtractionError, ExtractionRule, MetricSample, StatusDocument,
    Transform,
};
use serde_json::Value;

/// Applies a fixed rule set to status documents.
///
/// Per-field failures never fail the cycle: a missing or non-numeric field
/// omits that one sample, a missing membership field yields 0.0.
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    rules: Vec<ExtractionRule>,
    verbose: bool,
}

impl MetricExtractor {
    /// Extractor for the four overseer samples
    pub fn new(verbose: bool) -> Self {
        Self::with_rules(overseer_rules(), verbose)
    }

    pub fn with_rules(rules: Vec<ExtractionRule>, verbose: bool) -> Self {
        Self { rules, verbose }
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Samples for every rule that could be applied, in rule order
    pub fn extract(&self, doc: &StatusDocument, local_identity: &str) -> Vec<MetricSample> {
        self.extract_detailed(doc, local_identity)
            .into_iter()
            .zip(&self.rules)
            .filter_map(|(result, rule)| match result {
                Ok(sample) => Some(sample),
                Err(e) => {
                    verbose!(self.verbose, "Omitting sample {}: {}", rule.sample_name, e);
                    None
                }
            })
            .collect()
    }

    /// One result per rule, in rule order
    pub fn extract_detailed(
        &self,
        doc: &StatusDocument,
        local_identity: &str,
    ) -> Vec<Result<MetricSample, ExtractionError>> {
        self.rules
            .iter()
            .map(|rule| self.apply(rule, doc, local_identity))
            .collect()
    }

    fn apply(
        &self,
        rule: &ExtractionRule,
        doc: &StatusDocument,
        local_identity: &str,
    ) -> Result<MetricSample, ExtractionError> {
        let field = doc.get(&rule.field);

        match rule.transform {
            Transform::MembershipTest => {
                let member = match field {
                    Some(value) => is_member(value, local_identity).unwrap_or_else(|| {
                        verbose!(
                            self.verbose,
                            "Field {} is not a member collection: {}",
                            rule.field,
                            value
                        );
                        false
                    }),
                    None => {
                        verbose!(self.verbose, "Field {} not present, reporting 0", rule.field);
                        false
                    }
                };
                Ok(MetricSample::gauge(
                    &rule.sample_name,
                    if member { 1.0 } else { 0.0 },
                ))
            }
            Transform::Identity => {
                let value = field.ok_or_else(|| ExtractionError::MissingField(rule.field.clone()))?;
                let number = coerce_f64(value).ok_or_else(|| ExtractionError::NotNumeric {
                    field: rule.field.clone(),
                    value: value.to_string(),
                })?;
                Ok(MetricSample::gauge(&rule.sample_name, number))
            }
        }
    }
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Whether `identity` appears in a member collection.
///
/// Arrays match on an equal element; strings (Solr reports the overseer
/// leader as `host:port_solr`) match on substring. `None` for other types.
/// An empty identity matches nothing.
pub fn is_member(value: &Value, identity: &str) -> Option<bool> {
    match value {
        Value::Array(items) => Some(items.iter().any(|item| match item {
            Value::String(s) => s == identity,
            other => other.to_string() == identity,
        })),
        Value::String(s) => Some(!identity.is_empty() && s.contains(identity)),
        _ => None,
    }
}

/// Numbers, and strings holding a finite number
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
