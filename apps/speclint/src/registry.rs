//! Ordered, name-unique collection of rules for one lint profile.

use crate::checks::BuiltinRule;
use crate::error::LintError;
use crate::models::policy::Policy;
use crate::rule::Rule;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile every policy entry, failing on the first invalid or
    /// duplicate rule so nothing is evaluated with a broken profile.
    pub fn from_policy(policy: &Policy) -> Result<Self, LintError> {
        let mut registry = Self::new();
        for spec in &policy.rules {
            registry.register(Arc::new(BuiltinRule::from_spec(spec)?))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), LintError> {
        let name = rule.name();
        if name.trim().is_empty() {
            return Err(LintError::EmptyRuleName);
        }
        if self.contains(name) {
            return Err(LintError::DuplicateRuleName(name.to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Remove a rule by name; absent names are ignored.
    pub fn unregister(&mut self, name: &str) {
        self.rules.retain(|r| r.name() != name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name() == name)
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
