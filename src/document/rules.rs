//! The document's stored filter rules.

use crate::search::{FilterRule, SearchRequest};

/// Ordered rule list. A request appears at most once.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    rules: Vec<FilterRule>,
}

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule unless one with the same request already exists.
    pub fn append(&mut self, request: SearchRequest, active: bool) -> bool {
        if self.position(&request).is_some() {
            return false;
        }
        self.rules.push(FilterRule::new(request, active));
        true
    }

    pub fn remove(&mut self, request: &SearchRequest) -> Option<FilterRule> {
        let index = self.position(request)?;
        Some(self.rules.remove(index))
    }

    /// Returns the updated rule, or `None` if absent or already in that state.
    pub fn set_enabled(&mut self, request: &SearchRequest, enabled: bool) -> Option<&FilterRule> {
        let index = self.position(request)?;
        let rule = &mut self.rules[index];
        if rule.active == enabled {
            return None;
        }
        rule.active = enabled;
        Some(rule)
    }

    pub fn toggle(&mut self, request: &SearchRequest) -> Option<&FilterRule> {
        let index = self.position(request)?;
        let rule = &mut self.rules[index];
        rule.active = !rule.active;
        Some(rule)
    }

    pub fn get(&self, request: &SearchRequest) -> Option<&FilterRule> {
        self.rules.iter().find(|rule| &rule.request == request)
    }

    pub fn has_active(&self) -> bool {
        self.rules.iter().any(|rule| rule.active)
    }

    pub fn as_slice(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    fn position(&self, request: &SearchRequest) -> Option<usize> {
        self.rules.iter().position(|rule| &rule.request == request)
    }
}
