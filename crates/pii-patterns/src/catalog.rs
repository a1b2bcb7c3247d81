//! Ordered pattern collection handed to the detection engine.

use std::collections::HashMap;

use crate::builtin::builtin_catalog;
use crate::descriptor::{PatternCategory, PatternDescriptor, PatternSpec};
use crate::error::Result;

/// An ordered set of compiled patterns.
///
/// Position in the catalog is the registration order; the engine uses
/// it as the final tie-break when priorities and start offsets match.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    patterns: Vec<PatternDescriptor>,
}

impl PatternCatalog {
    /// Catalog holding the built-in pattern set.
    pub fn builtin() -> Self {
        Self {
            patterns: builtin_catalog(),
        }
    }

    /// Catalog from pre-compiled descriptors.
    pub fn new(patterns: Vec<PatternDescriptor>) -> Self {
        Self { patterns }
    }

    /// Empty catalog.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Vet, compile, and append custom specs. Any failure rejects the
    /// whole batch and leaves the catalog unchanged.
    pub fn with_custom(mut self, specs: &[PatternSpec]) -> Result<Self> {
        let compiled: Vec<PatternDescriptor> = specs
            .iter()
            .map(|spec| spec.compile())
            .collect::<Result<_>>()?;
        self.patterns.extend(compiled);
        Ok(self)
    }

    /// Append one compiled descriptor.
    pub fn add(&mut self, descriptor: PatternDescriptor) {
        self.patterns.push(descriptor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDescriptor> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Look up a descriptor by kind.
    pub fn get(&self, kind: &str) -> Option<&PatternDescriptor> {
        self.patterns.iter().find(|d| d.kind == kind)
    }

    /// Descriptors matching the caller's filters, in registration order.
    ///
    /// A kind allow-list takes precedence; categories apply only when
    /// no allow-list is given. No filters selects everything.
    pub fn select(
        &self,
        kinds: Option<&[String]>,
        categories: Option<&[PatternCategory]>,
    ) -> Vec<&PatternDescriptor> {
        self.patterns
            .iter()
            .filter(|d| match (kinds, categories) {
                (Some(allow), _) => allow.iter().any(|k| k == &d.kind),
                (None, Some(cats)) => cats.contains(&d.category),
                (None, None) => true,
            })
            .collect()
    }

    /// Apply per-kind priority adjustments, saturating on overflow.
    /// Unknown kinds are ignored.
    pub fn apply_priority_deltas(&mut self, deltas: &HashMap<String, i32>) {
        for descriptor in &mut self.patterns {
            if let Some(delta) = deltas.get(&descriptor.kind) {
                descriptor.priority = descriptor.priority.saturating_add(*delta);
            }
        }
    }
}

impl<'a> IntoIterator for &'a PatternCatalog {
    type Item = &'a PatternDescriptor;
    type IntoIter = std::slice::Iter<'a, PatternDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_nonempty() {
        let catalog = PatternCatalog::builtin();
        assert!(catalog.len() > 30);
        assert!(catalog.get("email").is_some());
        assert!(catalog.get("phone_extension").is_some());
        assert!(catalog.get("nonexistent").is_none());
    }

    #[test]
    fn test_select_by_kind() {
        let catalog = PatternCatalog::builtin();
        let kinds = vec!["email".to_string(), "ssn".to_string()];
        let selected = catalog.select(Some(&kinds), None);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_by_category() {
        let catalog = PatternCatalog::builtin();
        let cats = vec![PatternCategory::Credential];
        let selected = catalog.select(None, Some(&cats));
        assert!(!selected.is_empty());
        assert!(selected
            .iter()
            .all(|d| d.category == PatternCategory::Credential));
    }

    #[test]
    fn test_kind_filter_wins_over_categories() {
        let catalog = PatternCatalog::builtin();
        let kinds = vec!["email".to_string()];
        let cats = vec![PatternCategory::Credential];
        let selected = catalog.select(Some(&kinds), Some(&cats));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].kind, "email");
    }

    #[test]
    fn test_with_custom_appends() {
        let catalog = PatternCatalog::builtin()
            .with_custom(&[PatternSpec::new("employee_id", r"EMP-\d{6}")])
            .unwrap();
        assert!(catalog.get("employee_id").is_some());
    }

    #[test]
    fn test_with_custom_rejects_unsafe() {
        let result = PatternCatalog::builtin().with_custom(&[PatternSpec::new("bad", r"(a+)+")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_priority_deltas() {
        let mut catalog = PatternCatalog::builtin();
        let before = catalog.get("email").unwrap().priority;
        let mut deltas = HashMap::new();
        deltas.insert("email".to_string(), 10);
        deltas.insert("unknown_kind".to_string(), 99);
        catalog.apply_priority_deltas(&deltas);
        assert_eq!(catalog.get("email").unwrap().priority, before + 10);
    }
}
