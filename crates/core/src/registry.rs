//! Slug-keyed catalog of report types.
//!
//! Populated explicitly at process start by [`ReportRegistry::with_builtin_reports`];
//! listing order is registration order.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::report::ReportType;

#[derive(Clone, Default)]
pub struct ReportRegistry {
    reports: IndexMap<&'static str, Arc<dyn ReportType>>,
}

impl std::fmt::Debug for ReportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRegistry")
            .field("reports", &self.reports.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in report.
    pub fn with_builtin_reports() -> Result<Self, CoreError> {
        let mut registry = Self::new();
        for report in crate::reports::builtin() {
            registry.register(report)?;
        }
        Ok(registry)
    }

    /// Add a report type. Empty or already-registered slugs are a conflict.
    pub fn register(&mut self, report: Arc<dyn ReportType>) -> Result<(), CoreError> {
        let slug = report.slug();
        if slug.trim().is_empty() {
            return Err(CoreError::Conflict("report slug must not be empty".into()));
        }
        if self.reports.contains_key(slug) {
            return Err(CoreError::Conflict(format!(
                "report '{slug}' is already registered"
            )));
        }
        self.reports.insert(slug, report);
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Result<Arc<dyn ReportType>, CoreError> {
        self.reports
            .get(slug)
            .cloned()
            .ok_or_else(|| CoreError::not_found("report", slug))
    }

    /// Snapshot of the catalog; changes to it do not affect the registry.
    pub fn list_all(&self) -> IndexMap<&'static str, Arc<dyn ReportType>> {
        self.reports.clone()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::params::{ParamSpec, ReportParams};
    use crate::sales::SalesData;
    use crate::table::TabularResult;
    use crate::types::LocalTime;

    struct Named(&'static str);

    impl ReportType for Named {
        fn slug(&self) -> &'static str {
            self.0
        }
        fn title(&self) -> &'static str {
            "Named"
        }
        fn labels(&self) -> &'static [(&'static str, &'static str)] {
            &[]
        }
        fn params(&self) -> &'static [ParamSpec] {
            &[]
        }
        fn explanation(&self) -> &'static str {
            ""
        }
        fn compute(&self, _: &SalesData, _: &ReportParams, _: LocalTime) -> Result<TabularResult, CoreError> {
            Ok(TabularResult::default())
        }
    }

    #[test]
    fn duplicate_slug_is_conflict() {
        let mut registry = ReportRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        assert_matches!(registry.register(Arc::new(Named("a"))), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn empty_slug_is_conflict() {
        let mut registry = ReportRegistry::new();
        assert_matches!(registry.register(Arc::new(Named(" "))), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn unknown_slug_is_not_found() {
        let registry = ReportRegistry::new();
        assert_matches!(registry.get("nope").err(), Some(CoreError::NotFound { entity: "report", .. }));
    }

    #[test]
    fn list_all_is_a_copy_in_registration_order() {
        let mut registry = ReportRegistry::new();
        registry.register(Arc::new(Named("b"))).unwrap();
        registry.register(Arc::new(Named("a"))).unwrap();

        let mut listed = registry.list_all();
        assert_eq!(listed.keys().copied().collect::<Vec<_>>(), vec!["b", "a"]);
        listed.clear();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn builtin_catalog_is_complete() {
        let registry = ReportRegistry::with_builtin_reports().unwrap();
        let slugs: Vec<_> = registry.list_all().keys().copied().collect();
        assert_eq!(
            slugs,
            vec![
                "average_check",
                "abc_clients",
                "abc_goods",
                "inactive_clients",
                "new_customers",
                "purchase_frequency",
                "declined_items",
            ]
        );
    }
}
