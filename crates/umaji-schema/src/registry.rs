//! Central schema registry for umaji report types.
//!
//! The `SchemaRegistry` builds JSON Schemas from umaji-core types at
//! construction time using [`schemars::schema_for!`] and validates via
//! `jsonschema`.

use std::collections::HashMap;

use schemars::schema_for;

use crate::error::SchemaError;

/// Every JSON shape `umaji` emits, by name.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert($name, schema_for!($ty).to_value());
    };
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        use umaji_core::entities::{MarkAuditEntry, MarkDiff, MarkRecord};
        use umaji_core::responses::{
            AnomalyReport, ConsistencyReport, HeaderSurvey, ImportFileSummary, ImportReport,
            QuarantinePlan, QuarantinePreview, QuarantineReport,
        };

        let mut schemas = HashMap::new();

        // --- Stored entities (3) ---
        register!(schemas, "mark_record", MarkRecord);
        register!(schemas, "mark_diff", MarkDiff);
        register!(schemas, "mark_audit_entry", MarkAuditEntry);

        // --- Command responses (8) ---
        register!(schemas, "import_report", ImportReport);
        register!(schemas, "import_file_summary", ImportFileSummary);
        register!(schemas, "anomaly_report", AnomalyReport);
        register!(schemas, "quarantine_plan", QuarantinePlan);
        register!(schemas, "quarantine_preview", QuarantinePreview);
        register!(schemas, "quarantine_report", QuarantineReport);
        register!(schemas, "consistency_report", ConsistencyReport);
        register!(schemas, "header_survey", HeaderSurvey);

        Self { schemas }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// All registered schema names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use umaji_core::entities::{FieldChange, IdentityKey, MarkDiff};
    use umaji_core::enums::{ErrorKind, FileStatus, ImportMode};
    use umaji_core::responses::{AnomalyReport, ImportFileSummary, ImportReport};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[test]
    fn registry_has_expected_schemas() {
        let reg = registry();
        assert_eq!(reg.schema_count(), 11);
        for name in [
            "mark_record",
            "mark_diff",
            "mark_audit_entry",
            "import_report",
            "import_file_summary",
            "anomaly_report",
            "quarantine_plan",
            "quarantine_preview",
            "quarantine_report",
            "consistency_report",
            "header_survey",
        ] {
            assert!(reg.get(name).is_some(), "Missing expected schema: {name}");
        }
    }

    #[test]
    fn registry_list_is_sorted() {
        let names = registry().list();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn import_report_validates() {
        let mut failed = ImportFileSummary::new("20250929.xlsx", Some("20250929".into()));
        failed.fail(ErrorKind::UnreadableWorkbook, "file not found");
        let mut ok = ImportFileSummary::new("20250928.xlsx", Some("20250928".into()));
        ok.inserted = 3;
        ok.diffs.push(MarkDiff {
            key: IdentityKey {
                source_date: "20250928".into(),
                venue_code: "06".into(),
                race_number: "11".into(),
                horse_name_normalized: "ナムラクレア".into(),
            },
            changes: vec![FieldChange {
                field: "mark5".into(),
                old: Some("A".into()),
                new: Some("B".into()),
            }],
        });
        let report = ImportReport::from_files(ImportMode::Full, false, vec![ok, failed]);
        assert_eq!(report.files[1].status, FileStatus::Failed);

        let json = serde_json::to_value(&report).unwrap();
        assert!(registry().validate("import_report", &json).is_ok());
    }

    #[test]
    fn empty_anomaly_report_validates() {
        let json = serde_json::to_value(AnomalyReport::default()).unwrap();
        assert!(registry().validate("anomaly_report", &json).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_status() {
        let invalid = serde_json::json!({
            "file": "20250928.xlsx",
            "file_date": null,
            "status": "half_done",
            "header_version": null,
            "inserted": 0, "updated": 0, "unchanged": 0, "conflicted": 0,
            "skipped": 0, "resolved_via_master": 0,
            "field_warnings": [], "skipped_rows": [], "diffs": [],
            "failure": null
        });
        let result = registry().validate("import_file_summary", &invalid);
        assert!(matches!(result, Err(SchemaError::ValidationFailed { .. })));
    }

    #[test]
    fn validate_nonexistent_schema_returns_not_found() {
        let result = registry().validate("bogus", &serde_json::json!({}));
        assert!(matches!(result, Err(SchemaError::NotFound(_))));
    }
}
