//! Column Schema Mapper.
//!
//! Raw workbook headers drifted across seasons. Each known header set is an
//! explicit [`HeaderVersion`] table of canonical field → accepted labels; the
//! mapper picks the version resolving the most fields (declaration order
//! breaks ties) and never branches per file.

use std::collections::BTreeMap;

use unicode_normalization::UnicodeNormalization;
use umaji_core::entities::CanonicalRow;
use umaji_core::enums::CanonicalField;

use crate::error::WorkbookError;
use crate::reader::SheetRow;

type FieldLabels = (CanonicalField, &'static [&'static str]);

/// One known header-set layout.
#[derive(Debug)]
pub struct HeaderVersion {
    pub name: &'static str,
    /// Labels in priority order for each field.
    pub fields: &'static [FieldLabels],
}

/// Japanese-labelled workbooks (2025 season onward).
pub const V2025: HeaderVersion = HeaderVersion {
    name: "v2025",
    fields: &[
        (CanonicalField::SourceDate, &["日付", "開催日", "年月日"]),
        (CanonicalField::RaceId, &["レースID(新)", "レースID"]),
        (CanonicalField::Venue, &["場所", "場名", "競馬場", "開催場"]),
        (CanonicalField::RaceNumber, &["R", "レース番号", "レースNo"]),
        (CanonicalField::HorseName, &["馬名S", "馬名"]),
        (CanonicalField::Umaban, &["馬番", "馬番/枠番"]),
        (CanonicalField::RaceName, &["レース名"]),
        (CanonicalField::MorningOdds, &["朝一オッズ", "朝一", "単オッズ", "単勝"]),
        (CanonicalField::Mark1, &["馬印1"]),
        (CanonicalField::Mark2, &["馬印2"]),
        (CanonicalField::Mark3, &["馬印3"]),
        (CanonicalField::Mark4, &["馬印4"]),
        (CanonicalField::Mark5, &["馬印5"]),
        (CanonicalField::Mark6, &["馬印6"]),
        (CanonicalField::Mark7, &["馬印7"]),
        (CanonicalField::Mark8, &["馬印8"]),
        (CanonicalField::ZiIndex, &["ZI指数", "ZI"]),
        (CanonicalField::ZmValue, &["ZM", "ZM値"]),
    ],
};

/// English-labelled workbooks (2024 season).
pub const V2024: HeaderVersion = HeaderVersion {
    name: "v2024",
    fields: &[
        (CanonicalField::SourceDate, &["SourceDate", "Date"]),
        (CanonicalField::RaceId, &["RaceId"]),
        (CanonicalField::Venue, &["JyoCD", "Venue", "Track"]),
        (CanonicalField::RaceNumber, &["RaceNum", "RaceNumber", "Race"]),
        (CanonicalField::HorseName, &["HorseName", "Bamei", "Horse"]),
        (CanonicalField::Umaban, &["Umaban", "HorseNo"]),
        (CanonicalField::RaceName, &["RaceName", "Hondai"]),
        (CanonicalField::MorningOdds, &["MorningOdds", "Odds"]),
        (CanonicalField::Mark1, &["Mark1"]),
        (CanonicalField::Mark2, &["Mark2"]),
        (CanonicalField::Mark3, &["Mark3"]),
        (CanonicalField::Mark4, &["Mark4"]),
        (CanonicalField::Mark5, &["Mark5"]),
        (CanonicalField::Mark6, &["Mark6"]),
        (CanonicalField::Mark7, &["Mark7"]),
        (CanonicalField::Mark8, &["Mark8"]),
        (CanonicalField::ZiIndex, &["ZI_INDEX"]),
        (CanonicalField::ZmValue, &["ZM_VALUE"]),
    ],
};

pub const HEADER_VERSIONS: [&HeaderVersion; 2] = [&V2025, &V2024];

/// Fields whose candidate columns are coalesced per row instead of picking one.
const COALESCED: [CanonicalField; 1] = [CanonicalField::MorningOdds];

/// Matching key for a header: NFKC, lowercase, no whitespace or delimiters.
///
/// `" 馬名Ｓ "`, `"馬名S"` and `"馬名_s"` share a key.
#[must_use]
pub fn header_key(raw: &str) -> String {
    raw.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '・' | '.' | '/' | '(' | ')'))
        .collect()
}

/// Resolved mapping for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub version: &'static str,
    pub headers: Vec<String>,
    /// Column indices per mapped field, in priority order. Single-column
    /// fields hold exactly one index.
    pub columns: BTreeMap<CanonicalField, Vec<usize>>,
    pub warnings: Vec<String>,
}

impl ColumnMapping {
    #[must_use]
    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Canonical fields no header mapped to. Every row holds null for these.
    #[must_use]
    pub fn unmapped_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| !self.is_mapped(*f))
            .collect()
    }

    /// Raw headers that feed no canonical field.
    #[must_use]
    pub fn unmapped_headers(&self) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(idx, h)| {
                !h.is_empty() && !self.columns.values().any(|cols| cols.contains(idx))
            })
            .map(|(_, h)| h.clone())
            .collect()
    }

    /// Canonical field name → raw header(s), for diagnostics.
    #[must_use]
    pub fn describe(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|(field, cols)| {
                let labels: Vec<&str> = cols
                    .iter()
                    .filter_map(|idx| self.headers.get(*idx).map(String::as_str))
                    .collect();
                (field.as_str().to_string(), labels.join(" | "))
            })
            .collect()
    }

    /// Project one sheet row onto the canonical fields. Values are kept as
    /// printed; blank cells count as absent.
    #[must_use]
    pub fn map_row(&self, row: &SheetRow) -> CanonicalRow {
        let mut mapped = CanonicalRow::new(row.line);
        for (field, cols) in &self.columns {
            let value = cols
                .iter()
                .filter_map(|idx| row.cells.get(*idx))
                .find(|v| !v.trim().is_empty());
            if let Some(value) = value {
                mapped.set(*field, value.as_str());
            }
        }
        mapped
    }
}

/// Map raw headers onto the canonical field set.
///
/// # Errors
///
/// Returns `WorkbookError::UnresolvableSchema` (with the raw header list) when
/// no version can supply a horse name plus either a race id or both venue and
/// race number.
pub fn map_headers(headers: &[String]) -> Result<ColumnMapping, WorkbookError> {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();

    let mut best: Option<ColumnMapping> = None;
    for version in HEADER_VERSIONS {
        let candidate = resolve_version(version, headers, &keys);
        let better = best
            .as_ref()
            .is_none_or(|b| candidate.columns.len() > b.columns.len());
        if better {
            best = Some(candidate);
        }
    }

    let Some(mapping) = best else {
        return Err(WorkbookError::UnresolvableSchema {
            headers: headers.to_vec(),
            missing: vec![CanonicalField::HorseName.as_str().to_string()],
        });
    };

    let missing = missing_identity(&mapping);
    if !missing.is_empty() {
        return Err(WorkbookError::UnresolvableSchema {
            headers: headers.to_vec(),
            missing,
        });
    }

    for warning in &mapping.warnings {
        tracing::warn!(version = mapping.version, "{warning}");
    }
    Ok(mapping)
}

fn resolve_version(version: &'static HeaderVersion, headers: &[String], keys: &[String]) -> ColumnMapping {
    let mut columns = BTreeMap::new();
    let mut warnings = Vec::new();

    for (field, labels) in version.fields {
        let mut matched: Vec<usize> = Vec::new();
        for label in *labels {
            let label_key = header_key(label);
            for (idx, key) in keys.iter().enumerate() {
                if *key == label_key && !matched.contains(&idx) {
                    matched.push(idx);
                }
            }
        }
        if matched.is_empty() {
            continue;
        }

        if COALESCED.contains(field) {
            columns.insert(*field, matched);
            continue;
        }

        if matched.len() > 1 {
            let chosen = *matched.iter().min().unwrap_or(&matched[0]);
            let names: Vec<&str> = matched.iter().map(|i| headers[*i].as_str()).collect();
            warnings.push(format!(
                "ambiguous columns {names:?} for {field}; using left-most '{}'",
                headers[chosen]
            ));
            matched = vec![chosen];
        }
        columns.insert(*field, matched);
    }

    ColumnMapping {
        version: version.name,
        headers: headers.to_vec(),
        columns,
        warnings,
    }
}

fn missing_identity(mapping: &ColumnMapping) -> Vec<String> {
    let mut missing = Vec::new();
    if !mapping.is_mapped(CanonicalField::HorseName) {
        missing.push(CanonicalField::HorseName.as_str().to_string());
    }
    if !mapping.is_mapped(CanonicalField::RaceId) {
        for field in [CanonicalField::Venue, CanonicalField::RaceNumber] {
            if !mapping.is_mapped(field) {
                missing.push(field.as_str().to_string());
            }
        }
    }
    missing
}
