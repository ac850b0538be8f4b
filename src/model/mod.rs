//! # Document & Section Model
//!
//! The report is an immutable value: an ordered list of typed sections plus
//! document-level metadata. Every mutation goes through a pure transition
//! method that returns a new `Document`, which keeps the model trivially
//! testable and makes undo/redo a matter of keeping old values around.
//!
//! A section's kind is a sum type. Each variant carries its own payload —
//! stat tiles, free text, or a chart with an optional data binding — and the
//! spreadsheet projection dispatches over the variants rather than a runtime
//! type tag.
//!
//! Array position is the sole ordering mechanism: there is no separate sort
//! key, and removal needs no gap-filling.

use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{BindingSummary, DataBinding, DatasetSource, Row};
use crate::error::{RapportError, Result};
use crate::theme::Theme;

/// How many rows a binding pulls from its dataset when aggregating.
pub const BINDING_ROW_LIMIT: usize = 1000;

/// Opaque, stable section identifier. Assigned once at creation and never
/// reused within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u64);

/// The four permitted section widths, as a percentage of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SectionWidth {
    Quarter,
    Half,
    ThreeQuarter,
    Full,
}

impl SectionWidth {
    /// Ascending order matters: `snap` iterates this array and breaks ties
    /// toward the first (smaller) candidate.
    pub const ALL: [SectionWidth; 4] = [
        SectionWidth::Quarter,
        SectionWidth::Half,
        SectionWidth::ThreeQuarter,
        SectionWidth::Full,
    ];

    pub fn as_percent(self) -> u8 {
        match self {
            SectionWidth::Quarter => 25,
            SectionWidth::Half => 50,
            SectionWidth::ThreeQuarter => 75,
            SectionWidth::Full => 100,
        }
    }

    /// Snap an arbitrary requested width to the nearest permitted value by
    /// minimum absolute difference. The comparison is strict, so an input
    /// exactly between two candidates resolves to the smaller one
    /// (37.5 → 25).
    pub fn snap(requested: f64) -> Self {
        let mut best = SectionWidth::Quarter;
        let mut best_dist = f64::INFINITY;
        for width in Self::ALL {
            let dist = (requested - width.as_percent() as f64).abs();
            if dist < best_dist {
                best = width;
                best_dist = dist;
            }
        }
        best
    }
}

impl From<SectionWidth> for u8 {
    fn from(w: SectionWidth) -> u8 {
        w.as_percent()
    }
}

impl TryFrom<u8> for SectionWidth {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            25 => Ok(SectionWidth::Quarter),
            50 => Ok(SectionWidth::Half),
            75 => Ok(SectionWidth::ThreeQuarter),
            100 => Ok(SectionWidth::Full),
            other => Err(format!("section width must be 25, 50, 75 or 100, got {other}")),
        }
    }
}

/// Direction for adjacent-swap reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Report confidentiality marking, rendered on the cover page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidentiality {
    Public,
    #[default]
    Internal,
    Confidential,
}

/// One metric tile: a display value and its caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
}

/// The chart family of a data-driven section. Tables share the binding and
/// export behavior of charts, so they live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Table,
}

impl ChartKind {
    fn default_title(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Line => "Line Chart",
            ChartKind::Table => "Data Table",
        }
    }

    /// Canonical placeholder rows, shown until a binding produces data.
    pub fn placeholder_rows(self) -> &'static [(&'static str, f64)] {
        match self {
            ChartKind::Bar => &[
                ("Category A", 420.0),
                ("Category B", 310.0),
                ("Category C", 270.0),
                ("Category D", 180.0),
            ],
            ChartKind::Pie => &[
                ("Segment A", 38.0),
                ("Segment B", 27.0),
                ("Segment C", 21.0),
                ("Segment D", 14.0),
            ],
            ChartKind::Line => &[
                ("Jan", 24.0),
                ("Feb", 31.0),
                ("Mar", 28.0),
                ("Apr", 39.0),
                ("May", 45.0),
                ("Jun", 52.0),
            ],
            ChartKind::Table => &[("Item 1", 120.0), ("Item 2", 95.0), ("Item 3", 87.0)],
        }
    }
}

/// A section's typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SectionKind {
    StatCards {
        stats: Vec<Stat>,
    },
    Text {
        content: String,
    },
    Chart {
        chart: ChartKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        binding: Option<DataBinding>,
        /// Derived aggregates. Present only while a complete binding is
        /// attached; cleared wholesale when the binding is removed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<BindingSummary>,
    },
}

impl SectionKind {
    pub fn stat_cards() -> Self {
        SectionKind::StatCards {
            stats: vec![
                Stat {
                    label: "Total Revenue".to_string(),
                    value: "$48,200".to_string(),
                },
                Stat {
                    label: "Active Users".to_string(),
                    value: "1,429".to_string(),
                },
                Stat {
                    label: "Conversion Rate".to_string(),
                    value: "3.2%".to_string(),
                },
            ],
        }
    }

    pub fn text() -> Self {
        SectionKind::Text {
            content: String::new(),
        }
    }

    pub fn chart(chart: ChartKind) -> Self {
        SectionKind::Chart {
            chart,
            binding: None,
            data: None,
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            SectionKind::StatCards { .. } => "Key Metrics",
            SectionKind::Text { .. } => "Text Block",
            SectionKind::Chart { chart, .. } => chart.default_title(),
        }
    }

    /// Chart and table sections start at half width, everything else spans
    /// the full row.
    fn default_width(&self) -> SectionWidth {
        match self {
            SectionKind::Chart { .. } => SectionWidth::Half,
            _ => SectionWidth::Full,
        }
    }
}

/// One typed, orderable block of report content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub width: SectionWidth,
    #[serde(flatten)]
    pub kind: SectionKind,
}

/// A shallow-merge patch for `update_section`. Absent fields keep their
/// current values.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub width: Option<SectionWidth>,
    pub kind: Option<SectionKind>,
}

impl Section {
    fn apply(&self, patch: SectionPatch) -> Section {
        Section {
            id: self.id,
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            width: patch.width.unwrap_or(self.width),
            kind: patch.kind.unwrap_or_else(|| self.kind.clone()),
        }
    }
}

/// A rectangular-grid cell for the spreadsheet projection.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Empty,
    Text(String),
    Number(f64),
}

const TEXT_PLACEHOLDER: &str = "No content yet.";

impl Section {
    /// Project this section to spreadsheet rows: two header rows (title,
    /// blank), then type-specific content rows. Chart sections emit their
    /// bound aggregates when present, otherwise the canonical placeholder
    /// rows for their kind.
    pub fn sheet_rows(&self) -> Vec<Vec<SheetCell>> {
        let mut rows = vec![vec![SheetCell::Text(self.title.clone())], Vec::new()];

        match &self.kind {
            SectionKind::StatCards { stats } => {
                for stat in stats {
                    rows.push(vec![
                        SheetCell::Empty,
                        stat_cell(&stat.value),
                        SheetCell::Text(stat.label.clone()),
                    ]);
                }
            }
            SectionKind::Text { content } => {
                let text = if content.is_empty() {
                    TEXT_PLACEHOLDER.to_string()
                } else {
                    content.clone()
                };
                rows.push(vec![SheetCell::Text(text)]);
            }
            SectionKind::Chart { chart, data, .. } => {
                match data.as_ref().filter(|d| !d.is_empty()) {
                    Some(data) => {
                        for (point, table_row) in data.points.iter().zip(&data.table) {
                            rows.push(vec![
                                SheetCell::Text(point.name.clone()),
                                SheetCell::Number(point.value),
                                SheetCell::Text(table_row.share.clone()),
                            ]);
                        }
                    }
                    None => {
                        for &(name, value) in chart.placeholder_rows() {
                            rows.push(vec![
                                SheetCell::Text(name.to_string()),
                                SheetCell::Number(value),
                            ]);
                        }
                    }
                }
            }
        }

        rows
    }
}

/// Parse a stat's display value as a number where possible so spreadsheet
/// cells come out typed; `$48,200`-style strings stay text.
fn stat_cell(value: &str) -> SheetCell {
    match value.trim().parse::<f64>() {
        Ok(n) => SheetCell::Number(n),
        Err(_) => SheetCell::Text(value.to_string()),
    }
}

/// The ordered collection of sections plus report-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    pub generated_date: NaiveDate,
    #[serde(default)]
    pub cover_page: bool,
    #[serde(default)]
    pub confidentiality: Confidentiality,
    /// Base64 image data URI, validated on the way in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Id counter for new sections. Serialized so ids stay unique across a
    /// save/load cycle.
    #[serde(default = "first_id")]
    next_id: u64,
}

fn first_id() -> u64 {
    1
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            company_name: None,
            theme: Theme::default(),
            generated_date: chrono::Utc::now().date_naive(),
            cover_page: true,
            confidentiality: Confidentiality::default(),
            logo: None,
            sections: Vec::new(),
            next_id: first_id(),
        }
    }

    // ── Metadata transitions ────────────────────────────────────

    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }

    pub fn with_subtitle(&self, subtitle: impl Into<String>) -> Self {
        Self {
            subtitle: subtitle.into(),
            ..self.clone()
        }
    }

    pub fn with_company(&self, company: impl Into<String>) -> Self {
        Self {
            company_name: Some(company.into()),
            ..self.clone()
        }
    }

    pub fn with_theme(&self, theme: Theme) -> Self {
        Self {
            theme,
            ..self.clone()
        }
    }

    pub fn with_cover_page(&self, cover_page: bool) -> Self {
        Self {
            cover_page,
            ..self.clone()
        }
    }

    pub fn with_confidentiality(&self, confidentiality: Confidentiality) -> Self {
        Self {
            confidentiality,
            ..self.clone()
        }
    }

    /// Attach a logo. The value must be a `data:image/...;base64,` URI with
    /// a decodable payload; anything else is rejected rather than stored.
    pub fn with_logo(&self, data_uri: impl Into<String>) -> Result<Self> {
        let data_uri = data_uri.into();
        validate_logo(&data_uri)?;
        Ok(Self {
            logo: Some(data_uri),
            ..self.clone()
        })
    }

    // ── Section transitions ─────────────────────────────────────

    /// Append a section of the given kind with its type-appropriate default
    /// title, width, and payload.
    pub fn add_section(&self, kind: SectionKind) -> Self {
        let mut next = self.clone();
        let section = Section {
            id: SectionId(next.next_id),
            title: kind.default_title().to_string(),
            width: kind.default_width(),
            kind,
        };
        next.next_id += 1;
        next.sections.push(section);
        next
    }

    /// Shallow-merge a patch into the section at `index`. Out-of-range
    /// indices are a no-op.
    pub fn update_section(&self, index: usize, patch: SectionPatch) -> Self {
        let mut next = self.clone();
        if let Some(section) = next.sections.get_mut(index) {
            *section = section.apply(patch);
        }
        next
    }

    /// Remove the section at `index`. Order is positional, so no renumbering
    /// is needed.
    pub fn delete_section(&self, index: usize) -> Self {
        let mut next = self.clone();
        if index < next.sections.len() {
            next.sections.remove(index);
        }
        next
    }

    /// Swap the section at `index` with its neighbor. A no-op at either
    /// boundary.
    pub fn move_section(&self, index: usize, direction: Direction) -> Self {
        let mut next = self.clone();
        let len = next.sections.len();
        match direction {
            Direction::Up if index > 0 && index < len => {
                next.sections.swap(index, index - 1);
            }
            Direction::Down if index + 1 < len => {
                next.sections.swap(index, index + 1);
            }
            _ => {}
        }
        next
    }

    /// Snap `requested` to the nearest permitted width and apply it to the
    /// section at `index`.
    pub fn resize_section(&self, index: usize, requested: f64) -> Self {
        self.update_section(
            index,
            SectionPatch {
                width: Some(SectionWidth::snap(requested)),
                ..Default::default()
            },
        )
    }

    /// Attach a binding to the chart section at `index` and, when the
    /// binding is complete, compute its aggregates from `rows`. Incomplete
    /// bindings are stored without derived data. Non-chart sections are
    /// unchanged.
    pub fn apply_binding(&self, index: usize, binding: DataBinding, rows: &[Row]) -> Self {
        let mut next = self.clone();
        if let Some(section) = next.sections.get_mut(index) {
            if let SectionKind::Chart {
                binding: slot,
                data,
                ..
            } = &mut section.kind
            {
                *data = binding.bind(rows);
                *slot = Some(binding);
            }
        }
        next
    }

    /// Like [`Document::apply_binding`], but pulls the rows through the
    /// dataset port first. Incomplete bindings skip the fetch entirely —
    /// a missing field is an unsatisfied precondition, not a runtime error.
    pub fn apply_binding_from(
        &self,
        index: usize,
        binding: DataBinding,
        source: &dyn DatasetSource,
    ) -> Result<Self> {
        let rows = if binding.is_complete() {
            source.fetch_rows(&binding.dataset_id, BINDING_ROW_LIMIT)?
        } else {
            Vec::new()
        };
        Ok(self.apply_binding(index, binding, &rows))
    }

    /// Clear the binding and all derived fields on the section at `index`.
    pub fn remove_binding(&self, index: usize) -> Self {
        let mut next = self.clone();
        if let Some(section) = next.sections.get_mut(index) {
            if let SectionKind::Chart { binding, data, .. } = &mut section.kind {
                *binding = None;
                *data = None;
            }
        }
        next
    }
}

fn validate_logo(data_uri: &str) -> Result<()> {
    let rest = data_uri
        .strip_prefix("data:image/")
        .ok_or_else(|| RapportError::InvalidLogo("expected a data:image/ URI".to_string()))?;
    let payload = rest
        .split_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| RapportError::InvalidLogo("expected a base64 payload".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| RapportError::InvalidLogo(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregation;
    use serde_json::json;

    fn doc_with(kinds: Vec<SectionKind>) -> Document {
        kinds
            .into_iter()
            .fold(Document::new("Quarterly Review"), |doc, kind| {
                doc.add_section(kind)
            })
    }

    #[test]
    fn test_add_section_defaults() {
        let doc = doc_with(vec![
            SectionKind::stat_cards(),
            SectionKind::chart(ChartKind::Bar),
            SectionKind::text(),
            SectionKind::chart(ChartKind::Table),
        ]);
        let widths: Vec<u8> = doc.sections.iter().map(|s| s.width.as_percent()).collect();
        assert_eq!(widths, vec![100, 50, 100, 50]);
        assert_eq!(doc.sections[0].title, "Key Metrics");
        assert_eq!(doc.sections[3].title, "Data Table");
    }

    #[test]
    fn test_section_ids_are_stable_and_unique() {
        let doc = doc_with(vec![
            SectionKind::text(),
            SectionKind::text(),
            SectionKind::text(),
        ]);
        let before = doc.sections[2].id;
        let doc = doc.delete_section(0).add_section(SectionKind::text());
        assert_eq!(doc.sections[1].id, before);
        let ids: Vec<u64> = doc.sections.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_width_snapping() {
        assert_eq!(SectionWidth::snap(60.0), SectionWidth::Half);
        assert_eq!(SectionWidth::snap(87.0), SectionWidth::Full);
        // Equidistant input resolves to the smaller candidate.
        assert_eq!(SectionWidth::snap(37.5), SectionWidth::Quarter);
        assert_eq!(SectionWidth::snap(62.5), SectionWidth::Half);
        assert_eq!(SectionWidth::snap(-10.0), SectionWidth::Quarter);
        assert_eq!(SectionWidth::snap(400.0), SectionWidth::Full);
    }

    #[test]
    fn test_move_section_reversibility() {
        let doc = doc_with(vec![
            SectionKind::text(),
            SectionKind::stat_cards(),
            SectionKind::chart(ChartKind::Line),
        ]);
        let moved = doc.move_section(1, Direction::Up);
        assert_ne!(moved.sections, doc.sections);
        let restored = moved.move_section(0, Direction::Down);
        assert_eq!(restored.sections, doc.sections);
    }

    #[test]
    fn test_move_section_boundary_noop() {
        let doc = doc_with(vec![SectionKind::text(), SectionKind::text()]);
        assert_eq!(doc.move_section(0, Direction::Up).sections, doc.sections);
        assert_eq!(doc.move_section(1, Direction::Down).sections, doc.sections);
        assert_eq!(doc.move_section(9, Direction::Down).sections, doc.sections);
    }

    #[test]
    fn test_update_section_merges_shallowly() {
        let doc = doc_with(vec![SectionKind::text()]);
        let updated = doc.update_section(
            0,
            SectionPatch {
                title: Some("Summary".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(updated.sections[0].title, "Summary");
        assert_eq!(updated.sections[0].width, doc.sections[0].width);
        assert_eq!(updated.sections[0].id, doc.sections[0].id);
        // Out of range: no-op.
        assert_eq!(doc.update_section(5, SectionPatch::default()), doc);
    }

    #[test]
    fn test_transitions_leave_original_untouched() {
        let doc = doc_with(vec![SectionKind::text()]);
        let _ = doc.delete_section(0);
        let _ = doc.resize_section(0, 30.0);
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].width, SectionWidth::Full);
    }

    fn sales_rows() -> Vec<Row> {
        [
            json!({ "region": "N", "sales": "10" }),
            json!({ "region": "N", "sales": "20" }),
            json!({ "region": "S", "sales": "5" }),
        ]
        .into_iter()
        .map(|v| match v {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        })
        .collect()
    }

    #[test]
    fn test_apply_and_remove_binding() {
        let doc = doc_with(vec![SectionKind::chart(ChartKind::Bar)]);
        let binding = DataBinding {
            dataset_id: "ds-1".to_string(),
            label_field: "region".to_string(),
            value_field: "sales".to_string(),
            aggregation: Aggregation::Sum,
        };

        let bound = doc.apply_binding(0, binding.clone(), &sales_rows());
        let SectionKind::Chart { data, .. } = &bound.sections[0].kind else {
            panic!("expected chart");
        };
        let data = data.as_ref().expect("aggregates attached");
        assert_eq!(data.points[0].value, 30.0);

        let cleared = bound.remove_binding(0);
        let SectionKind::Chart { binding, data, .. } = &cleared.sections[0].kind else {
            panic!("expected chart");
        };
        assert!(binding.is_none());
        assert!(data.is_none());
    }

    #[test]
    fn test_incomplete_binding_attaches_no_data() {
        let doc = doc_with(vec![SectionKind::chart(ChartKind::Pie)]);
        let binding = DataBinding {
            dataset_id: "ds-1".to_string(),
            label_field: "region".to_string(),
            value_field: String::new(),
            aggregation: Aggregation::Sum,
        };
        let bound = doc.apply_binding(0, binding, &sales_rows());
        let SectionKind::Chart { binding, data, .. } = &bound.sections[0].kind else {
            panic!("expected chart");
        };
        assert!(binding.is_some());
        assert!(data.is_none());
    }

    #[test]
    fn test_sheet_rows_stat_cards() {
        let doc = doc_with(vec![SectionKind::StatCards {
            stats: vec![
                Stat {
                    label: "Orders".to_string(),
                    value: "1200".to_string(),
                },
                Stat {
                    label: "Revenue".to_string(),
                    value: "$9,000".to_string(),
                },
            ],
        }]);
        let rows = doc.sections[0].sheet_rows();
        assert_eq!(rows[0], vec![SheetCell::Text("Key Metrics".to_string())]);
        assert!(rows[1].is_empty());
        assert_eq!(
            rows[2],
            vec![
                SheetCell::Empty,
                SheetCell::Number(1200.0),
                SheetCell::Text("Orders".to_string()),
            ]
        );
        assert_eq!(rows[3][1], SheetCell::Text("$9,000".to_string()));
    }

    #[test]
    fn test_sheet_rows_chart_placeholder_and_bound() {
        let doc = doc_with(vec![SectionKind::chart(ChartKind::Line)]);
        let rows = doc.sections[0].sheet_rows();
        // Two header rows plus the canonical six-month line shape.
        assert_eq!(rows.len(), 2 + 6);
        assert_eq!(rows[2][0], SheetCell::Text("Jan".to_string()));

        let binding = DataBinding {
            dataset_id: "ds-1".to_string(),
            label_field: "region".to_string(),
            value_field: "sales".to_string(),
            aggregation: Aggregation::Sum,
        };
        let bound = doc.apply_binding(0, binding, &sales_rows());
        let rows = bound.sections[0].sheet_rows();
        assert_eq!(
            rows[2],
            vec![
                SheetCell::Text("N".to_string()),
                SheetCell::Number(30.0),
                SheetCell::Text("86%".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_text_section_uses_placeholder() {
        let doc = doc_with(vec![SectionKind::text()]);
        let rows = doc.sections[0].sheet_rows();
        assert_eq!(rows[2], vec![SheetCell::Text(TEXT_PLACEHOLDER.to_string())]);
    }

    #[test]
    fn test_logo_validation() {
        let doc = Document::new("Report");
        // 1x1 transparent PNG, truncated payload is still valid base64.
        assert!(doc.with_logo("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(doc.with_logo("https://example.com/logo.png").is_err());
        assert!(doc.with_logo("data:image/png;base64,not!!valid").is_err());
    }
}
