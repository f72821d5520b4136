//! Dataset configuration.
//!
//! A [`DatasetConfig`] describes everything one run needs: the declared
//! field→type schema, how to read the source (delimiter, parse-error
//! policy, date formats, the auditable date-substitution list), the
//! derived columns, the duplicate-check subset, and the named analyses to
//! compute. It is plain serde JSON so a config can be stored next to its
//! dataset and reviewed like code.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::loader::{DateSubstitution, LoadOptions, ParseErrorPolicy};
use crate::table::{Field, FieldType, Schema};
use crate::transform::aggregate::{GroupOrder, Reduce, Reduction};
use crate::transform::derive::Derive;

/// A complete dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Version of the config format.
    #[serde(default = "default_version")]
    pub version: String,

    /// Dataset name, used in reports.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Declared fields, in source-header order or any order.
    pub fields: Vec<Field>,

    /// Delimiter; auto-detected when not set.
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Coercion failure policy.
    #[serde(default)]
    pub on_parse_error: ParseErrorPolicy,

    /// Date formats tried in order.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Documented date stand-ins for named entities.
    #[serde(default)]
    pub substitutions: Vec<DateSubstitution>,

    /// Defensive row ceiling.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Derived columns, applied in order.
    #[serde(default)]
    pub derives: Vec<Derive>,

    /// Field subset for the duplicate report; empty disables the check.
    #[serde(default)]
    pub dedup_subset: Vec<String>,

    /// Named analyses to compute.
    #[serde(default)]
    pub analyses: Vec<Analysis>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_date_formats() -> Vec<String> {
    LoadOptions::default().date_formats
}

fn default_max_rows() -> usize {
    LoadOptions::default().max_rows
}

/// One named analysis over the cleaned table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Analysis {
    /// Group and reduce into a derived table.
    Aggregate {
        name: String,
        group_by: Vec<String>,
        reductions: Vec<Reduction>,
        #[serde(default)]
        sort: GroupOrder,
    },

    /// Group by one field, reduce once, emit category slices for a bar or
    /// pie chart. `limit` keeps the first N groups after sorting.
    Categories {
        name: String,
        group_by: String,
        reduction: Reduction,
        #[serde(default)]
        sort: GroupOrder,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Running reduction per group, ordered by a secondary field; emits
    /// one line series per group.
    Cumulative {
        name: String,
        group_by: Vec<String>,
        order_by: String,
        reduction: Reduction,
    },

    /// Pivot long to wide; emits the wide table and one line series per
    /// column, optionally smoothed with a rolling mean.
    Pivot {
        name: String,
        row_key: String,
        col_key: String,
        value: String,
        /// Fill for structurally-absent cells, as a JSON scalar matching
        /// the value field's type. Defaults to null.
        #[serde(default)]
        fill: serde_json::Value,
        #[serde(default)]
        rolling_window: Option<usize>,
    },

    /// Group along a path of fields and emit a nested path→value tree.
    Sunburst {
        name: String,
        path: Vec<String>,
        reduction: Reduction,
    },

    /// Descriptive statistics of one numeric field.
    Describe { name: String, field: String },
}

impl Analysis {
    pub fn name(&self) -> &str {
        match self {
            Analysis::Aggregate { name, .. } => name,
            Analysis::Categories { name, .. } => name,
            Analysis::Cumulative { name, .. } => name,
            Analysis::Pivot { name, .. } => name,
            Analysis::Sunburst { name, .. } => name,
            Analysis::Describe { name, .. } => name,
        }
    }

    /// Fields this analysis reads from the cleaned table.
    fn referenced_fields(&self) -> Vec<&str> {
        match self {
            Analysis::Aggregate {
                group_by,
                reductions,
                ..
            } => group_by
                .iter()
                .map(String::as_str)
                .chain(reductions.iter().map(|r| r.field.as_str()))
                .collect(),
            Analysis::Categories {
                group_by,
                reduction,
                ..
            } => vec![group_by.as_str(), reduction.field.as_str()],
            Analysis::Cumulative {
                group_by,
                order_by,
                reduction,
                ..
            } => group_by
                .iter()
                .map(String::as_str)
                .chain([order_by.as_str(), reduction.field.as_str()])
                .collect(),
            Analysis::Pivot {
                row_key,
                col_key,
                value,
                ..
            } => vec![row_key.as_str(), col_key.as_str(), value.as_str()],
            Analysis::Sunburst {
                path, reduction, ..
            } => path
                .iter()
                .map(String::as_str)
                .chain([reduction.field.as_str()])
                .collect(),
            Analysis::Describe { field, .. } => vec![field.as_str()],
        }
    }
}

impl DatasetConfig {
    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The declared schema.
    pub fn schema(&self) -> Schema {
        Schema::new(self.fields.clone())
    }

    /// Loader options equivalent to this config.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            on_parse_error: self.on_parse_error,
            date_formats: self.date_formats.clone(),
            substitutions: self.substitutions.clone(),
            max_rows: self.max_rows,
        }
    }

    /// Check every field reference once, before any data is read.
    ///
    /// Known names are the declared fields plus the targets of earlier
    /// derives, in order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields);
        }

        let mut known: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();
        for derive in &self.derives {
            for source in derive.sources() {
                if !known.iter().any(|k| k == source) {
                    return Err(ConfigError::UnknownField {
                        context: format!("derive '{}'", derive.target()),
                        field: source.to_string(),
                    });
                }
            }
            known.push(derive.target().to_string());
        }

        for sub in &self.substitutions {
            for field in [&sub.field, &sub.where_field] {
                if !self.fields.iter().any(|f| &f.name == field) {
                    return Err(ConfigError::UnknownField {
                        context: "substitution".to_string(),
                        field: field.clone(),
                    });
                }
            }
        }

        for field in &self.dedup_subset {
            if !known.iter().any(|k| k == field) {
                return Err(ConfigError::UnknownField {
                    context: "dedup_subset".to_string(),
                    field: field.clone(),
                });
            }
        }

        let mut names = HashSet::new();
        for analysis in &self.analyses {
            if !names.insert(analysis.name().to_string()) {
                return Err(ConfigError::DuplicateAnalysis(analysis.name().to_string()));
            }
            for field in analysis.referenced_fields() {
                if !known.iter().any(|k| k == field) {
                    return Err(ConfigError::UnknownField {
                        context: format!("analysis '{}'", analysis.name()),
                        field: field.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A worked example config for the Nobel laureate dataset, shown by
/// `chartprep example-config`.
pub fn example_config() -> DatasetConfig {
    DatasetConfig {
        version: default_version(),
        name: "nobel".to_string(),
        description: "Nobel laureate records, 1901 onwards".to_string(),
        fields: vec![
            Field::new("year", FieldType::Int).required(),
            Field::new("category", FieldType::Text).required(),
            Field::new("full_name", FieldType::Text).required(),
            Field::new("sex", FieldType::Text),
            Field::new("birth_date", FieldType::Date),
            Field::new("prize_share", FieldType::Text).required(),
            Field::new("birth_country_current", FieldType::Text),
            Field::new("organization_name", FieldType::Text),
            Field::new("organization_city", FieldType::Text),
        ],
        delimiter: None,
        on_parse_error: ParseErrorPolicy::Reject,
        date_formats: default_date_formats(),
        // Exact birth dates unknown for these laureates; mid-year estimates
        // per the dataset's documented caveat.
        substitutions: vec![
            substitution("Michael Houghton", 1949),
            substitution("Venkatraman Ramakrishnan", 1952),
            substitution("Nadia Murad", 1993),
        ],
        max_rows: default_max_rows(),
        derives: vec![
            Derive::ShareFraction {
                source: "prize_share".into(),
                target: "share_pct".into(),
            },
            Derive::AgeAtEvent {
                year_field: "year".into(),
                date_field: "birth_date".into(),
                target: "winning_age".into(),
            },
        ],
        dedup_subset: vec!["full_name".into()],
        analyses: vec![
            Analysis::Categories {
                name: "gender_split".into(),
                group_by: "sex".into(),
                reduction: Reduction::new("year", Reduce::Count { present_only: false })
                    .named("prize"),
                sort: GroupOrder::default(),
                limit: None,
            },
            Analysis::Categories {
                name: "top20_countries".into(),
                group_by: "birth_country_current".into(),
                reduction: Reduction::new("year", Reduce::Count { present_only: false })
                    .named("prize"),
                sort: GroupOrder::ValueDesc {
                    column: "prize".into(),
                },
                limit: Some(20),
            },
            Analysis::Aggregate {
                name: "mean_share_per_year".into(),
                group_by: vec!["year".into()],
                reductions: vec![Reduction::new("share_pct", Reduce::Mean).named("avg_share")],
                sort: GroupOrder::default(),
            },
            Analysis::Cumulative {
                name: "cumulative_prizes_by_country".into(),
                group_by: vec!["birth_country_current".into()],
                order_by: "year".into(),
                reduction: Reduction::new("year", Reduce::Count { present_only: false })
                    .named("prize"),
            },
            Analysis::Sunburst {
                name: "discovery_locations".into(),
                path: vec![
                    "birth_country_current".into(),
                    "organization_city".into(),
                    "organization_name".into(),
                ],
                reduction: Reduction::new("year", Reduce::Count { present_only: false })
                    .named("prize"),
            },
            Analysis::Describe {
                name: "winning_age_summary".into(),
                field: "winning_age".into(),
            },
        ],
    }
}

fn substitution(full_name: &str, birth_year: i32) -> DateSubstitution {
    DateSubstitution {
        field: "birth_date".into(),
        where_field: "full_name".into(),
        equals: full_name.into(),
        value: chrono::NaiveDate::from_ymd_opt(birth_year, 7, 2)
            .expect("mid-year date is always valid"),
    }
}
