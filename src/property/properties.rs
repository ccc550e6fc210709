use serde_json::{json, Value};

use crate::config::TrialCounts;
use crate::models::{Category, HttpMethod, Payload};
use crate::probe::ApiLayout;
use crate::utils::truncation::{quoted_preview, truncate_chars, MAX_TRIAL_PREVIEW_LENGTH};
use super::generators::{TrialGenerator, MAX_DESC_LENGTH, MAX_NAME_LENGTH, MAX_QUERY_LENGTH};

/// A declared invariant: no input drawn for it may produce a server fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    CreateKnowledge,
    SearchKnowledge,
    RandomEndpoint,
    MalformedJson,
}

impl Property {
    pub const ALL: [Property; 4] = [
        Property::CreateKnowledge,
        Property::SearchKnowledge,
        Property::RandomEndpoint,
        Property::MalformedJson,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateKnowledge => "create_knowledge",
            Self::SearchKnowledge => "search_knowledge",
            Self::RandomEndpoint => "random_endpoint",
            Self::MalformedJson => "malformed_json",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateKnowledge => "Create knowledge with random name/desc",
            Self::SearchKnowledge => "Search knowledge with random query",
            Self::RandomEndpoint => "Random method and path",
            Self::MalformedJson => "Random JSON document as create body",
        }
    }

    pub fn trials(&self, counts: &TrialCounts) -> usize {
        match self {
            Self::CreateKnowledge => counts.create_knowledge,
            Self::SearchKnowledge => counts.search_knowledge,
            Self::RandomEndpoint => counts.random_endpoint,
            Self::MalformedJson => counts.malformed_json,
        }
    }

    /// Shortest acceptable value for each string field during minimisation.
    pub fn min_field_length(&self) -> usize {
        match self {
            Self::RandomEndpoint => 1,
            _ => 0,
        }
    }

    pub fn draw(&self, gen: &mut TrialGenerator) -> TrialInput {
        match self {
            Self::CreateKnowledge => TrialInput::Create {
                name: gen.text(MAX_NAME_LENGTH),
                desc: gen.text(MAX_DESC_LENGTH),
            },
            Self::SearchKnowledge => TrialInput::Search { query: gen.text(MAX_QUERY_LENGTH) },
            Self::RandomEndpoint => {
                let method = gen.method();
                TrialInput::Endpoint { method, suffix: gen.path_suffix() }
            }
            Self::MalformedJson => TrialInput::Json(gen.json_tree()),
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One drawn input.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialInput {
    Create { name: String, desc: String },
    Search { query: String },
    Endpoint { method: HttpMethod, suffix: String },
    Json(Value),
}

impl TrialInput {
    pub fn to_payload(&self, test_name: &str, layout: &ApiLayout) -> Payload {
        let category = Category::PropertyTrial;
        match self {
            Self::Create { name, desc } => {
                Payload::new(test_name, category, HttpMethod::Post, layout.knowledge_collection())
                    .with_json(json!({"name": name, "desc": desc, "type": "0"}))
            }
            Self::Search { query } => {
                Payload::new(test_name, category, HttpMethod::Get, layout.knowledge_collection())
                    .with_query("name", query)
            }
            Self::Endpoint { method, suffix } => {
                Payload::new(test_name, category, *method, format!("{}/{}", layout.api_prefix, suffix))
            }
            Self::Json(value) => {
                Payload::new(test_name, category, HttpMethod::Post, layout.knowledge_collection())
                    .with_json(value.clone())
            }
        }
    }

    /// Offending-input preview kept in the ledger, at most
    /// [`MAX_TRIAL_PREVIEW_LENGTH`] characters.
    pub fn preview(&self) -> String {
        let max = MAX_TRIAL_PREVIEW_LENGTH;
        let text = match self {
            Self::Create { name, desc } => format!(
                "name={} desc={}",
                quoted_preview(name, max),
                quoted_preview(desc, max)
            ),
            Self::Search { query } => quoted_preview(query, max),
            Self::Endpoint { method, suffix } => format!("{} {}", method, quoted_preview(suffix, max)),
            Self::Json(value) => value.to_string(),
        };
        truncate_chars(&text, max)
    }

    /// String fields eligible for minimisation, in shrink order.
    pub fn text_fields(&self) -> Option<Vec<String>> {
        match self {
            Self::Create { name, desc } => Some(vec![name.clone(), desc.clone()]),
            Self::Search { query } => Some(vec![query.clone()]),
            Self::Endpoint { suffix, .. } => Some(vec![suffix.clone()]),
            Self::Json(_) => None,
        }
    }

    /// Same input with its string fields replaced, in `text_fields` order.
    pub fn with_text_fields(&self, fields: &[String]) -> TrialInput {
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        match self {
            Self::Create { .. } => Self::Create { name: field(0), desc: field(1) },
            Self::Search { .. } => Self::Search { query: field(0) },
            Self::Endpoint { method, .. } => Self::Endpoint { method: *method, suffix: field(0) },
            Self::Json(value) => Self::Json(value.clone()),
        }
    }
}
