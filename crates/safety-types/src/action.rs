//! Proposed agent actions.
//!
//! The orchestrator hands the framework an opaque JSON object. Only a small,
//! documented subset of keys is inspected; [`ActionRequest::parse`] reads that
//! subset and rejects payloads where those keys have the wrong shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ActionDataError, Result};

/// Opaque, caller-defined action payload.
pub type ActionData = Map<String, Value>;

/// Default for `risk_score` and `impact_score` when the caller omits them.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Families of agent actions that constraints are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    ContentModification,
    SeoOptimization,
    CompetitorResponse,
    SocialAmplification,
    StrategyChange,
    SystemConfiguration,
}

impl ActionCategory {
    /// Every category, in declaration order.
    pub const ALL: [ActionCategory; 6] = [
        ActionCategory::ContentModification,
        ActionCategory::SeoOptimization,
        ActionCategory::CompetitorResponse,
        ActionCategory::SocialAmplification,
        ActionCategory::StrategyChange,
        ActionCategory::SystemConfiguration,
    ];

    /// Order in which keyword sets are tried. Narrow, high-impact families
    /// come first so e.g. `enable_feature` is not read as content.
    const KEYWORD_ORDER: [ActionCategory; 6] = [
        ActionCategory::SystemConfiguration,
        ActionCategory::StrategyChange,
        ActionCategory::CompetitorResponse,
        ActionCategory::SocialAmplification,
        ActionCategory::SeoOptimization,
        ActionCategory::ContentModification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::ContentModification => "content_modification",
            ActionCategory::SeoOptimization => "seo_optimization",
            ActionCategory::CompetitorResponse => "competitor_response",
            ActionCategory::SocialAmplification => "social_amplification",
            ActionCategory::StrategyChange => "strategy_change",
            ActionCategory::SystemConfiguration => "system_configuration",
        }
    }

    /// Substrings of an `action_type` that suggest this category.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ActionCategory::ContentModification => &[
                "content", "article", "blog", "edit", "publish", "rewrite", "draft", "copy",
            ],
            ActionCategory::SeoOptimization => &[
                "seo", "keyword", "meta", "ranking", "backlink", "search",
            ],
            ActionCategory::CompetitorResponse => &["competitor", "rival", "counter"],
            ActionCategory::SocialAmplification => &[
                "social", "tweet", "share", "amplif", "linkedin", "facebook", "instagram",
            ],
            ActionCategory::StrategyChange => &["strategy", "campaign", "plan", "goal"],
            ActionCategory::SystemConfiguration => &[
                "config", "setting", "system", "feature", "integration",
            ],
        }
    }

    /// Heuristic category lookup by keyword substring.
    ///
    /// Returns `None` when no keyword set matches; callers decide the fallback.
    pub fn from_keywords(action_type: &str) -> Option<Self> {
        let lowered = action_type.to_lowercase();
        Self::KEYWORD_ORDER
            .into_iter()
            .find(|category| category.keywords().iter().any(|kw| lowered.contains(kw)))
    }
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionCategory {
    type Err = ActionDataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ActionDataError::UnknownCategory(s.to_string()))
    }
}

/// How the category of an action was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Caller supplied `action_category`
    Explicit,
    /// Matched a keyword in `action_type`
    Keyword,
    /// Nothing matched; the default category was used
    Default,
}

impl ClassificationSource {
    /// Confidence multiplier applied for this source.
    pub fn confidence_factor(&self) -> f64 {
        match self {
            ClassificationSource::Explicit => 1.0,
            ClassificationSource::Keyword => 0.95,
            ClassificationSource::Default => 0.9,
        }
    }
}

/// Typed view of the inspected keys of an [`ActionData`] payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_type: String,
    pub risk_score: f64,
    pub impact_score: f64,
    pub category: Option<ActionCategory>,
    pub content: Option<String>,
}

impl ActionRequest {
    /// Read the documented subset of `data`.
    ///
    /// `action_type` is required; scores default to [`DEFAULT_SCORE`] and must
    /// lie in [0, 1]; `action_category`, when present, must name a known
    /// category; `content`, when present, must be a string.
    pub fn parse(data: &ActionData) -> Result<Self> {
        let action_type = match data.get("action_type") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(ActionDataError::MissingField {
                    field: "action_type".into(),
                })
            }
            Some(_) => {
                return Err(ActionDataError::InvalidType {
                    field: "action_type".into(),
                    expected: "a string".into(),
                })
            }
        };

        let category = match data.get("action_category") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse()?),
            Some(_) => {
                return Err(ActionDataError::InvalidType {
                    field: "action_category".into(),
                    expected: "a string".into(),
                })
            }
        };

        let content = match data.get("content") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ActionDataError::InvalidType {
                    field: "content".into(),
                    expected: "a string".into(),
                })
            }
        };

        Ok(Self {
            action_type,
            risk_score: read_score(data, "risk_score")?,
            impact_score: read_score(data, "impact_score")?,
            category,
            content,
        })
    }
}

fn read_score(data: &ActionData, field: &str) -> Result<f64> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(DEFAULT_SCORE),
        Some(Value::Number(n)) => {
            let value = n.as_f64().ok_or_else(|| ActionDataError::InvalidType {
                field: field.into(),
                expected: "a number".into(),
            })?;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ActionDataError::OutOfRange {
                    field: field.into(),
                    value,
                });
            }
            Ok(value)
        }
        Some(_) => Err(ActionDataError::InvalidType {
            field: field.into(),
            expected: "a number".into(),
        }),
    }
}

/// Read a string key from a payload, if present.
pub fn str_field<'a>(data: &'a ActionData, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}
