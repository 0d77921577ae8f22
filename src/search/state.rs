//! Classification of a ranked result set into the state the UI branches on.

use super::scoring::ScoredCandidate;
use crate::config::Thresholds;
use serde::Serialize;

/// Outcome of one search. Exactly one variant is produced per search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchState {
    /// The top candidate matches strongly.
    ConfidentMatch {
        recognized_title: String,
        result_count: usize,
        top_score: i32,
        message: String,
    },
    /// Candidates exist but none strongly.
    AmbiguousMatch {
        recognized_title: Option<String>,
        result_count: usize,
        top_score: i32,
        message: String,
    },
    /// An alias named a series but no catalog candidate survived.
    TitleOnly {
        recognized_title: String,
        message: String,
    },
    NotFound { message: String },
}

impl SearchState {
    pub fn not_found() -> Self {
        Self::NotFound {
            message: "該当する作品が見つかりませんでした".to_string(),
        }
    }

    /// Short machine-readable name of the variant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConfidentMatch { .. } => "CONFIDENT_MATCH",
            Self::AmbiguousMatch { .. } => "AMBIGUOUS_MATCH",
            Self::TitleOnly { .. } => "TITLE_ONLY",
            Self::NotFound { .. } => "NOT_FOUND",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ConfidentMatch { message, .. }
            | Self::AmbiguousMatch { message, .. }
            | Self::TitleOnly { message, .. }
            | Self::NotFound { message } => message,
        }
    }
}

/// Pick the search state for a ranked, deduplicated result set.
///
/// Rules are applied in strict precedence order:
/// 1. results and top score at or above `thresholds.confident` → `ConfidentMatch`
/// 2. results → `AmbiguousMatch`
/// 3. no results, alias resolved and a title known → `TitleOnly`
/// 4. otherwise → `NotFound`
pub fn classify(
    results: &[ScoredCandidate],
    was_alias_resolved: bool,
    recognized_title: Option<&str>,
    thresholds: &Thresholds,
) -> SearchState {
    let top = results.iter().reduce(|best, c| if c.score > best.score { c } else { best });
    let recognized_title = recognized_title.filter(|title| !title.trim().is_empty());

    match top {
        Some(top) if top.score >= thresholds.confident => SearchState::ConfidentMatch {
            recognized_title: top.item.title.clone(),
            result_count: results.len(),
            top_score: top.score,
            message: format!("「{}」が見つかりました", top.item.title),
        },
        Some(top) => SearchState::AmbiguousMatch {
            recognized_title: recognized_title.map(str::to_string),
            result_count: results.len(),
            top_score: top.score,
            message: format!("{}件の候補が見つかりました", results.len()),
        },
        None => match recognized_title {
            Some(title) if was_alias_resolved => SearchState::TitleOnly {
                recognized_title: title.to_string(),
                message: format!("「{}」の書籍情報が見つかりませんでした", title),
            },
            _ => SearchState::not_found(),
        },
    }
}
