use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::utils::validation::validate_not_blank;

/// Reserved user id stored for comments posted without an account.
pub const ANONYMOUS_USER_ID: i64 = 10;

/// Number of rows returned by the recent-comments feeds when no limit is given.
pub const DEFAULT_RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Waiting,
    Accept,
    Rejected,
}

impl CommentStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            CommentStatus::Waiting => 0,
            CommentStatus::Accept => 1,
            CommentStatus::Rejected => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(CommentStatus::Waiting),
            1 => Some(CommentStatus::Accept),
            2 => Some(CommentStatus::Rejected),
            _ => None,
        }
    }

    /// Initial status of a new comment for the given moderation setting.
    pub fn initial(moderating: bool) -> Self {
        if moderating {
            CommentStatus::Waiting
        } else {
            CommentStatus::Accept
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content_id: i64,
    pub language_id: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub session_key: String,
    #[serde(skip_serializing)]
    pub ip: String,
    pub parent_comment_id: i64,
    pub name: String,
    pub email: String,
    pub url: String,
    pub title: String,
    pub text: String,
    pub status: CommentStatus,
}

/// Row to insert. The store assigns `id`, `created` and `modified`.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content_id: i64,
    pub language_id: i64,
    pub user_id: i64,
    pub session_key: String,
    pub ip: String,
    pub name: String,
    pub email: String,
    pub text: String,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    #[default]
    Created,
    Author,
}

impl CommentSort {
    /// ORDER BY expression; author names compare case-insensitively.
    pub fn order_expr(self) -> &'static str {
        match self {
            CommentSort::Created => "created",
            CommentSort::Author => "name COLLATE NOCASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOptions {
    pub sort: CommentSort,
    pub order: SortOrder,
}

/// View parameters accepted on the listing endpoint (`?cSort=author&cOrder=asc`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCommentsQuery {
    #[serde(rename = "cSort")]
    pub sort: Option<String>,
    #[serde(rename = "cOrder")]
    pub order: Option<String>,
}

impl From<ListCommentsQuery> for SortOptions {
    fn from(query: ListCommentsQuery) -> Self {
        let sort = match query.sort.as_deref() {
            Some("author") => CommentSort::Author,
            _ => CommentSort::Created,
        };
        let order = match query.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        SortOptions { sort, order }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentCommentsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
        }
    }

    pub fn target_status(self) -> CommentStatus {
        match self {
            ModerationAction::Approve => CommentStatus::Accept,
            ModerationAction::Reject => CommentStatus::Rejected,
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            other => Err(format!("Unknown moderation action: {}", other)),
        }
    }
}

/// Submission body. Anonymous visitors fill every field; signed-in users only `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub captcha_answer: Option<String>,
    pub captcha_token: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct AnonymousCommentForm {
    #[validate(custom = "validate_not_blank")]
    pub name: String,
    #[validate(email(message = "This is not a valid email"))]
    pub email: String,
    #[validate(custom = "validate_not_blank")]
    pub message: String,
}

#[derive(Debug, Clone, Validate)]
pub struct UserCommentForm {
    #[validate(custom = "validate_not_blank")]
    pub message: String,
}

/// Validated comment content handed to the moderation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CommentStatus::Waiting.as_i64(), 0);
        assert_eq!(CommentStatus::Accept.as_i64(), 1);
        assert_eq!(CommentStatus::Rejected.as_i64(), 2);
        assert_eq!(CommentStatus::from_i64(2), Some(CommentStatus::Rejected));
        assert_eq!(CommentStatus::from_i64(7), None);
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(CommentStatus::initial(true), CommentStatus::Waiting);
        assert_eq!(CommentStatus::initial(false), CommentStatus::Accept);
    }

    #[test]
    fn test_sort_options_from_query() {
        let default: SortOptions = ListCommentsQuery::default().into();
        assert_eq!(default, SortOptions { sort: CommentSort::Created, order: SortOrder::Desc });

        let by_author: SortOptions = ListCommentsQuery {
            sort: Some("author".to_string()),
            order: Some("asc".to_string()),
        }
        .into();
        assert_eq!(by_author, SortOptions { sort: CommentSort::Author, order: SortOrder::Asc });

        // 未知值回退到默认排序
        let unknown: SortOptions = ListCommentsQuery {
            sort: Some("rating".to_string()),
            order: Some("sideways".to_string()),
        }
        .into();
        assert_eq!(unknown, SortOptions::default());
    }

    #[test]
    fn test_moderation_action_parsing() {
        assert_eq!("approve".parse::<ModerationAction>(), Ok(ModerationAction::Approve));
        assert_eq!("reject".parse::<ModerationAction>(), Ok(ModerationAction::Reject));
        assert!("delete".parse::<ModerationAction>().is_err());
        assert_eq!(ModerationAction::Reject.target_status(), CommentStatus::Rejected);
    }

    #[test]
    fn test_anonymous_form_validation() {
        let valid = AnonymousCommentForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            message: "Nice article".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = AnonymousCommentForm {
            name: "   ".to_string(),
            email: "not-an-email".to_string(),
            message: "".to_string(),
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("message"));
    }
}
