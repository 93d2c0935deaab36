use url::Url;

use crate::error::{AppError, Result};
use crate::models::comment::ModerationAction;

/// Path under which the moderation endpoint is mounted.
pub const MODERATION_ROUTE: [&str; 3] = ["api", "comments", "moderation"];

/// Builds absolute moderation URLs.
#[derive(Debug, Clone)]
pub struct ModerationLinks {
    base_url: Url,
}

impl ModerationLinks {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::internal("Public base URL cannot be used as a base"));
        }
        Ok(Self { base_url })
    }

    /// `{base}/api/comments/moderation/{content_id}/{token}/{action}/{comment_id}`
    pub fn generate(
        &self,
        content_id: i64,
        session_token: &str,
        action: ModerationAction,
        comment_id: i64,
    ) -> Result<String> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::internal("Public base URL cannot be used as a base"))?;
            segments
                .pop_if_empty()
                .extend(MODERATION_ROUTE)
                .push(&content_id.to_string())
                .push(session_token)
                .push(action.as_str())
                .push(&comment_id.to_string());
        }
        Ok(url.to_string())
    }
}
