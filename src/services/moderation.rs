use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::Result,
    models::comment::*,
    services::{
        auth::User,
        comment::CommentService,
        links::ModerationLinks,
        locale::LocaleConverter,
        mailer::{Mailer, OutgoingMail},
        template::{ModerationEmailContext, TemplateRenderer},
        token::SessionTokenCodec,
    },
};

/// Site-level switches and addressing for moderation mail.
#[derive(Debug, Clone)]
pub struct ModerationSettings {
    pub anonymous_access: bool,
    pub moderating: bool,
    pub email_subject: String,
    pub email_from: String,
    pub email_to: Vec<String>,
}

impl ModerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            anonymous_access: config.anonymous_access_enabled,
            moderating: config.moderation_enabled,
            email_subject: config.moderation_email_subject.clone(),
            email_from: config.moderation_email_from.clone(),
            email_to: config.moderation_email_to.clone(),
        }
    }
}

/// Who is submitting, from where, and in which language.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub user: Option<User>,
    pub session_key: String,
    pub client_ip: String,
    pub locale: Option<String>,
}

/// Identity written on the comment row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

impl Author {
    /// Signed-in users are taken from their account; anyone else from the form.
    pub fn resolve(user: Option<&User>, payload: &CommentPayload) -> Self {
        match user {
            Some(user) => Author {
                user_id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
            },
            None => Author {
                user_id: ANONYMOUS_USER_ID,
                name: payload.name.clone().unwrap_or_default(),
                email: payload.email.clone().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmittedComment {
    pub id: i64,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// The comment left WAITING and now has this status.
    Applied(CommentStatus),
    /// Bad token, unknown comment, or the comment was already resolved.
    NotProcessed,
}

#[derive(Clone)]
pub struct ModerationService {
    comments: CommentService,
    codec: Arc<dyn SessionTokenCodec>,
    links: ModerationLinks,
    templates: Arc<TemplateRenderer>,
    mailer: Arc<dyn Mailer>,
    locales: LocaleConverter,
    settings: ModerationSettings,
}

impl ModerationService {
    pub fn new(
        comments: CommentService,
        codec: Arc<dyn SessionTokenCodec>,
        links: ModerationLinks,
        templates: Arc<TemplateRenderer>,
        mailer: Arc<dyn Mailer>,
        locales: LocaleConverter,
        settings: ModerationSettings,
    ) -> Self {
        Self {
            comments,
            codec,
            links,
            templates,
            mailer,
            locales,
            settings,
        }
    }

    pub fn has_anonymous_access(&self) -> bool {
        self.settings.anonymous_access
    }

    pub fn has_moderation(&self) -> bool {
        self.settings.moderating
    }

    /// Stores a validated comment and, when moderating, mails the moderators.
    ///
    /// Anonymous callers must be admitted by `has_anonymous_access` before
    /// reaching this point.
    pub async fn submit(
        &self,
        ctx: &SubmissionContext,
        content_id: i64,
        payload: &CommentPayload,
    ) -> Result<SubmittedComment> {
        let author = Author::resolve(ctx.user.as_ref(), payload);

        let language_id = match ctx
            .locale
            .as_deref()
            .and_then(|locale| self.locales.convert_to_store(locale))
        {
            Some(code) => self.comments.lookup_language_id(&code).await?,
            None => 0,
        };

        let status = CommentStatus::initial(self.has_moderation());
        let id = self
            .comments
            .insert_comment(NewComment {
                content_id,
                language_id,
                user_id: author.user_id,
                session_key: ctx.session_key.clone(),
                ip: ctx.client_ip.clone(),
                name: author.name.clone(),
                email: author.email.clone(),
                text: payload.message.clone(),
                status,
            })
            .await?;

        if self.has_moderation() {
            // 评论已保存，邮件失败只记录日志
            if let Err(e) = self
                .notify_moderators(payload, &author, content_id, &ctx.session_key, id)
                .await
            {
                error!("Failed to notify moderators about comment {}: {}", id, e);
            }
        }

        Ok(SubmittedComment { id, status })
    }

    /// Mails approve/reject links for a waiting comment to the configured recipients.
    pub async fn notify_moderators(
        &self,
        payload: &CommentPayload,
        author: &Author,
        content_id: i64,
        session_key: &str,
        comment_id: i64,
    ) -> Result<()> {
        let token = self.codec.encode(session_key);
        let approve_url =
            self.links
                .generate(content_id, &token, ModerationAction::Approve, comment_id)?;
        let reject_url =
            self.links
                .generate(content_id, &token, ModerationAction::Reject, comment_id)?;

        let body = self.templates.render_moderation_email(&ModerationEmailContext {
            name: author.name.clone(),
            email: author.email.clone(),
            comment: payload.message.clone(),
            approve_url,
            reject_url,
        })?;

        debug!("Sending moderation mail for comment {}", comment_id);
        self.mailer
            .send(OutgoingMail {
                subject: self.settings.email_subject.clone(),
                from: self.settings.email_from.clone(),
                to: self.settings.email_to.clone(),
                body,
            })
            .await
    }

    /// Whether a moderation link still points at a WAITING comment of the token's session.
    pub async fn authorize_action(
        &self,
        content_id: i64,
        session_token: &str,
        comment_id: i64,
    ) -> Result<bool> {
        let Some(session_key) = self.codec.decode(session_token) else {
            warn!("Undecodable moderation token for comment {}", comment_id);
            return Ok(false);
        };

        self.comments
            .exists_waiting_comment(content_id, &session_key, comment_id)
            .await
    }

    pub async fn apply_action(
        &self,
        content_id: i64,
        session_token: &str,
        comment_id: i64,
        action: ModerationAction,
    ) -> Result<ModerationOutcome> {
        if !self
            .authorize_action(content_id, session_token, comment_id)
            .await?
        {
            info!(
                "Moderation {} on comment {} not authorized or already resolved",
                action, comment_id
            );
            return Ok(ModerationOutcome::NotProcessed);
        }

        let status = action.target_status();
        if self
            .comments
            .update_status_if_waiting(comment_id, status)
            .await?
        {
            Ok(ModerationOutcome::Applied(status))
        } else {
            Ok(ModerationOutcome::NotProcessed)
        }
    }
}
