use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    services::{
        auth::AuthService,
        captcha::CaptchaService,
        comment::CommentService,
        database::Database,
        links::ModerationLinks,
        locale::LocaleConverter,
        mailer::Mailer,
        moderation::{ModerationService, ModerationSettings},
        template::TemplateRenderer,
        token::HmacTokenCodec,
    },
    utils::clock::Clock,
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 认证服务
    pub auth_service: AuthService,

    /// 评论存储
    pub comment_service: CommentService,

    /// 审核流程
    pub moderation_service: ModerationService,

    /// 机器人验证
    pub captcha_service: CaptchaService,
}

impl AppState {
    /// Wires every service from configuration and the injected collaborators.
    pub fn build(
        config: Config,
        db: Arc<Database>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let comment_service = CommentService::new(db.clone(), clock.clone());

        let moderation_service = ModerationService::new(
            comment_service.clone(),
            Arc::new(HmacTokenCodec::new(
                &config.moderation_token_secret,
                config.moderation_token_ttl_secs,
                clock.clone(),
            )),
            ModerationLinks::new(&config.public_base_url)?,
            Arc::new(TemplateRenderer::new(config.moderation_email_template.as_deref())?),
            mailer,
            LocaleConverter::from_mapping(&config.locale_map),
            ModerationSettings::from_config(&config),
        );

        Ok(Self {
            auth_service: AuthService::new(&config.jwt_secret),
            captcha_service: CaptchaService::new(&config.moderation_token_secret, clock),
            comment_service,
            moderation_service,
            config,
        })
    }
}
