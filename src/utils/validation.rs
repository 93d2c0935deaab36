use std::borrow::Cow;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::comment::{
    AnonymousCommentForm, CommentPayload, CommentSubmission, UserCommentForm,
};
use crate::services::captcha::CaptchaService;

/// 按字段汇总的表单错误信息
pub type FormErrors = BTreeMap<String, Vec<String>>;

const BLANK_MESSAGE: &str = "Could not be empty";
const CAPTCHA_MESSAGE: &str = "The answer to the challenge is not correct";

static SESSION_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{8,128}$").unwrap()
});

/// 会话键只接受 URL 安全字符，其他 cookie 值视为不存在
pub fn is_valid_session_key(key: &str) -> bool {
    SESSION_KEY_REGEX.is_match(key)
}

/// 非空验证（去除空白后）
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.message = Some(Cow::Borrowed(BLANK_MESSAGE));
        return Err(error);
    }
    Ok(())
}

/// 将 validator 的错误转换为按字段的消息列表
pub fn collect_form_errors(errors: &ValidationErrors) -> FormErrors {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            (
                field.to_string(),
                errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Invalid value".to_string())
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

/// Validates a submission against the form matching the caller's identity.
///
/// Signed-in users only provide a message. Anonymous visitors provide name,
/// email and message, and must answer the bot challenge when `captcha` is set.
pub fn validate_submission(
    submission: &CommentSubmission,
    authenticated: bool,
    captcha: Option<&CaptchaService>,
) -> Result<CommentPayload, FormErrors> {
    if authenticated {
        let form = UserCommentForm {
            message: submission.message.clone(),
        };
        return match form.validate() {
            Ok(()) => Ok(CommentPayload {
                name: None,
                email: None,
                message: form.message,
            }),
            Err(e) => Err(collect_form_errors(&e)),
        };
    }

    let form = AnonymousCommentForm {
        name: submission.name.clone().unwrap_or_default(),
        email: submission.email.clone().unwrap_or_default(),
        message: submission.message.clone(),
    };

    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => collect_form_errors(&e),
    };

    if let Some(captcha) = captcha {
        let answer = submission.captcha_answer.as_deref().unwrap_or_default();
        let token = submission.captcha_token.as_deref().unwrap_or_default();
        if !captcha.verify(token, answer) {
            errors
                .entry("captcha".to_string())
                .or_default()
                .push(CAPTCHA_MESSAGE.to_string());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CommentPayload {
        name: Some(form.name.trim().to_string()),
        email: Some(form.email.trim().to_string()),
        message: form.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use std::sync::Arc;

    fn anonymous_submission() -> CommentSubmission {
        CommentSubmission {
            name: Some("Grace".to_string()),
            email: Some("grace@example.com".to_string()),
            message: "Great write-up".to_string(),
            captcha_answer: None,
            captcha_token: None,
        }
    }

    #[test]
    fn test_session_key_shape() {
        assert!(is_valid_session_key("0f8b6c2e-3d4a-4c1b-9e7f-2a5d6b8c9e01"));
        assert!(is_valid_session_key("known-session"));

        assert!(!is_valid_session_key("short"));
        assert!(!is_valid_session_key("has space in it"));
        assert!(!is_valid_session_key("semi;colon=value"));
        assert!(!is_valid_session_key(&"a".repeat(129)));
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("hello").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \n\t").is_err());
    }

    #[test]
    fn test_user_submission_only_needs_message() {
        let submission = CommentSubmission {
            message: "Signed in".to_string(),
            ..Default::default()
        };
        let payload = validate_submission(&submission, true, None).unwrap();
        assert_eq!(payload.message, "Signed in");
        assert!(payload.name.is_none());

        let blank = CommentSubmission::default();
        let errors = validate_submission(&blank, true, None).unwrap_err();
        assert_eq!(errors.get("message"), Some(&vec![BLANK_MESSAGE.to_string()]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_anonymous_submission_reports_every_field() {
        let submission = CommentSubmission {
            name: Some(" ".to_string()),
            email: Some("nope".to_string()),
            message: String::new(),
            ..Default::default()
        };
        let errors = validate_submission(&submission, false, None).unwrap_err();
        assert_eq!(errors.get("name"), Some(&vec![BLANK_MESSAGE.to_string()]));
        assert_eq!(
            errors.get("email"),
            Some(&vec!["This is not a valid email".to_string()])
        );
        assert!(errors.contains_key("message"));
    }

    #[test]
    fn test_anonymous_submission_checks_captcha() {
        let captcha = CaptchaService::new("captcha-secret", Arc::new(ManualClock::default()));

        let errors = validate_submission(&anonymous_submission(), false, Some(&captcha)).unwrap_err();
        assert!(errors.contains_key("captcha"));

        let challenge = captcha.issue_for(3, 4);
        let mut submission = anonymous_submission();
        submission.captcha_answer = Some("7".to_string());
        submission.captcha_token = Some(challenge.token);
        let payload = validate_submission(&submission, false, Some(&captcha)).unwrap();
        assert_eq!(payload.name.as_deref(), Some("Grace"));
        assert_eq!(payload.email.as_deref(), Some("grace@example.com"));
    }
}
