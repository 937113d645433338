//! Mail configuration: public domain, intro message and the shared route.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::account::MailDomain;
use crate::ports::MailRule;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Domain under which account addresses are published
    pub domain: String,

    /// Local part of the intro sender address
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Name of the intro template
    #[serde(default = "default_intro_template")]
    pub intro_template: String,

    /// Intro subject; `{{id}}` and `{{token}}` are substituted
    #[serde(default = "default_intro_subject")]
    pub intro_subject: String,

    /// Intro body (HTML); `{{id}}` and `{{token}}` are substituted
    #[serde(default = "default_intro_html")]
    pub intro_html: String,

    /// Rule set holding the shared allow-list
    #[serde(default = "default_rule_set_name")]
    pub rule_set_name: String,

    /// Rule within the set
    #[serde(default = "default_rule_name")]
    pub rule_name: String,

    /// Resend API key. Without it intros are only logged.
    pub resend_api_key: Option<SecretString>,

    #[serde(default = "default_resend_base_url")]
    pub resend_base_url: String,
}

impl MailConfig {
    pub fn mail_domain(&self) -> MailDomain {
        MailDomain::new(self.domain.as_str())
    }

    pub fn mail_rule(&self) -> MailRule {
        MailRule::new(self.rule_set_name.as_str(), self.rule_name.as_str())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let domain = self.mail_domain();
        if domain.as_str().is_empty() || !domain.as_str().contains('.') || domain.as_str().contains('@') {
            return Err(ValidationError::InvalidMailDomain);
        }
        if self.sender.trim().is_empty() {
            return Err(ValidationError::MissingRequired("MAIL_SENDER"));
        }
        if let Some(key) = &self.resend_api_key {
            if !key.expose_secret().starts_with("re_") {
                return Err(ValidationError::InvalidResendKey);
            }
        }
        Ok(())
    }
}

fn default_sender() -> String {
    "noreply".to_string()
}

fn default_intro_template() -> String {
    "Intro".to_string()
}

fn default_intro_subject() -> String {
    "Your shared address is ready".to_string()
}

fn default_intro_html() -> String {
    "<p>Mail sent to <strong>{{id}}</strong> is now forwarded to you.</p>\
     <p>To stop receiving it, unsubscribe with token <code>{{token}}</code>.</p>"
        .to_string()
}

fn default_rule_set_name() -> String {
    "pooled-inbox".to_string()
}

fn default_rule_name() -> String {
    "forward".to_string()
}

fn default_resend_base_url() -> String {
    "https://api.resend.com".to_string()
}
