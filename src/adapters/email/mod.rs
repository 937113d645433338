//! Email adapters.

mod resend_mailer;

pub use resend_mailer::{MailTemplate, ResendConfig, ResendMailer};
