pub mod captcha;
pub mod email_templates;
pub mod jwt;
pub mod mailer;
pub mod password;
pub mod realtime;
pub mod response;
pub mod storage;
pub mod upload;
pub mod validation;
