mod chat_notifier;
mod email_notifier;
mod http_delivery;
mod sms_notifier;
mod webhook_notifier;

pub use chat_notifier::ChatNotifier;
pub use email_notifier::EmailNotifier;
pub use sms_notifier::SmsNotifier;
pub use webhook_notifier::{SIGNATURE_HEADER, WebhookNotifier, sign};
