pub mod database;
pub mod metrics;
pub mod notify;
pub mod pdf;
pub mod renderer;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use notify::{
    EmailAttachment, EmailMessage, EmailProvider, HttpSmsProvider, MockEmailProvider,
    MockSmsProvider, NotificationOutcome, Notifier, ProviderError, ProviderResponse, SmsMessage,
    SmsProvider, SmtpProvider,
};
pub use pdf::{HttpPdfRenderer, MockPdfRenderer, PdfError, PdfRenderer};
