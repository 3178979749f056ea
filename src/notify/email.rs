use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::config::EmailConfig;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Addresses come from configuration; SMTP credentials stay in the
    /// environment (SMTP_USER / SMTP_PASS).
    pub fn new(cfg: &EmailConfig) -> Result<Self> {
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .context("invalid smtp_host")?
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid sender address")?;
        let to = cfg.recipient.parse().context("invalid recipient address")?;

        Ok(Self { mailer, from, to })
    }

    pub async fn send_newsletter(&self, subject: &str, html: String) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html)
            .context("build newsletter email")?;

        self.mailer.send(msg).await.context("send newsletter email")?;
        Ok(())
    }

    /// Plain-text failure notice. Best-effort: callers log and move on if
    /// this fails too.
    pub async fn send_error_notice(&self, stage: &str, detail: &str) -> Result<()> {
        let subject = format!("Veille Technologique - Erreur ({stage})");
        let body = format!("Stage: {stage}\nErreur: {detail}\n");

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build error email")?;

        self.mailer.send(msg).await.context("send error email")?;
        Ok(())
    }
}
