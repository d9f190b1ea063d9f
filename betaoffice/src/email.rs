//! Email service for KYC links and scanned-mail notifications.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use minijinja::{Environment, context};
use serde::Serialize;
use std::path::Path;

use crate::{
    api::models::mail::is_web_url,
    config::{EmailConfig, EmailTransportConfig},
    db::models::scanned_mails::ScannedMail,
    errors::Error,
};

pub const KYC_LINK_SUBJECT: &str = "Complete Your KYC Form - BetaOffice";

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, Error> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            reply_to: config.reply_to.clone(),
        })
    }

    /// Send the onboarding link issued after checkout.
    pub async fn send_kyc_link_email(&self, to_email: &str, link: &str, ttl_days: u64) -> Result<(), Error> {
        let body = kyc_link_body(link, ttl_days)?;
        self.send_email(to_email, KYC_LINK_SUBJECT, &body).await
    }

    /// Tell a customer that a new piece of mail was scanned for them.
    pub async fn send_scanned_mail_email(&self, to_email: &str, mail: &ScannedMail) -> Result<(), Error> {
        let subject = match mail.sender_name.as_deref().filter(|s| !s.is_empty()) {
            Some(sender) => format!("New mail from {sender} - BetaOffice"),
            None => "You have new mail - BetaOffice".to_string(),
        };
        let body = scanned_mail_body(mail)?;
        self.send_email(to_email, &subject, &body).await
    }

    async fn send_email(&self, to_email: &str, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = to_email.parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let mut builder = Message::builder().from(from).to(to).subject(subject).header(ContentType::TEXT_HTML);

        if let Some(reply_to) = &self.reply_to {
            let reply_to = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder.body(body.to_string()).map_err(|e| Error::Internal {
            operation: format!("build email message: {e}"),
        })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(())
    }
}

const KYC_LINK_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{ subject }}</title>
    <style>{{ style }}</style>
</head>
<body>
    <div class="container">
        <h2>Complete your KYC form</h2>

        <p>Hello,</p>

        <p>Thank you for your purchase. Before we can activate your virtual office we need a few details about your company and its owners.</p>

        <p><a href="{{ link }}">Complete your KYC form</a></p>

        <p>Or copy and paste this link into your browser:</p>
        <p>{{ link }}</p>

        <p>This link will expire in {{ ttl_days }} {{ "day" if ttl_days == 1 else "days" }}.</p>

        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#;

const SCANNED_MAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>You have new mail</title>
    <style>{{ style }}</style>
</head>
<body>
    <div class="container">
        <h2>{{ title }}</h2>

        <p>A new item of mail has arrived at your virtual office and has been scanned.</p>
{% for detail in details %}
        <p><strong>{{ detail.label }}:</strong> {{ detail.value }}</p>
{%- endfor %}

        <ul>
{%- for link in links %}
            <li><a href="{{ link.url }}">{{ link.label }}</a></li>
{%- endfor %}
        </ul>

        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#;

const STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; } \
.container { max-width: 600px; margin: 0 auto; padding: 20px; } \
.footer { margin-top: 30px; font-size: 12px; color: #666; }";

#[derive(Serialize)]
struct Labelled<'a> {
    label: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct Link<'a> {
    label: &'static str,
    url: &'a str,
}

/// Render an HTML email. Template names end in `.html`, so every interpolated value is escaped.
fn render(name: &str, source: &str, ctx: minijinja::Value) -> Result<String, Error> {
    Environment::new()
        .render_named_str(name, source, ctx)
        .map_err(|e| Error::Internal {
            operation: format!("render {name}: {e}"),
        })
}

fn kyc_link_body(link: &str, ttl_days: u64) -> Result<String, Error> {
    render(
        "kyc_link.html",
        KYC_LINK_TEMPLATE,
        context! {
            subject => KYC_LINK_SUBJECT,
            style => STYLE,
            link => link,
            ttl_days => ttl_days,
        },
    )
}

fn scanned_mail_body(mail: &ScannedMail) -> Result<String, Error> {
    let title = mail.document_title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Scanned document");

    let details: Vec<Labelled> = [
        ("From", mail.sender_name.as_deref()),
        ("Addressed to", mail.company_name.as_deref()),
        ("Summary", mail.summary.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|value| Labelled { label, value }))
    .collect();

    let links: Vec<Link> = [
        ("View document", mail.url.as_deref()),
        ("Envelope (front)", mail.url_envelope_front.as_deref()),
        ("Envelope (back)", mail.url_envelope_back.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, url)| url.filter(|u| is_web_url(u)).map(|url| Link { label, url: url.trim() }))
    .collect();

    render(
        "scanned_mail.html",
        SCANNED_MAIL_TEMPLATE,
        context! {
            style => STYLE,
            title => title,
            details => details,
            links => links,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file_config(dir: &Path) -> EmailConfig {
        EmailConfig {
            transport: EmailTransportConfig::File {
                path: dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        }
    }

    fn mail() -> ScannedMail {
        ScannedMail {
            id: 1,
            external_id: "ceo-20250101120000".to_string(),
            sender_name: Some("HMRC".to_string()),
            document_title: Some("Tax return reminder".to_string()),
            summary: Some("Deadline is 31 January".to_string()),
            url: Some("https://files.example.com/doc.pdf".to_string()),
            url_envelope_front: Some("https://files.example.com/front.jpg".to_string()),
            url_envelope_back: None,
            company_name: Some("Acme Ltd".to_string()),
            received_at: None,
            notified_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_kyc_link_body() {
        let body = kyc_link_body("https://betaoffice.uk/kyc?token=abc", 3).unwrap();
        assert!(body.contains("betaoffice.uk"));
        assert!(body.contains("kyc?token=abc"));
        assert!(body.contains("This link will expire in 3 days."));
        assert!(body.contains(".footer { margin-top: 30px;"));

        let body = kyc_link_body("https://betaoffice.uk/kyc?token=abc", 1).unwrap();
        assert!(body.contains("This link will expire in 1 day."));
    }

    #[test]
    fn test_scanned_mail_body() {
        let body = scanned_mail_body(&mail()).unwrap();
        assert!(body.contains("<h2>Tax return reminder</h2>"));
        assert!(body.contains("<strong>From:</strong> HMRC"));
        assert!(body.contains("<strong>Addressed to:</strong> Acme Ltd"));
        assert!(body.contains("files.example.com"));
        assert!(body.contains(">View document</a>"));
        assert!(body.contains(">Envelope (front)</a>"));
        assert!(!body.contains("Envelope (back)"));
    }

    #[test]
    fn test_scanned_mail_body_escapes_webhook_fields() {
        let mut mail = mail();
        mail.document_title = Some("<script>x</script>".to_string());
        mail.sender_name = Some(r#"<a href="https://evil.test">Click to verify</a>"#.to_string());
        mail.url = Some(r#"https://files.example.com/doc.pdf"><img src=x>"#.to_string());
        mail.url_envelope_front = Some("javascript:alert(1)".to_string());

        let body = scanned_mail_body(&mail).unwrap();

        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;x&lt;"));
        assert!(!body.contains("<a href=\"https://evil.test\">"));
        assert!(!body.contains("<img"));
        assert!(!body.contains("javascript:"));
        assert!(!body.contains("Envelope (front)"));
    }

    #[test]
    fn test_kyc_link_body_escapes_link() {
        let body = kyc_link_body(r#"https://betaoffice.uk/kyc?token="><script>x</script>"#, 3).unwrap();
        assert!(!body.contains("<script>"));
        assert!(!body.contains(r#""><"#));
    }

    #[tokio::test]
    async fn test_file_transport_writes_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_config(dir.path())).unwrap();

        service
            .send_kyc_link_email("owner@acme.test", "https://betaoffice.uk/kyc?token=abc", 3)
            .await
            .unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
        let content = std::fs::read_to_string(written[0].as_ref().unwrap().path()).unwrap();
        assert!(content.contains(KYC_LINK_SUBJECT));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_config(dir.path())).unwrap();

        let result = service.send_scanned_mail_email("not an email", &mail()).await;
        assert!(matches!(result, Err(Error::Internal { .. })));
    }
}
