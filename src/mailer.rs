use async_trait::async_trait;
use tracing::{debug, info};

/// Outbound email collaborator. Delivery itself lives outside this service.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Hands messages to the log instead of an SMTP relay. Development only:
/// bodies (and the reset links in them) are logged when `expose_body` is set.
#[derive(Clone, Default)]
pub struct LogMailer {
    expose_body: bool,
}

impl LogMailer {
    pub fn new(expose_body: bool) -> Self {
        Self { expose_body }
    }

    fn loggable_body<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.expose_body.then_some(body)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, "email handed to log transport");
        match self.loggable_body(body) {
            Some(body) => debug!(%to, %body, "email body"),
            None => debug!(body_len = body.len(), "email body withheld from logs"),
        }
        Ok(())
    }
}
