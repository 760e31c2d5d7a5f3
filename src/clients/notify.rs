use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::error::{IndexerError, Result};

/// Delivery boundary for end-of-run notifications. Transport failures are
/// the caller's problem to swallow; implementations just report them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// Writes the notification into the log trail. Used outside production
/// hosts and in tests.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject = %subject, "run notification\n{}", body);
        Ok(())
    }
}

/// Pipes the notification through the local sendmail binary.
pub struct SendmailNotifier {
    to: String,
    from: String,
}

impl SendmailNotifier {
    pub fn new(to: &str, from: &str) -> Self {
        Self {
            to: to.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = format!(
            "To: {}\nFrom: {}\nSubject: {}\n\n{}\n",
            self.to, self.from, subject, body
        );

        let mut child = Command::new("sendmail")
            .arg("-t")
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| IndexerError::Notify(format!("failed to spawn sendmail: {}", e)))?;

        // Write the whole message, then drop stdin so sendmail sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(|e| IndexerError::Notify(format!("failed to write message: {}", e)))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| IndexerError::Notify(format!("sendmail did not run: {}", e)))?;
        if !status.success() {
            return Err(IndexerError::Notify(format!(
                "sendmail exited with {}",
                status
            )));
        }
        Ok(())
    }
}
