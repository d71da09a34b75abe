//! Outbound email. Delivery is out of scope; messages are logged.

use std::convert::Infallible;

use criador_core::store::Notifier;

/// A [`Notifier`] that records each message in the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn send(&self, to: String, subject: String, html_body: String) -> Result<(), Infallible> {
    tracing::info!(%to, %subject, body = %html_body, "email queued");
    Ok(())
  }
}
