//! Dry-run sink printing bulletins to stdout.

use std::io::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};

use macrobrief_core::{DeliveryError, DeliveryStatus, MarkupMode, NotificationSink, SendFuture};

#[derive(Debug, Default)]
pub struct ConsoleSink {
    printed: AtomicI64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, text: &str, markup: MarkupMode) -> Result<DeliveryStatus, DeliveryError> {
        let message_id = self.printed.fetch_add(1, Ordering::Relaxed) + 1;
        write_message(&mut io::stdout().lock(), message_id, text, markup)
            .map_err(|e| DeliveryError::transport(format!("stdout write failed: {e}")))?;

        Ok(DeliveryStatus {
            status: 200,
            message_id: Some(message_id),
        })
    }
}

fn write_message(
    out: &mut impl Write,
    message_id: i64,
    text: &str,
    markup: MarkupMode,
) -> io::Result<()> {
    writeln!(out, "----- message {message_id} ({markup}) -----")?;
    writeln!(out, "{text}")?;
    writeln!(out)?;
    out.flush()
}

impl NotificationSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn send<'a>(&'a self, text: &'a str, markup: MarkupMode) -> SendFuture<'a> {
        let result = self.print(text, markup);
        Box::pin(async move { result })
    }
}
