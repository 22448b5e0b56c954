//! Console output helpers and the dry-run transport.

use async_trait::async_trait;
use console::style;
use dealwatch_core::ids::{DestinationId, MessageHandle};
use dealwatch_engine::metrics::CycleMetrics;
use dealwatch_engine::transport::{OutboundMessage, Transport, TransportError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Transport that prints outbound messages to the terminal instead of
/// delivering them anywhere. Lets the pipeline run end to end without a
/// messaging backend.
#[derive(Default)]
pub struct ConsoleTransport {
    counter: AtomicU64,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(
        &self,
        destination: &DestinationId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError> {
        println!();
        println!(
            "{} {}",
            style("→").cyan().bold(),
            style(destination.as_str()).cyan()
        );
        println!("{}", message.text);
        if let Some(link) = &message.link_url {
            println!("{}", style(link).underlined());
        }
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageHandle::new(format!("console-{id}")))
    }
}

/// Print a one-cycle summary line.
pub fn print_cycle_summary(metrics: &CycleMetrics) {
    println!();
    println!(
        "{} {} products, {} deals, {} sent, {} errors",
        style("cycle finished:").green().bold(),
        metrics.products_scraped,
        metrics.deals_found,
        metrics.messages_sent,
        metrics.errors,
    );
}

/// Print a fatal error and exit.
pub fn fail(error: &anyhow::Error) -> ! {
    eprintln!("{} {:#}", style("error:").red().bold(), error);
    std::process::exit(1);
}
