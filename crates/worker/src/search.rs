//! Search fan-out channel.
//!
//! Consumes one search's result stream and forwards every result the moment it
//! arrives, re-tagged with the caller's ticket. Per-plugin faults are reported
//! without interrupting the stream. Every search ends with exactly one
//! `searchCompleted`, whether the stream ran out, timed out or panicked.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, instrument, warn};

use protocol::{OutboundMessage, SearchEvent, Ticket};

use crate::{guard, Outbox, PluginHost, WorkerError};

/// Runs `query` against every plugin and streams the results out under `ticket`.
#[instrument(name = "search", skip_all, fields(ticket = %ticket))]
pub(crate) async fn fan_out(
    host: Arc<dyn PluginHost>,
    ticket: Ticket,
    query: String,
    outbox: Outbox,
    limit: Duration,
) {
    let pump = {
        let ticket = ticket.clone();
        let outbox = outbox.clone();
        async move {
            let mut stream = host.search_all(&query);
            let mut delivered = 0usize;
            while let Some(event) = stream.next().await {
                match event {
                    SearchEvent::Result(result) => {
                        delivered += 1;
                        outbox.send(OutboundMessage::add_results(ticket.clone(), result));
                    }
                    SearchEvent::Fault(fault) => {
                        warn!(plugin = %fault.plugin, error = %fault.message, "Plugin fault during search");
                        outbox.send(OutboundMessage::error(format!("Search '{ticket}': {fault}")));
                    }
                }
            }
            delivered
        }
    };

    match tokio::time::timeout(limit, guard::catch_panic(pump)).await {
        Ok(Ok(delivered)) => debug!(ticket = %ticket, delivered, "Search stream ended"),
        Ok(Err(message)) => outbox.report(&WorkerError::UnhandledRuntimeFault {
            context: format!("search '{ticket}'"),
            message,
        }),
        Err(_) => outbox.report(&WorkerError::Timeout {
            operation: format!("Search '{ticket}'"),
            after: limit,
        }),
    }

    outbox.send(OutboundMessage::SearchCompleted { ticket });
}
