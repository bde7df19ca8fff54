//! Console reporting for probe runs.
//!
//! Everything here writes to stdout for human inspection; diagnostics and
//! other server chatter are prefixed so they stand apart from the probe's
//! own output.

use lsp_types::CompletionItem;
use lsprobe_core::rpc::{JsonRpcNotification, ServerNotification};
use serde_json::Value;

/// Print a labelled, pretty-printed JSON payload.
pub fn print_json(label: &str, value: &Value) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    println!("{label}:\n{rendered}");
}

/// Print completion items as an ordered label/detail listing.
pub fn print_completions(items: &[CompletionItem]) {
    println!("received {} completion items:", items.len());
    for (index, item) in items.iter().enumerate() {
        let detail = item.detail.as_deref().unwrap_or("no detail");
        println!("{}. {} - {}", index + 1, item.label, detail);
    }
    println!();
}

/// Print one server-to-client notification.
///
/// Used as the session's notification handler; it only formats and writes,
/// so it never blocks the reader's dispatch path.
pub fn print_server_notification(notification: JsonRpcNotification) {
    match ServerNotification::parse(&notification.method, notification.params) {
        ServerNotification::PublishDiagnostics(params) => {
            println!(
                "[server] diagnostics for {} ({}):",
                params.uri.to_string(),
                params.diagnostics.len()
            );
            for diagnostic in &params.diagnostics {
                println!(
                    "[server]   {}:{} {}",
                    diagnostic.range.start.line,
                    diagnostic.range.start.character,
                    diagnostic.message
                );
            }
        }
        ServerNotification::ShowMessage(params) => {
            println!("[server] message: {}", params.message);
        }
        ServerNotification::LogMessage(params) => {
            println!("[server] log: {}", params.message);
        }
        ServerNotification::Telemetry(params) => {
            let payload = params.unwrap_or(Value::Null);
            println!("[server] telemetry event: {payload}");
        }
        ServerNotification::Other { method, params } => {
            let payload = params.unwrap_or(Value::Null);
            println!("[server] {method}: {payload}");
        }
    }
}
