//! lsprobe - manual smoke test for an LSP endpoint.
//!
//! Connects to a language server over TCP, performs the initialize
//! handshake, drives one didOpen → didChange → completion →
//! completionItem/resolve → didClose sequence and prints the results.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lsp_types::{
    CompletionParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, PartialResultParams, Position, Range, TextDocumentContentChangeEvent,
    TextDocumentIdentifier, TextDocumentItem, TextDocumentPositionParams,
    VersionedTextDocumentIdentifier, WorkDoneProgressParams,
};
use lsprobe_core::{ProbeConfig, Session, handshake, rpc};
use serde_json::json;

mod args;
mod logging;
mod report;

use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args.log_level)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting lsprobe");

    let mut config = if let Some(config_path) = &args.config {
        ProbeConfig::load_from(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        ProbeConfig::load().context("failed to load configuration")?
    };
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }

    probe(&args, &config).await?;

    tracing::info!("probe complete");
    Ok(())
}

/// Run the full smoke-test sequence against one server.
async fn probe(args: &Args, config: &ProbeConfig) -> Result<()> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let file = std::fs::canonicalize(&args.file)
        .with_context(|| format!("cannot resolve {}", args.file.display()))?;
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let uri = handshake::file_uri(&file)?;

    let workspace_root = config.workspace_root.clone().unwrap_or_else(|| {
        file.parent().map_or_else(|| PathBuf::from("."), PathBuf::from)
    });

    let authority = config.server.authority();
    let session = Session::new();
    session.on_notification(report::print_server_notification);
    session
        .connect(authority.as_str())
        .await
        .with_context(|| format!("cannot connect to {authority}"))?;
    tracing::info!(%authority, "connected");

    let params = handshake::initialize_params(std::slice::from_ref(&workspace_root), None)?;
    let init = session
        .initialize(params, timeout)
        .await
        .context("initialize failed")?;
    report::print_json(
        "server capabilities",
        &serde_json::to_value(&init.capabilities)?,
    );
    session.notify("initialized", Some(json!({}))).await?;

    let language_id = args
        .language
        .clone()
        .unwrap_or_else(|| args::language_id_for(&file));
    let open = DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri.clone(),
            language_id,
            version: 1,
            text,
        },
    };
    session
        .notify("textDocument/didOpen", Some(serde_json::to_value(open)?))
        .await?;

    let position = Position {
        line: args.line,
        character: args.column,
    };

    if let Some(insert) = &args.insert {
        let change = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: Some(Range {
                    start: position,
                    end: position,
                }),
                range_length: None,
                text: insert.clone(),
            }],
        };
        session
            .notify("textDocument/didChange", Some(serde_json::to_value(change)?))
            .await?;
    }

    let completion = CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    };
    tracing::info!(line = args.line, column = args.column, "requesting completions");
    let result = session
        .request(
            "textDocument/completion",
            Some(serde_json::to_value(completion)?),
            timeout,
        )
        .await
        .context("completion request failed")?;

    // Item-array and CompletionList shapes are resolved here, once.
    let items = match rpc::completion_response(result)? {
        Some(lsp_types::CompletionResponse::Array(items)) => items,
        Some(lsp_types::CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    };
    report::print_completions(&items);

    if let Some(first) = items.first() {
        tracing::info!(label = %first.label, "resolving first completion item");
        let resolved = session
            .request(
                "completionItem/resolve",
                Some(serde_json::to_value(first)?),
                timeout,
            )
            .await
            .context("completionItem/resolve failed")?;
        report::print_json("resolved item", &resolved);
    }

    let close = DidCloseTextDocumentParams {
        text_document: TextDocumentIdentifier { uri },
    };
    session
        .notify("textDocument/didClose", Some(serde_json::to_value(close)?))
        .await?;

    session.shutdown(timeout).await.context("shutdown failed")?;
    session.exit().await?;

    Ok(())
}
