//! Initialize-handshake parameter construction.
//!
//! Builds the `InitializeParams` an editor-like client advertises:
//! completion with snippet and markdown-documentation support, diagnostics,
//! and workspace folders for the probed project.

use std::path::Path;
use std::str::FromStr;

use lsp_types::{
    ClientCapabilities, ClientInfo, CompletionClientCapabilities, CompletionItemCapability,
    InitializeParams, MarkupKind, PublishDiagnosticsClientCapabilities,
    TextDocumentClientCapabilities, Uri, WorkspaceClientCapabilities, WorkspaceFolder,
};

use crate::error::{Error, Result};

/// Convert a filesystem path to a `file://` URI.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] if the path is not valid UTF-8 or does not
/// form a parsable URI.
pub fn file_uri(path: &Path) -> Result<Uri> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::InvalidUri(format!("invalid UTF-8 in path: {}", path.display())))?;
    let uri_str = if cfg!(windows) {
        format!("file:///{}", path_str.replace('\\', "/"))
    } else {
        format!("file://{path_str}")
    };
    Uri::from_str(&uri_str)
        .map_err(|_| Error::InvalidUri(format!("invalid path: {}", path.display())))
}

/// Build `InitializeParams` for the given workspace roots.
///
/// Positions, documents and options are always caller-supplied; nothing in
/// here is specific to any particular project.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] if a workspace root cannot be expressed as
/// a `file://` URI.
pub fn initialize_params(
    workspace_roots: &[std::path::PathBuf],
    initialization_options: Option<serde_json::Value>,
) -> Result<InitializeParams> {
    let workspace_folders: Vec<WorkspaceFolder> = workspace_roots
        .iter()
        .map(|root| {
            Ok(WorkspaceFolder {
                uri: file_uri(root)?,
                name: root
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("workspace")
                    .to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(InitializeParams {
        process_id: Some(std::process::id()),
        initialization_options,
        capabilities: ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                completion: Some(CompletionClientCapabilities {
                    dynamic_registration: Some(true),
                    completion_item: Some(CompletionItemCapability {
                        snippet_support: Some(true),
                        documentation_format: Some(vec![
                            MarkupKind::Markdown,
                            MarkupKind::PlainText,
                        ]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                publish_diagnostics: Some(PublishDiagnosticsClientCapabilities {
                    related_information: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            workspace: Some(WorkspaceClientCapabilities {
                workspace_folders: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        },
        client_info: Some(ClientInfo {
            name: "lsprobe".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        workspace_folders: Some(workspace_folders),
        ..Default::default()
    })
}
