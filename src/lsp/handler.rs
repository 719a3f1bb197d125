use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    InitializeParams, InitializeResult, Position, ServerCapabilities, ServerInfo,
    TextDocumentIdentifier, TextDocumentPositionParams, TextDocumentSyncCapability,
    TextDocumentSyncKind, Url,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::generator::TargetGenerator;
use crate::lsp::logger::{FunctionLogger, LspLogger};
use crate::session::DocumentSession;
use crate::util::error::RangeError;
use crate::util::position::PositionEncoding;

pub const INVALID_PARAMS: i64 = -32602;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const CONTENT_MODIFIED: i64 = -32801;

/// JSON-RPC error object of a failed request.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<RangeError> for ResponseError {
    fn from(err: RangeError) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: err.to_string(),
            data: serde_json::to_value(err).ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetDocumentParams {
    text_document: TextDocumentIdentifier,
}

/// Message dispatcher owning the state of the single tracked document.
pub struct Server {
    generator: Box<dyn TargetGenerator>,
    encoding: PositionEncoding,
    session: Option<DocumentSession>,
    logger: LspLogger,
    exit_requested: bool,
}

impl Server {
    pub fn new(generator: Box<dyn TargetGenerator>) -> Self {
        Self {
            generator,
            encoding: PositionEncoding::default(),
            session: None,
            logger: LspLogger::default(),
            exit_requested: false,
        }
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Handle one JSON-RPC message, returning the reply to send, if any.
    pub fn handle_request(&mut self, request: &str) -> Option<String> {
        let parsed: Value = match serde_json::from_str(request) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Dropping malformed message: {}", err);
                return None;
            }
        };
        let method = parsed.get("method")?.as_str()?;
        let params = parsed.get("params").cloned().unwrap_or(Value::Null);

        let Some(id) = parsed.get("id").cloned() else {
            let log = self.logger.log_incoming_notification(method);
            self.handle_notification(method, params, &log);
            return None;
        };

        let log = self.logger.log_incoming_request(&id, method);
        let response = match self.handle_call(method, params, &log) {
            Ok(result) => {
                self.logger.log_outgoing_response(&id, method, false);
                json!({ "jsonrpc": "2.0", "id": id, "result": result })
            }
            Err(err) => {
                log.log(&err.message);
                self.logger.log_outgoing_response(&id, method, true);
                json!({ "jsonrpc": "2.0", "id": id, "error": err })
            }
        };
        Some(response.to_string())
    }

    fn handle_call(
        &mut self,
        method: &str,
        params: Value,
        log: &FunctionLogger,
    ) -> Result<Value, ResponseError> {
        match method {
            "initialize" => self.initialize(parse_params(params)?, log),
            "shutdown" => Ok(Value::Null),
            "linemap/toTarget" => self.to_target(parse_params(params)?),
            "linemap/toSource" => self.to_source(parse_params(params)?),
            "linemap/targetDocument" => self.target_document(parse_params(params)?),
            _ => Err(ResponseError::new(
                METHOD_NOT_FOUND,
                format!("Unhandled method {}", method),
            )),
        }
    }

    fn handle_notification(&mut self, method: &str, params: Value, log: &FunctionLogger) {
        let result = match method {
            "textDocument/didOpen" => parse_params(params).map(|p| self.did_open(p, log)),
            "textDocument/didChange" => parse_params(params).map(|p| self.did_change(p, log)),
            "textDocument/didClose" => parse_params(params).map(|p| self.did_close(p)),
            "$/cancelRequest" => {
                if let Some(id) = params.get("id") {
                    self.logger.log_incoming_cancel_request(id);
                }
                Ok(())
            }
            "exit" => {
                self.exit_requested = true;
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            log.log(format!("Invalid params: {}", err.message));
        }
    }

    fn initialize(
        &mut self,
        params: InitializeParams,
        log: &FunctionLogger,
    ) -> Result<Value, ResponseError> {
        let offered = params
            .capabilities
            .general
            .and_then(|general| general.position_encodings)
            .unwrap_or_default();
        self.encoding = offered
            .iter()
            .find_map(PositionEncoding::from_kind)
            .unwrap_or_default();
        log.log(format!("Using position encoding {:?}", self.encoding));

        let result = InitializeResult {
            capabilities: ServerCapabilities {
                position_encoding: Some(self.encoding.kind()),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        };
        serde_json::to_value(result).map_err(|err| ResponseError::new(INVALID_PARAMS, err.to_string()))
    }

    fn did_open(&mut self, params: DidOpenTextDocumentParams, log: &FunctionLogger) {
        let doc = params.text_document;
        if let Some(session) = &self.session {
            if session.uri() != &doc.uri {
                warn!(old = %session.uri(), new = %doc.uri, "Only one document is tracked, replacing");
            }
        }

        match self.generator.generate(&doc.uri, &doc.text) {
            Ok(target) => {
                self.session = Some(DocumentSession::new(
                    doc.uri,
                    doc.version,
                    self.encoding,
                    doc.text,
                    target,
                ));
            }
            Err(err) => {
                error!("Generating target for {} failed: {:#}", doc.uri, err);
                log.log("document is not tracked");
                self.session = None;
            }
        }
    }

    fn did_change(&mut self, params: DidChangeTextDocumentParams, log: &FunctionLogger) {
        let Some(session) = self.session.as_mut().filter(|s| s.uri() == &params.text_document.uri)
        else {
            warn!(uri = %params.text_document.uri, "Change for untracked document");
            return;
        };

        let version = params.text_document.version;
        let total = params.content_changes.len();
        for (index, change) in params.content_changes.into_iter().enumerate() {
            match change.range {
                Some(range) => {
                    if let Err(err) = session.apply_change(range, &change.text) {
                        warn!(
                            uri = %session.uri(),
                            version,
                            ?range,
                            dropped = total - index,
                            "Dropping changes: {}",
                            err
                        );
                        log.log(format!("document is out of sync at version {}", version));
                        break;
                    }
                }
                None => session.replace_source(change.text),
            }
        }
        session.set_version(version);

        if session.is_stale() {
            match self.generator.generate(session.uri(), session.source_text()) {
                Ok(target) => session.regenerate(target),
                Err(err) => error!("Regenerating target for {} failed: {:#}", session.uri(), err),
            }
        }
    }

    fn did_close(&mut self, params: DidCloseTextDocumentParams) {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.uri() == &params.text_document.uri)
        {
            self.session = None;
        }
    }

    fn to_target(&self, params: TextDocumentPositionParams) -> Result<Value, ResponseError> {
        let session = self.fresh_session(&params.text_document.uri)?;
        let Some(position) = session.to_target_position(params.position) else {
            return Ok(Value::Null);
        };
        let offset = match session.target_offset(params.position) {
            Some(offset) => offset?,
            None => return Ok(Value::Null),
        };
        Ok(json!({ "position": position, "offset": offset }))
    }

    fn to_source(&self, params: TextDocumentPositionParams) -> Result<Value, ResponseError> {
        let session = self.fresh_session(&params.text_document.uri)?;
        let position: Option<Position> = session.to_source_position(params.position);
        Ok(json!({ "position": position }))
    }

    fn target_document(&self, params: TargetDocumentParams) -> Result<Value, ResponseError> {
        let session = self.fresh_session(&params.text_document.uri)?;
        Ok(json!({
            "uri": session.uri(),
            "version": session.version(),
            "text": session.target_text(),
        }))
    }

    fn fresh_session(&self, uri: &Url) -> Result<&DocumentSession, ResponseError> {
        let session = self
            .session
            .as_ref()
            .filter(|s| s.uri() == uri)
            .ok_or_else(|| ResponseError::new(INVALID_PARAMS, format!("Document {} is not open", uri)))?;
        if session.is_stale() {
            return Err(ResponseError::new(
                CONTENT_MODIFIED,
                "Target document is out of date",
            ));
        }
        Ok(session)
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ResponseError> {
    serde_json::from_value(params).map_err(|err| ResponseError::new(INVALID_PARAMS, err.to_string()))
}
