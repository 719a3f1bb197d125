use std::fmt::Display;

use serde_json::Value;
use tracing::{debug, info};

/// Logs protocol traffic with a direction prefix per side.
///
/// Requests and notifications are logged at `info`, responses and
/// cancellations at `debug`.
#[derive(Debug, Clone)]
pub struct LspLogger {
    pub incoming_prefix: String,
    pub outgoing_prefix: String,
}

impl Default for LspLogger {
    fn default() -> Self {
        Self::new("IDE --> LS", "IDE <-- LS")
    }
}

impl LspLogger {
    pub fn new(incoming_prefix: impl Into<String>, outgoing_prefix: impl Into<String>) -> Self {
        Self {
            incoming_prefix: incoming_prefix.into(),
            outgoing_prefix: outgoing_prefix.into(),
        }
    }

    pub fn log_incoming_request(&self, id: &Value, method: &str) -> FunctionLogger {
        info!("{} REQU {} {}", self.incoming_prefix, method, id);
        FunctionLogger {
            prefix: format!("{} {} {}", self.padding(), method, id),
        }
    }

    pub fn log_incoming_notification(&self, method: &str) -> FunctionLogger {
        info!("{} NOTIF {}", self.incoming_prefix, method);
        FunctionLogger {
            prefix: format!("{} {}", self.padding(), method),
        }
    }

    pub fn log_incoming_cancel_request(&self, id: &Value) {
        debug!("{} CANCEL {}", self.incoming_prefix, id);
    }

    pub fn log_outgoing_response(&self, id: &Value, method: &str, failed: bool) {
        if failed {
            debug!("{} RESP {} {} (error)", self.outgoing_prefix, method, id);
        } else {
            debug!("{} RESP {} {}", self.outgoing_prefix, method, id);
        }
    }

    fn padding(&self) -> String {
        " ".repeat(self.incoming_prefix.len())
    }
}

/// Logs on behalf of one message, indented under its header line.
#[derive(Debug, Clone)]
pub struct FunctionLogger {
    prefix: String,
}

impl FunctionLogger {
    pub fn log(&self, message: impl Display) {
        info!("{}: {}", self.prefix, message);
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_logger_is_indented_under_prefix() {
        let logger = LspLogger::new("IN", "OUT");
        let request = logger.log_incoming_request(&json!(7), "linemap/toTarget");
        assert_eq!(request.prefix(), "   linemap/toTarget 7");

        let notification = logger.log_incoming_notification("textDocument/didChange");
        assert_eq!(notification.prefix(), "   textDocument/didChange");
    }
}
