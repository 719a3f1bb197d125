use std::io::{self, BufRead, Read, Write};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::lsp::handler::Server;

/// Largest message body accepted from the client.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Serve `Content-Length` framed messages until EOF or an `exit` notification.
pub fn serve<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, server: &mut Server) -> Result<()> {
    let mut buffer = String::new();

    loop {
        // --- Parse headers ---
        let mut content_length = 0;
        loop {
            buffer.clear();
            if reader.read_line(&mut buffer).context("Reading header")? == 0 {
                debug!("Input closed");
                return Ok(());
            }
            if buffer == "\r\n" || buffer == "\n" {
                break;
            }
            if let Some((name, value)) = buffer.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse::<usize>().unwrap_or(0);
                }
            }
        }

        if content_length == 0 {
            warn!("Invalid Content-Length");
            continue;
        }
        if content_length > MAX_CONTENT_LENGTH {
            warn!(content_length, "Content-Length too large, skipping message");
            io::copy(&mut reader.by_ref().take(content_length as u64), &mut io::sink())
                .context("Skipping message body")?;
            continue;
        }

        // --- Read the payload ---
        let mut content = vec![0u8; content_length];
        reader.read_exact(&mut content).context("Reading message body")?;
        let request = String::from_utf8_lossy(&content);

        if let Some(response) = server.handle_request(&request) {
            write_message(writer, &response)?;
        }

        if server.exit_requested() {
            debug!("Exit requested");
            return Ok(());
        }
    }
}

pub fn write_message<W: Write>(writer: &mut W, message: &str) -> Result<()> {
    let bytes = message.as_bytes();
    write!(writer, "Content-Length: {}\r\n\r\n", bytes.len())?;
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
