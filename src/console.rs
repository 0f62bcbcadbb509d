//! Line-oriented debugging console.
//!
//! Each input line is `<tool_name> [json-args]`; each output line is the
//! JSON-encoded tool result. `tools` lists the registered tools and
//! `quit` ends the session.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use webhelm_core::Dispatcher;
use webhelm_protocols::{ErrorKind, ErrorPayload, ToolContext, ToolResult};

/// One parsed console line.
#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Call { tool: String, params: Value },
    ListTools,
    Quit,
}

pub(crate) fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head {
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        "tools" => return Ok(Some(Command::ListTools)),
        _ => {}
    }

    let params = if rest.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(rest).map_err(|e| format!("Arguments are not valid JSON: {}", e))?
    };
    Ok(Some(Command::Call {
        tool: head.to_string(),
        params,
    }))
}

/// Read commands from `input` until EOF or `quit`, writing one JSON line per
/// command to `output`.
pub(crate) async fn run<R, W>(dispatcher: &Dispatcher, input: R, mut output: W) -> anyhow::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::ListTools)) => {
                serde_json::to_string(&dispatcher.registry().list())?
            }
            Ok(Some(Command::Call { tool, params })) => {
                let ctx = ToolContext::new();
                debug!(tool = %tool, correlation_id = %ctx.correlation_id, "Console call");
                let result = dispatcher.dispatch(&tool, params, ctx).await;
                serde_json::to_string(&result)?
            }
            Err(message) => serde_json::to_string(&ToolResult::failure(ErrorPayload::new(
                ErrorKind::Validation,
                message,
            )))?,
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_call_with_args() {
        let cmd = parse_line(r#"browser_navigate {"url": "https://example.com"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Call {
                tool: "browser_navigate".to_string(),
                params: json!({"url": "https://example.com"})
            }
        );
    }

    #[test]
    fn test_parse_call_without_args() {
        let cmd = parse_line("  browser_status  ").unwrap().unwrap();
        assert_eq!(
            cmd,
            Command::Call {
                tool: "browser_status".to_string(),
                params: json!({})
            }
        );
    }

    #[test]
    fn test_parse_blank_comment_and_builtins() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("# a comment").unwrap(), None);
        assert_eq!(parse_line("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_line("tools").unwrap(), Some(Command::ListTools));
    }

    #[test]
    fn test_parse_bad_json() {
        let err = parse_line("browser_click {selector:").unwrap_err();
        assert!(err.contains("not valid JSON"));
    }
}
