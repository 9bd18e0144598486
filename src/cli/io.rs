//! JSON output for the CLI
//!
//! Every command prints exactly one JSON object on stdout:
//! `{"status": "ok", "data": ...}` or `{"status": "error", "code", "message"}`.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::CliResult;

/// Success envelope around `data`
pub fn response_value<T: Serialize>(data: &T) -> CliResult<Value> {
    Ok(serde_json::json!({
        "status": "ok",
        "data": serde_json::to_value(data)?
    }))
}

/// Error envelope
pub fn error_value(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response<T: Serialize>(data: &T) -> CliResult<()> {
    write_value(&response_value(data)?)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_value(&error_value(code, message))
}

fn write_value(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_envelope() {
        let value = response_value(&serde_json::json!({"pages": 3})).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["pages"], 3);
    }

    #[test]
    fn test_error_envelope() {
        let value = error_value("VAULT_NOT_FOUND", "Page not found: x");
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "VAULT_NOT_FOUND");
    }
}
