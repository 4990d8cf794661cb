//! Parses raw tool-call JSON arguments into strongly-typed calls, enforcing
//! a "no silent fallback" deprecated-parameter policy before any dispatch.

use llmcmd_core::{BuiltinCommand, EngineError};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCount {
    Bytes(usize),
    Lines(usize),
}

#[derive(Debug, Clone)]
pub enum ToolCall {
    Read {
        fd: u32,
        count: ReadCount,
    },
    Write {
        fd: u32,
        data: String,
        newline: bool,
        eof: bool,
    },
    Spawn {
        cmd: BuiltinCommand,
        args: Vec<String>,
        in_fd: Option<u32>,
        out_fd: Option<u32>,
        size: Option<usize>,
    },
    Tee {
        in_fd: u32,
        out_fds: Vec<u32>,
    },
    Close {
        fd: u32,
    },
    Exit {
        code: u8,
        message: Option<String>,
    },
}

/// Parse one `(name, arguments)` tool call pair, as delivered in an
/// assistant message's `tool_calls[].function`.
pub fn parse(name: &str, args: &Value) -> Result<ToolCall, EngineError> {
    let obj = args
        .as_object()
        .ok_or_else(|| EngineError::InvalidArgs(format!("{name}: arguments must be a JSON object")))?;

    match name {
        "read" => {
            let fd = require_u32(obj, "fd")?;
            let count = match (obj.get("count"), obj.get("lines")) {
                (Some(c), None) => ReadCount::Bytes(as_usize(c, "count")?),
                (None, Some(l)) => ReadCount::Lines(as_usize(l, "lines")?),
                (Some(_), Some(_)) => {
                    return Err(EngineError::InvalidArgs(
                        "read: specify either 'count' or 'lines', not both".to_string(),
                    ))
                }
                (None, None) => {
                    return Err(EngineError::InvalidArgs(
                        "read: one of 'count' or 'lines' is required".to_string(),
                    ))
                }
            };
            Ok(ToolCall::Read { fd, count })
        }
        "write" => Ok(ToolCall::Write {
            fd: require_u32(obj, "fd")?,
            data: obj
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| EngineError::InvalidArgs("write: 'data' is required".to_string()))?
                .to_string(),
            newline: obj.get("newline").and_then(Value::as_bool).unwrap_or(false),
            eof: obj.get("eof").and_then(Value::as_bool).unwrap_or(false),
        }),
        "spawn" => parse_spawn(obj),
        "tee" => {
            let in_fd = require_u32(obj, "in_fd")?;
            let out_fds = obj
                .get("out_fds")
                .and_then(Value::as_array)
                .ok_or_else(|| EngineError::InvalidArgs("tee: 'out_fds' array is required".to_string()))?
                .iter()
                .map(|v| as_usize(v, "out_fds[]").map(|n| n as u32))
                .collect::<Result<Vec<_>, _>>()?;
            if out_fds.is_empty() {
                return Err(EngineError::InvalidArgs("tee: 'out_fds' must not be empty".to_string()));
            }
            Ok(ToolCall::Tee { in_fd, out_fds })
        }
        "close" => Ok(ToolCall::Close { fd: require_u32(obj, "fd")? }),
        "exit" => {
            let code = require_u32(obj, "code")?;
            if code > 255 {
                return Err(EngineError::InvalidArgs("exit: 'code' must be 0..=255".to_string()));
            }
            Ok(ToolCall::Exit {
                code: code as u8,
                message: obj.get("message").and_then(Value::as_str).map(str::to_string),
            })
        }
        other => Err(EngineError::UnknownCommand(other.to_string())),
    }
}

fn parse_spawn(obj: &serde_json::Map<String, Value>) -> Result<ToolCall, EngineError> {
    check_legacy_spawn_shape(obj)?;

    let cmd_name = obj
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::InvalidArgs("spawn: 'cmd' is required".to_string()))?;
    let cmd = BuiltinCommand::parse(cmd_name).ok_or_else(|| EngineError::UnknownCommand(cmd_name.to_string()))?;

    let args = obj
        .get("args")
        .map(|v| {
            v.as_array()
                .ok_or_else(|| EngineError::InvalidArgs("spawn: 'args' must be an array of strings".to_string()))?
                .iter()
                .map(|a| {
                    a.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| EngineError::InvalidArgs("spawn: 'args' elements must be strings".to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let in_fd = obj.get("in_fd").map(|v| as_usize(v, "in_fd")).transpose()?.map(|n| n as u32);
    let out_fd = obj.get("out_fd").map(|v| as_usize(v, "out_fd")).transpose()?.map(|n| n as u32);
    let size = obj.get("size").map(|v| as_usize(v, "size")).transpose()?;

    Ok(ToolCall::Spawn { cmd, args, in_fd, out_fd, size })
}

/// The legacy spawn shape used a bare `script` key; any call carrying it is
/// rejected outright, reporting whichever of `in_fd`/`out_fd`/`script` is
/// present, in that priority order.
fn check_legacy_spawn_shape(obj: &serde_json::Map<String, Value>) -> Result<(), EngineError> {
    if obj.contains_key("script") {
        for key in ["in_fd", "out_fd", "script"] {
            if obj.contains_key(key) {
                return Err(EngineError::DeprecatedParam(key.to_string()));
            }
        }
    }
    Ok(())
}

fn require_u32(obj: &serde_json::Map<String, Value>, key: &str) -> Result<u32, EngineError> {
    let value = obj
        .get(key)
        .ok_or_else(|| EngineError::InvalidArgs(format!("'{key}' is required")))?;
    as_usize(value, key).map(|n| n as u32)
}

fn as_usize(value: &Value, field: &str) -> Result<usize, EngineError> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| EngineError::InvalidArgs(format!("'{field}' must be a non-negative integer")))
}
