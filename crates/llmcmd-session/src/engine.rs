//! The interaction loop: drives turns against the broker, dispatches tool
//! calls to the FD table / orchestrator / VFS, and terminates on `exit`
//! or a hard limit.

use crate::audit_log::FileAuditLog;
use crate::tool_call::{self, ReadCount, ToolCall};
use llmcmd_broker::{Broker, ChatMessage, ChatRequest};
use llmcmd_core::{AuditEvent, AuditEventKind, AuditSink, EngineError, NullAuditSink, SessionStats};
use llmcmd_fd::table::{ReadRequest, WriteFlags};
use llmcmd_fd::{FdTable, STDIN};
use llmcmd_orchestrator::{Orchestrator, SpawnRequest};
use llmcmd_vfs::{OpenMode, Vfs};
use serde_json::{json, Value};
use std::io::Read as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Resolved, per-run configuration the session needs once `llmcmd-config`
/// has layered defaults/file/env/CLI. Kept narrow here; the full
/// `RuntimeConfig` lives in `llmcmd-config` and is mapped into this shape
/// by the CLI binary.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_api_calls: u32,
    pub deadline: Duration,
}

/// How the session ended: either via the `exit` tool, a hard limit, or an
/// assistant turn with no tool calls and no further instructions to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: u8,
    pub message: Option<String>,
}

/// Owns the per-session engine wiring: FD table, orchestrator, broker, VFS,
/// stats and audit sink. `run` drives the Idle/AwaitingLLM/Dispatching/
/// Exiting state machine to completion.
pub struct Session {
    table: Arc<FdTable>,
    orchestrator: Orchestrator,
    broker: Broker,
    vfs: Vfs,
    stats: Arc<SessionStats>,
    audit: Arc<dyn AuditSink>,
    audit_seq: AtomicU64,
    config: SessionConfig,
}

impl Session {
    pub fn new(
        table: Arc<FdTable>,
        broker: Broker,
        vfs: Vfs,
        stats: Arc<SessionStats>,
        audit: Arc<dyn AuditSink>,
        config: SessionConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(Arc::clone(&table));
        Self {
            table,
            orchestrator,
            broker,
            vfs,
            stats,
            audit,
            audit_seq: AtomicU64::new(0),
            config,
        }
    }

    /// Construct a session with no audit sink (tests, `--no-audit`-style
    /// configurations).
    pub fn without_audit(table: Arc<FdTable>, broker: Broker, vfs: Vfs, stats: Arc<SessionStats>, config: SessionConfig) -> Self {
        Self::new(table, broker, vfs, stats, Arc::new(NullAuditSink), config)
    }

    fn next_seq(&self) -> u64 {
        self.audit_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, kind: AuditEventKind) {
        self.audit.record(AuditEvent {
            seq: self.next_seq(),
            ts: chrono::Utc::now(),
            kind,
        });
    }

    /// Drive the interaction loop to completion.
    pub async fn run(&self) -> Result<ExitOutcome, EngineError> {
        let deadline = Instant::now() + self.config.deadline;
        let tools = tool_schema();
        let mut messages = vec![
            ChatMessage::system(self.config.system_prompt.clone()),
            ChatMessage::user(self.config.user_prompt.clone()),
        ];
        let mut calls_made = 0u32;

        loop {
            if Instant::now() >= deadline {
                self.table.force_close_all().await;
                let elapsed = self.config.deadline.as_secs_f64();
                self.record(AuditEventKind::SessionTerminated {
                    code: 2,
                    message: Some("session deadline exceeded".to_string()),
                });
                return Err(EngineError::Timeout(elapsed));
            }
            if calls_made >= self.config.max_api_calls {
                self.table.force_close_all().await;
                self.record(AuditEventKind::SessionTerminated {
                    code: 1,
                    message: Some("max API calls reached".to_string()),
                });
                return Ok(ExitOutcome {
                    code: 1,
                    message: Some("max API calls reached".to_string()),
                });
            }

            let remaining = self.broker.remaining_weighted().await;
            let mut turn_messages = messages.clone();
            turn_messages.push(ChatMessage::system(format!(
                "remaining weighted budget: {remaining:.2} units"
            )));

            let req = ChatRequest {
                model: self.config.model.clone(),
                messages: turn_messages,
                tools: Value::Null,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };

            self.stats.record_api_call();
            calls_made += 1;
            let response = match self.broker.chat(req, tools.clone()).await {
                Ok(resp) => resp,
                Err(err) => {
                    self.table.force_close_all().await;
                    self.record(AuditEventKind::SessionTerminated {
                        code: 2,
                        message: Some(err.to_string()),
                    });
                    return Err(err);
                }
            };
            let spent_this_turn = (remaining - self.broker.remaining_weighted().await).max(0.0);
            self.stats.record_weighted_usage(spent_this_turn);

            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: response.content.clone(),
                tool_call_id: None,
                tool_calls: response.tool_calls.clone(),
            });

            if response.tool_calls.is_empty() {
                // No further instructions to act on; the assistant's text is
                // the final answer.
                self.record(AuditEventKind::SessionTerminated { code: 0, message: response.content.clone() });
                return Ok(ExitOutcome { code: 0, message: response.content });
            }

            for call in &response.tool_calls {
                self.record(AuditEventKind::ToolCallDispatched {
                    call_id: call.id.clone(),
                    tool: call.function.name.clone(),
                });

                let outcome = self.dispatch(call).await;
                match outcome {
                    Dispatch::Result(text) => {
                        self.record(AuditEventKind::ToolCallResult { call_id: call.id.clone(), ok: true });
                        messages.push(ChatMessage::tool_result(call.id.clone(), encode_result(text)));
                    }
                    Dispatch::Recoverable(err) => {
                        self.record(AuditEventKind::ToolCallResult { call_id: call.id.clone(), ok: false });
                        messages.push(ChatMessage::tool_result(call.id.clone(), encode_result(format!("error: {err}"))));
                    }
                    Dispatch::Fatal(err) => {
                        self.table.force_close_all().await;
                        self.record(AuditEventKind::SessionTerminated {
                            code: 2,
                            message: Some(err.to_string()),
                        });
                        return Err(err);
                    }
                    Dispatch::Exit(outcome) => {
                        self.drain_on_exit().await;
                        self.record(AuditEventKind::SessionTerminated {
                            code: outcome.code as i32,
                            message: outcome.message.clone(),
                        });
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Graceful shutdown on `exit`: give in-flight tasks a bounded drain
    /// interval to observe EOF before force-closing everything.
    async fn drain_on_exit(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.table.force_close_all().await;
    }

    async fn dispatch(&self, call: &llmcmd_broker::ToolCall) -> Dispatch {
        let args: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(err) => {
                return Dispatch::Recoverable(EngineError::InvalidArgs(format!(
                    "malformed tool-call arguments: {err}"
                )))
            }
        };
        let parsed = match tool_call::parse(&call.function.name, &args) {
            Ok(p) => p,
            Err(err) => return Dispatch::Recoverable(err),
        };

        match parsed {
            ToolCall::Read { fd, count } => self.dispatch_read(fd, count).await,
            ToolCall::Write { fd, data, newline, eof } => self.dispatch_write(fd, data, newline, eof).await,
            ToolCall::Spawn { cmd, args, in_fd, out_fd, size } => {
                self.dispatch_spawn(cmd, args, in_fd, out_fd, size).await
            }
            ToolCall::Tee { in_fd, out_fds } => self.dispatch_tee(in_fd, out_fds).await,
            ToolCall::Close { fd } => self.dispatch_close(fd).await,
            ToolCall::Exit { code, message } => Dispatch::Exit(ExitOutcome { code, message }),
        }
    }

    async fn dispatch_read(&self, fd: u32, count: ReadCount) -> Dispatch {
        let request = match count {
            ReadCount::Bytes(n) => ReadRequest::Bytes(n),
            ReadCount::Lines(n) => ReadRequest::Lines(n),
        };
        match self.table.read(fd, request).await {
            Ok(outcome) => {
                self.stats.record_bytes_read(outcome.data.len() as u64);
                let text = json!({
                    "data": String::from_utf8_lossy(&outcome.data),
                    "eof": outcome.eof,
                })
                .to_string();
                Dispatch::Result(text)
            }
            Err(err) => classify(err),
        }
    }

    async fn dispatch_write(&self, fd: u32, data: String, newline: bool, eof: bool) -> Dispatch {
        let n = data.len();
        match self
            .table
            .write(fd, data.into_bytes(), WriteFlags { newline, eof })
            .await
        {
            Ok(written) => {
                self.stats.record_bytes_written(written as u64);
                Dispatch::Result(json!({ "bytes_written": n, "eof": eof }).to_string())
            }
            Err(err) => classify(err),
        }
    }

    async fn dispatch_spawn(
        &self,
        cmd: llmcmd_core::BuiltinCommand,
        mut args: Vec<String>,
        in_fd: Option<u32>,
        out_fd: Option<u32>,
        size: Option<usize>,
    ) -> Dispatch {
        let mut file_bytes = None;
        if in_fd.is_none() {
            if let Some((name, rest)) = extract_file_arg(&self.vfs, &args) {
                match self.read_vfs_file(&name).await {
                    Ok(bytes) => {
                        file_bytes = Some(bytes);
                        args = rest;
                    }
                    Err(err) => return classify(err),
                }
            }
        }

        let req = SpawnRequest { cmd, args, in_fd, out_fd, size };
        let resp = match self.orchestrator.spawn(req).await {
            Ok(resp) => resp,
            Err(err) => return classify(err),
        };
        self.stats.record_task_spawned();

        if let Some(bytes) = file_bytes {
            let n = bytes.len();
            if let Err(err) = self
                .table
                .write(resp.stdin_fd, bytes, WriteFlags { newline: false, eof: true })
                .await
            {
                return classify(err);
            }
            self.stats.record_bytes_written(n as u64);
        }

        Dispatch::Result(
            json!({
                "success": resp.success,
                "stdin_fd": resp.stdin_fd,
                "stdout_fd": resp.stdout_fd,
                "stderr_fd": resp.stderr_fd,
                "pid": resp.pid,
                "script_len": resp.script_len,
            })
            .to_string(),
        )
    }

    async fn dispatch_tee(&self, in_fd: u32, out_fds: Vec<u32>) -> Dispatch {
        match self.orchestrator.tee(in_fd, &out_fds).await {
            Ok(()) => Dispatch::Result(String::new()),
            Err(err) => classify(err),
        }
    }

    async fn dispatch_close(&self, fd: u32) -> Dispatch {
        match self.table.close(fd).await {
            Ok(()) => Dispatch::Result(String::new()),
            Err(err) => classify(err),
        }
    }

    async fn read_vfs_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let mut handle = self.vfs.open(name, OpenMode::Read)?;
        let owned_name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            handle
                .read_to_end(&mut buf)
                .map_err(|e| EngineError::InvalidArgs(format!("failed to read '{owned_name}': {e}")))?;
            Ok(buf)
        })
        .await
        .map_err(|e| EngineError::BugAssertion(format!("file read task panicked: {e}")))?
    }
}

/// Whether stdin should be auto-bound as the session's sole input FD: no
/// explicit input arguments were given and stdin is itself a pipe rather
/// than an interactive terminal.
pub fn stdin_auto_binds(inputs: &[String], stdin_is_pipe: bool) -> bool {
    inputs.is_empty() && stdin_is_pipe
}

/// Resolve the `-` sentinel on an input/output argument to the reserved
/// stdin/stdout FD; any other value is an opaque VFS-allow-listed name.
pub fn resolve_dash(arg: &str) -> Option<u32> {
    (arg == "-").then_some(STDIN)
}

enum Dispatch {
    Result(String),
    Recoverable(EngineError),
    Fatal(EngineError),
    Exit(ExitOutcome),
}

fn classify(err: EngineError) -> Dispatch {
    if err.is_recoverable() {
        Dispatch::Recoverable(err)
    } else {
        Dispatch::Fatal(err)
    }
}

fn encode_result(text: String) -> String {
    if text.is_empty() {
        "(no output)".to_string()
    } else {
        text
    }
}

/// The last positional arg names an allow-listed input file (and isn't a
/// flag): treat it as the spawned task's stdin content, e.g.
/// `spawn{cmd:"cat", args:["hello.txt"]}`.
fn extract_file_arg(vfs: &Vfs, args: &[String]) -> Option<(String, Vec<String>)> {
    let (last, rest) = args.split_last()?;
    if last.starts_with('-') || !vfs.is_input_allowed(last) {
        return None;
    }
    Some((last.clone(), rest.to_vec()))
}

/// The JSON-Schema function-calling tool definitions exposed to the
/// upstream LLM.
fn tool_schema() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "read",
                "description": "Read up to `count` bytes or `lines` lines from a file descriptor.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "fd": {"type": "integer", "minimum": 0},
                        "count": {"type": "integer", "minimum": 1, "maximum": 4096},
                        "lines": {"type": "integer", "minimum": 1, "maximum": 1000}
                    },
                    "required": ["fd"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "write",
                "description": "Write data to a file descriptor.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "fd": {"type": "integer", "minimum": 1},
                        "data": {"type": "string"},
                        "newline": {"type": "boolean"},
                        "eof": {"type": "boolean"}
                    },
                    "required": ["fd", "data"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "spawn",
                "description": "Launch a built-in command as a task wired through the FD table.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "cmd": {"type": "string"},
                        "args": {"type": "array", "items": {"type": "string"}},
                        "in_fd": {"type": "integer"},
                        "out_fd": {"type": "integer"},
                        "size": {"type": "integer"}
                    },
                    "required": ["cmd"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "tee",
                "description": "Fan out a file descriptor's bytes to one or more destinations.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "in_fd": {"type": "integer"},
                        "out_fds": {"type": "array", "items": {"type": "integer"}, "minItems": 1}
                    },
                    "required": ["in_fd", "out_fds"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "close",
                "description": "Close a file descriptor.",
                "parameters": {
                    "type": "object",
                    "properties": {"fd": {"type": "integer"}},
                    "required": ["fd"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "exit",
                "description": "Terminate the session with an exit code and optional message.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "code": {"type": "integer", "minimum": 0, "maximum": 255},
                        "message": {"type": "string"}
                    },
                    "required": ["code"]
                }
            }
        }
    ])
}
