//! Scripted tool runner for tests.
//!
//! Replies are keyed by the kind of call (probe, resolve, section
//! download, ...). Each kind has a queue; the last reply in a queue is
//! reused once the others are consumed. Replies can write bytes to the
//! invocation's output path, standing in for real media, and leave
//! sibling files behind the way yt-dlp does.

use std::collections::{HashMap, VecDeque};
use std::future;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MediaError, MediaResult};
use crate::runner::{ProcessResult, Tool, ToolInvocation, ToolRunner};

/// What an invocation is doing, derived from its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Probe,
    Resolve,
    SectionDownload,
    FullDownload,
    CopyExtract,
    EncodeExtract,
}

impl Call {
    pub fn of(inv: &ToolInvocation) -> Self {
        match inv.tool {
            Tool::YtDlp if inv.has_arg("--version") => Call::Probe,
            Tool::YtDlp if inv.has_arg("--dump-single-json") => Call::Resolve,
            Tool::YtDlp if inv.has_arg("--download-sections") => Call::SectionDownload,
            Tool::YtDlp => Call::FullDownload,
            Tool::Ffmpeg if inv.arg_after("-c") == Some("copy") => Call::CopyExtract,
            Tool::Ffmpeg => Call::EncodeExtract,
        }
    }
}

/// Output path of an invocation: `-o` for yt-dlp, the last arg for ffmpeg.
pub fn output_path(inv: &ToolInvocation) -> Option<&str> {
    match inv.tool {
        Tool::YtDlp => inv.arg_after("-o"),
        Tool::Ffmpeg => inv.args.last().map(String::as_str),
    }
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Exit {
        code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        writes: Option<Vec<u8>>,
        leaves: Vec<String>,
    },
    /// Write any output and leftovers, then never finish.
    Hang {
        writes: Option<Vec<u8>>,
        leaves: Vec<String>,
    },
    Unavailable,
    Timeout,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Exit {
            code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
            writes: None,
            leaves: Vec::new(),
        }
    }

    pub fn hang() -> Self {
        Reply::Hang {
            writes: None,
            leaves: Vec::new(),
        }
    }

    pub fn fail(stderr: impl AsRef<[u8]>) -> Self {
        Reply::Exit {
            code: 1,
            stdout: Vec::new(),
            stderr: stderr.as_ref().to_vec(),
            writes: None,
            leaves: Vec::new(),
        }
    }

    pub fn stdout(mut self, data: impl AsRef<[u8]>) -> Self {
        if let Reply::Exit { stdout, .. } = &mut self {
            *stdout = data.as_ref().to_vec();
        }
        self
    }

    /// Write `data` to the invocation's output path before replying.
    pub fn writes(mut self, data: impl AsRef<[u8]>) -> Self {
        if let Reply::Exit { writes, .. } | Reply::Hang { writes, .. } = &mut self {
            *writes = Some(data.as_ref().to_vec());
        }
        self
    }

    /// Leave `<output><suffix>` behind, e.g. `.part`.
    pub fn leaves(mut self, suffix: &str) -> Self {
        if let Reply::Exit { leaves, .. } | Reply::Hang { leaves, .. } = &mut self {
            leaves.push(suffix.to_string());
        }
        self
    }
}

fn write_outputs(invocation: &ToolInvocation, writes: Option<Vec<u8>>, leaves: &[String]) -> MediaResult<()> {
    let Some(path) = output_path(invocation) else {
        return Ok(());
    };
    if let Some(data) = writes {
        std::fs::write(path, data)?;
    }
    for suffix in leaves {
        std::fs::write(format!("{path}{suffix}"), b"leftover")?;
    }
    Ok(())
}

/// Records every invocation and answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Mutex<HashMap<Call, VecDeque<Reply>>>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a kind of call.
    pub fn on(self, call: Call, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(call)
            .or_default()
            .push_back(reply);
        self
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Kinds of every invocation seen so far, in order.
    pub fn call_kinds(&self) -> Vec<Call> {
        self.calls().iter().map(Call::of).collect()
    }

    pub fn count(&self, call: Call) -> usize {
        self.call_kinds().into_iter().filter(|c| *c == call).count()
    }

    fn next_reply(&self, call: Call) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        let queue = replies.get_mut(&call)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> MediaResult<ProcessResult> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invocation.clone());

        let call = Call::of(invocation);
        let reply = self
            .next_reply(call)
            .unwrap_or_else(|| Reply::fail(format!("unscripted call: {call:?}")));

        match reply {
            Reply::Exit {
                code,
                stdout,
                stderr,
                writes,
                leaves,
            } => {
                write_outputs(invocation, writes, &leaves)?;
                Ok(ProcessResult {
                    exit_code: Some(code),
                    stdout,
                    stderr,
                })
            }
            Reply::Hang { writes, leaves } => {
                write_outputs(invocation, writes, &leaves)?;
                future::pending().await
            }
            Reply::Unavailable => Err(MediaError::tool_unavailable(invocation.tool.as_str())),
            Reply::Timeout => Err(MediaError::Timeout {
                tool: invocation.tool.to_string(),
                secs: 120,
            }),
        }
    }
}
