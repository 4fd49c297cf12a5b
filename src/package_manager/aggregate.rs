//! 输出累积与结果封装

use super::types::{ArgumentVector, OperationResult, Passthrough, Status, StreamKind};
use chrono::Local;

/// 单次调用的 stdout / stderr 累积器
#[derive(Debug, Default)]
pub struct OutputAccumulator {
    stdout: String,
    stderr: String,
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: StreamKind, text: &str) {
        match kind {
            StreamKind::Stdout => self.stdout.push_str(text),
            StreamKind::Stderr => self.stderr.push_str(text),
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// 生成最终结果；stderr 为空时 `error` 为 None
    pub fn finish(self, cmd: ArgumentVector, exit_code: Option<i32>) -> OperationResult {
        let error = if self.stderr.is_empty() {
            None
        } else {
            Some(self.stderr)
        };
        OperationResult {
            status: Status::Closed,
            error,
            data: self.stdout,
            cmd,
            exit_code,
            passthrough: Passthrough::default(),
            metadata: None,
            finished_at: Local::now(),
        }
    }
}
