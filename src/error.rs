//! 编排层错误类型

use thiserror::Error;

/// 编排层错误
///
/// 工具自身报告的错误（stderr 输出、非零退出码）不在此列，
/// 它们作为数据出现在 `OperationResult` 中。
#[derive(Error, Debug)]
pub enum Error {
    /// 请求参数不完整或组合无效，未启动任何进程
    #[error("{operation}: 无效请求: {reason}")]
    InvalidRequest {
        operation: &'static str,
        reason: String,
    },

    /// 外部工具无法启动（未安装、无执行权限等）
    #[error("无法启动 {program}: {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_request(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            operation,
            reason: reason.into(),
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
