//! PackageManager 相关数据类型定义

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::metadata::RepoMetadata;

/// 操作范围：项目本地 / 全局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scope {
    #[default]
    Local,
    Global,
}

/// 调用方传入的操作参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationRequest {
    pub scope: Scope,
    /// 指向项目内某个文件（通常是 package.json），子进程在其父目录中运行
    pub working_directory: Option<PathBuf>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    /// 批量操作的包名，非空时优先于 `package_name`
    pub package_names: Vec<String>,
    /// 裸选项名，追加为 `--<flag>`
    pub extra_flags: Vec<String>,
    /// 仅 view 使用
    pub fetch_metadata: bool,
    /// 仅 view 使用：原样带回结果
    pub repository: Option<String>,
    pub latest: Option<String>,
}

impl OperationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(mut self) -> Self {
        self.scope = Scope::Global;
        self
    }

    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    pub fn package(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.package_version = Some(version.into());
        self
    }

    pub fn packages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.package_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.fetch_metadata = true;
        self
    }
}

/// 构建完成的命令行参数，第一个元素总是操作动词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentVector(Vec<String>);

impl ArgumentVector {
    pub(crate) fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn verb(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<'a> IntoIterator for &'a ArgumentVector {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[&str]> for ArgumentVector {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for ArgumentVector {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == &other[..]
    }
}

/// 输出流来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// 子进程运行期间推送给调用方的一段输出
#[derive(Debug, Clone, Serialize)]
pub struct StreamChunk {
    pub kind: StreamKind,
    pub cmd: ArgumentVector,
    pub text: String,
}

/// 终止标记：进程已结束，两个输出流均已关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Closed,
}

/// 随结果原样带回的请求字段（view 使用）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passthrough {
    pub repository: Option<String>,
    pub package_name: Option<String>,
    pub latest: Option<String>,
    pub fetch_metadata: bool,
}

/// 一次操作的最终结果
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub status: Status,
    /// 累积的 stderr 文本，无输出时为 None
    pub error: Option<String>,
    /// 累积的 stdout 文本，未做任何裁剪或解析
    pub data: String,
    pub cmd: ArgumentVector,
    /// 被信号终止时为 None
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub passthrough: Passthrough,
    pub metadata: Option<RepoMetadata>,
    pub finished_at: DateTime<Local>,
}

impl OperationResult {
    /// 退出码为 0 且没有 stderr 输出
    pub fn is_clean(&self) -> bool {
        self.exit_code == Some(0) && self.error.is_none()
    }

    /// 将 stdout 解析为 JSON（list/outdated/view/search 请求了 `--json`）
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.data)
    }
}
