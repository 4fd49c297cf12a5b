//! 包管理器模块 — 对 npm / yarn 的封装

pub mod aggregate;
pub mod command;
pub mod streaming;
pub mod types;

// 重新导出常用类型和函数
pub use command::{Operation, OperationKind};
pub use streaming::{ChannelObserver, ChunkObserver, ProcessRunner};
pub use types::{
    ArgumentVector, OperationRequest, OperationResult, Passthrough, Scope, Status, StreamChunk,
    StreamKind,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::{repository_from_view, GithubClient, MetadataSource, RepoIdentity, RepoMetadata};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 丢弃实时输出
struct Discard;

impl ChunkObserver for Discard {
    fn on_chunk(&mut self, _chunk: StreamChunk) {}
}

/// 操作入口：每种操作一个方法，均返回统一的 `OperationResult`
///
/// 不持有可变状态，可以克隆后并发调用。
#[derive(Clone)]
pub struct PackageManager {
    runner: ProcessRunner,
    metadata: Option<Arc<dyn MetadataSource>>,
}

impl PackageManager {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            runner,
            metadata: None,
        }
    }

    /// 按配置创建，附带 GitHub 元数据查询
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let github = GithubClient::new(
            config.github_api.clone(),
            config.github_token.clone(),
            Duration::from_secs(config.metadata_timeout_secs),
        )?;
        Ok(Self::new(ProcessRunner::new(config.program(), config.verbose))
            .with_metadata_source(Arc::new(github)))
    }

    pub fn with_metadata_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(source);
        self
    }

    pub fn program(&self) -> &Path {
        self.runner.program()
    }

    /// 按操作类型分发
    pub async fn run(
        &self,
        kind: OperationKind,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        match kind {
            OperationKind::List => self.list(req, observer).await,
            OperationKind::Outdated => self.outdated(req, observer).await,
            OperationKind::View => self.view(req, observer).await,
            OperationKind::Search => self.search(req, observer).await,
            OperationKind::Install => self.install(req, observer).await,
            OperationKind::Uninstall => self.uninstall(req, observer).await,
        }
    }

    /// `list [-g] --depth=0 --json`，必须提供输出回调
    pub async fn list(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        let observer = observer
            .ok_or_else(|| Error::invalid_request("list", "必须提供输出回调"))?;
        self.execute(OperationKind::List, req, req.working_directory.as_deref(), Some(observer))
            .await
    }

    /// `outdated --depth=0 --json [-g]`，必须提供输出回调
    pub async fn outdated(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        let observer = observer
            .ok_or_else(|| Error::invalid_request("outdated", "必须提供输出回调"))?;
        self.execute(
            OperationKind::Outdated,
            req,
            req.working_directory.as_deref(),
            Some(observer),
        )
        .await
    }

    /// `view <name>[@<version>] --depth=0 --json [-g]`
    ///
    /// 请求中的 repository / latest 原样带回；设置了 `fetch_metadata` 时
    /// 额外查询仓库信息，查询失败不影响结果。
    pub async fn view(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        let mut result = self
            .execute(OperationKind::View, req, req.working_directory.as_deref(), observer)
            .await?;

        result.passthrough = Passthrough {
            repository: req.repository.clone(),
            package_name: req.package_name.clone(),
            latest: req.latest.clone(),
            fetch_metadata: req.fetch_metadata,
        };
        if req.fetch_metadata {
            result.metadata = self.enrich(req, &result.data).await;
        }
        Ok(result)
    }

    /// `search <name> --depth=0 --json`，总是在当前目录运行
    pub async fn search(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        self.execute(OperationKind::Search, req, None, observer).await
    }

    /// `install [-g] <targets...> [--<flag>...]`
    pub async fn install(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        self.execute(OperationKind::Install, req, req.working_directory.as_deref(), observer)
            .await
    }

    /// `uninstall [-g] <targets...>`
    pub async fn uninstall(
        &self,
        req: &OperationRequest,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        self.execute(OperationKind::Uninstall, req, req.working_directory.as_deref(), observer)
            .await
    }

    /// 校验并构建参数，校验失败时不会启动进程
    async fn execute(
        &self,
        kind: OperationKind,
        req: &OperationRequest,
        working_directory: Option<&Path>,
        observer: Option<&mut dyn ChunkObserver>,
    ) -> Result<OperationResult> {
        let cmd = command::build(kind, req)?;
        match observer {
            Some(observer) => self.runner.run(&cmd, working_directory, observer).await,
            None => self.runner.run(&cmd, working_directory, &mut Discard).await,
        }
    }

    async fn enrich(&self, req: &OperationRequest, data: &str) -> Option<RepoMetadata> {
        let Some(source) = &self.metadata else {
            log::debug!("未配置元数据来源，跳过");
            return None;
        };
        let identity = RepoIdentity {
            package_name: req.package_name.clone().unwrap_or_default(),
            repository: req.repository.clone().or_else(|| repository_from_view(data)),
        };
        match source.fetch(&identity).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                log::warn!("获取 {} 的仓库信息失败: {:#}", identity.package_name, e);
                None
            }
        }
    }
}
