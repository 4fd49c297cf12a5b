//! 驱动 npm / yarn 命令行：构建参数、流式转发输出、汇总统一结果

pub mod config;
pub mod error;
pub mod metadata;
pub mod package_manager;

pub use config::{Config, Manager};
pub use error::{Error, Result};
pub use metadata::{GithubClient, MetadataSource, RepoIdentity, RepoMetadata};
pub use package_manager::{
    ArgumentVector, ChannelObserver, ChunkObserver, OperationKind, OperationRequest,
    OperationResult, PackageManager, ProcessRunner, Scope, StreamChunk, StreamKind,
};
