use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lian_yarn::{
    Config, Manager, OperationKind, OperationRequest, PackageManager, StreamChunk,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lian-yarn", about = "运行 npm / yarn 命令并输出 JSON 结果")]
struct Cli {
    /// 作用于全局包
    #[arg(short, long, global = true)]
    global: bool,

    /// 项目内的文件（通常是 package.json），命令在其所在目录运行
    #[arg(short, long, global = true)]
    directory: Option<PathBuf>,

    /// 覆盖配置文件中的包管理器
    #[arg(long, global = true)]
    manager: Option<Manager>,

    #[command(subcommand)]
    command: Op,
}

#[derive(Debug, Subcommand)]
enum Op {
    /// 列出已安装的包
    List,
    /// 列出可更新的包
    Outdated,
    /// 查看包信息
    View {
        name: String,
        #[arg(long)]
        version: Option<String>,
        /// 原样带回的最新版本提示
        #[arg(long)]
        latest: Option<String>,
        /// 仓库地址，缺省时从输出中读取
        #[arg(long)]
        repo: Option<String>,
        /// 查询 GitHub 仓库信息
        #[arg(long)]
        metadata: bool,
    },
    /// 搜索包
    Search { name: String },
    /// 安装包
    Install(Targets),
    /// 卸载包
    Uninstall(Targets),
}

#[derive(Debug, Args)]
struct Targets {
    #[arg(required = true)]
    names: Vec<String>,
    /// 仅在只有一个包名时生效
    #[arg(long)]
    version: Option<String>,
    /// 附加选项，如 `--flag save-dev`
    #[arg(long = "flag")]
    flags: Vec<String>,
}

impl Targets {
    fn into_request(self, req: OperationRequest) -> OperationRequest {
        let req = req.flags(self.flags);
        match <[String; 1]>::try_from(self.names) {
            Ok([name]) => {
                let req = req.package(name);
                match self.version {
                    Some(v) => req.version(v),
                    None => req,
                }
            }
            Err(names) => req.packages(names),
        }
    }
}

impl Cli {
    fn into_operation(self) -> (OperationKind, OperationRequest) {
        let mut req = OperationRequest::new();
        if self.global {
            req = req.global();
        }
        if let Some(dir) = self.directory {
            req = req.directory(dir);
        }

        match self.command {
            Op::List => (OperationKind::List, req),
            Op::Outdated => (OperationKind::Outdated, req),
            Op::View {
                name,
                version,
                latest,
                repo,
                metadata,
            } => {
                let mut req = req.package(name);
                req.package_version = version;
                req.latest = latest;
                req.repository = repo;
                req.fetch_metadata = metadata;
                (OperationKind::View, req)
            }
            Op::Search { name } => (OperationKind::Search, req.package(name)),
            Op::Install(targets) => (OperationKind::Install, targets.into_request(req)),
            Op::Uninstall(targets) => (OperationKind::Uninstall, targets.into_request(req)),
        }
    }
}

/// 实时输出（两个流都）写到 `sink`，stdout 只留给最终的 JSON 结果
fn echo_chunk(sink: &mut impl Write, chunk: &StreamChunk) -> std::io::Result<()> {
    sink.write_all(chunk.text.as_bytes())?;
    sink.flush()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // 加载配置，命令行参数优先
    let mut config = Config::load_or_default()?;
    if let Some(manager) = cli.manager {
        config.manager = manager;
    }

    let pm = PackageManager::from_config(&config)?;
    let (kind, req) = cli.into_operation();

    let mut echo = |chunk: StreamChunk| {
        let _ = echo_chunk(&mut std::io::stderr(), &chunk);
    };

    let result = pm.run(kind, &req, Some(&mut echo)).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    // stderr 中常有警告，只按退出码判断
    match result.exit_code {
        Some(0) => {}
        Some(code) => std::process::exit(code),
        None => std::process::exit(1),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lian_yarn::StreamKind;

    #[test]
    fn test_echo_writes_both_streams_to_sink() {
        let req = OperationRequest::new().package("react");
        let cmd = lian_yarn::package_manager::command::build(OperationKind::View, &req).unwrap();
        let chunk = |kind: StreamKind, text: &str| StreamChunk {
            kind,
            cmd: cmd.clone(),
            text: text.to_string(),
        };

        let mut sink = Vec::new();
        echo_chunk(&mut sink, &chunk(StreamKind::Stdout, "{\"name\":")).unwrap();
        echo_chunk(&mut sink, &chunk(StreamKind::Stderr, "npm WARN\n")).unwrap();
        echo_chunk(&mut sink, &chunk(StreamKind::Stdout, "\"react\"}")).unwrap();
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "{\"name\":npm WARN\n\"react\"}"
        );
    }
}
