use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 待查询的包 / 仓库标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub package_name: String,
    /// `owner/name`、`github:owner/name` 或任意 GitHub URL
    pub repository: Option<String>,
}

/// 仓库元数据（view 的可选补充信息）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    pub license: Option<String>,
    pub pushed_at: Option<String>,
}

/// 元数据查询能力；失败只记录日志，不影响 view 的结果
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, identity: &RepoIdentity) -> Result<RepoMetadata>;
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    full_name: String,
    description: Option<String>,
    homepage: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    subscribers_count: Option<u64>,
    watchers_count: u64,
    license: Option<GithubLicense>,
    pushed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubLicense {
    spdx_id: Option<String>,
    name: Option<String>,
}

impl From<GithubRepo> for RepoMetadata {
    fn from(repo: GithubRepo) -> Self {
        Self {
            full_name: repo.full_name,
            description: repo.description,
            homepage: repo.homepage.filter(|h| !h.is_empty()),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            watchers: repo.subscribers_count.unwrap_or(repo.watchers_count),
            license: repo.license.and_then(|l| l.spdx_id.or(l.name)),
            pushed_at: repo.pushed_at,
        }
    }
}

/// 从 npm 的 repository 字段中提取 `(owner, name)`
///
/// 支持 `owner/name`、`github:owner/name`、`git+https://github.com/owner/name.git`、
/// `git@github.com:owner/name.git` 等写法。
pub fn parse_github_repo(repository: &str) -> Option<(String, String)> {
    let repo = repository.trim();
    let path = if let Some(rest) = repo.strip_prefix("github:") {
        rest
    } else if let Some(pos) = repo.find("github.com") {
        repo[pos + "github.com".len()..].trim_start_matches([':', '/'])
    } else if !repo.contains(':') && !repo.starts_with('@') {
        repo
    } else {
        return None;
    };

    let path = path.split(['#', '?']).next().unwrap_or_default();
    let mut parts = path.trim_end_matches('/').splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts
        .next()
        .map(|s| s.trim_end_matches(".git"))
        .filter(|s| !s.is_empty())?;
    Some((owner.to_string(), name.to_string()))
}

/// 从 `npm view --json` 输出中取 repository 字段
pub fn repository_from_view(data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(data.trim()).ok()?;
    // yarn 的输出包在 {"type":"inspect","data":{...}} 中
    let package = value.get("data").filter(|d| d.is_object()).unwrap_or(&value);
    match package.get("repository")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj.get("url")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// GitHub REST API 客户端
pub struct GithubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lian-yarn/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl MetadataSource for GithubClient {
    async fn fetch(&self, identity: &RepoIdentity) -> Result<RepoMetadata> {
        let repository = identity
            .repository
            .as_deref()
            .ok_or_else(|| anyhow!("{} 没有仓库信息", identity.package_name))?;
        let (owner, name) = parse_github_repo(repository)
            .ok_or_else(|| anyhow!("不是 GitHub 仓库: {}", repository))?;

        let url = format!("{}/repos/{}/{}", self.api_base, owner, name);
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GitHub API 请求失败 (状态码 {}): {}",
                status,
                error_text
            ));
        }

        let repo: GithubRepo = response.json().await?;
        log::debug!("已获取 {} 的仓库信息", repo.full_name);
        Ok(repo.into())
    }
}
