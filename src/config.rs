use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 被封装的包管理器
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    #[default]
    Npm,
    Yarn,
}

impl Manager {
    pub fn name(&self) -> &'static str {
        match self {
            Manager::Npm => "npm",
            Manager::Yarn => "yarn",
        }
    }

    /// 可执行文件名；Windows 上使用 `.cmd` 包装脚本
    pub fn executable(&self) -> String {
        if cfg!(windows) {
            format!("{}.cmd", self.name())
        } else {
            self.name().to_string()
        }
    }
}

impl FromStr for Manager {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "npm" => Ok(Manager::Npm),
            "yarn" => Ok(Manager::Yarn),
            other => bail!("不支持的包管理器: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manager: Manager,
    /// 显式指定可执行文件路径，优先于 `manager`
    pub executable: Option<PathBuf>,
    /// 记录每次调用的命令行与退出码
    pub verbose: bool,
    pub github_api: String,
    pub github_token: Option<String>,
    pub metadata_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manager: Manager::default(),
            executable: None,
            verbose: false,
            github_api: "https://api.github.com".to_string(),
            github_token: None,
            metadata_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/lian-yarn/config.toml")
    }

    /// 读取配置文件，不存在时使用默认值；`LIAN_YARN_MANAGER` 覆盖 `manager`
    pub fn load_or_default() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(manager) = std::env::var("LIAN_YARN_MANAGER") {
            config.manager = manager.parse()?;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 实际启动的程序
    pub fn program(&self) -> PathBuf {
        self.executable
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.manager.executable()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("manager = \"yarn\"\nverbose = true\n").unwrap();
        assert_eq!(config.manager, Manager::Yarn);
        assert!(config.verbose);
        assert_eq!(config.github_api, "https://api.github.com");
        assert_eq!(config.metadata_timeout_secs, 10);
        assert!(config.program().to_string_lossy().starts_with("yarn"));
    }

    #[test]
    fn test_executable_overrides_manager() {
        let config = Config {
            executable: Some(PathBuf::from("/opt/node/bin/npm")),
            ..Config::default()
        };
        assert_eq!(config.program(), PathBuf::from("/opt/node/bin/npm"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.manager, Manager::Npm);
        assert!(!config.verbose);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "executable = \"/usr/local/bin/yarn\"\ngithub_token = \"t\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.program(), PathBuf::from("/usr/local/bin/yarn"));
        assert_eq!(config.github_token.as_deref(), Some("t"));
    }

    #[test]
    fn test_manager_from_str() {
        assert_eq!("YARN".parse::<Manager>().unwrap(), Manager::Yarn);
        assert!("pnpm".parse::<Manager>().is_err());
    }
}
