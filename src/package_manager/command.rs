//! 命令参数构建（纯函数，不产生副作用）
//!
//! 每种操作对应一个经过校验的参数类型，由 `TryFrom<&OperationRequest>` 负责校验，
//! 由 `BuildArgs` 负责生成参数向量。

use super::types::{ArgumentVector, OperationRequest, Scope};
use crate::error::{Error, Result};

pub const JSON_FLAG: &str = "--json";
pub const DEPTH_FLAG: &str = "--depth=0";
pub const GLOBAL_FLAG: &str = "-g";

/// 六种受支持的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    List,
    Outdated,
    View,
    Search,
    Install,
    Uninstall,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        Self::List,
        Self::Outdated,
        Self::View,
        Self::Search,
        Self::Install,
        Self::Uninstall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Outdated => "outdated",
            Self::View => "view",
            Self::Search => "search",
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        }
    }
}

/// 由已校验参数生成参数向量
pub trait BuildArgs {
    const VERB: &'static str;

    /// 追加动词之后的全部参数
    fn push_args(&self, argv: &mut Vec<String>);

    fn build(&self) -> ArgumentVector {
        let mut argv = vec![Self::VERB.to_string()];
        self.push_args(&mut argv);
        ArgumentVector::new(argv)
    }
}

fn push_scope(argv: &mut Vec<String>, scope: Scope) {
    if scope == Scope::Global {
        argv.push(GLOBAL_FLAG.to_string());
    }
}

fn push_defaults(argv: &mut Vec<String>) {
    argv.push(DEPTH_FLAG.to_string());
    argv.push(JSON_FLAG.to_string());
}

/// 空字符串等同于未提供
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn required_name<'a>(operation: &'static str, req: &'a OperationRequest) -> Result<&'a str> {
    non_empty(&req.package_name)
        .ok_or_else(|| Error::invalid_request(operation, "必须提供包名 (package_name)"))
}

/// `name@version` 或 `name`
fn versioned(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{}@{}", name, v),
        None => name.to_string(),
    }
}

/// install / uninstall 的目标包
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Single(String),
    Multiple(Vec<String>),
}

impl Targets {
    /// install 与 uninstall 共用：非空的 `package_names` 优先，空包名被忽略
    fn resolve(operation: &'static str, req: &OperationRequest) -> Result<Self> {
        let names: Vec<String> = req
            .package_names
            .iter()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect();
        if !names.is_empty() {
            return Ok(Self::Multiple(names));
        }
        let name = non_empty(&req.package_name).ok_or_else(|| {
            Error::invalid_request(operation, "必须提供包名 (package_name 或 package_names)")
        })?;
        Ok(Self::Single(versioned(name, non_empty(&req.package_version))))
    }

    fn push(&self, argv: &mut Vec<String>) {
        match self {
            Self::Single(target) => argv.push(target.clone()),
            Self::Multiple(targets) => argv.extend(targets.iter().cloned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCommand {
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedCommand {
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCommand {
    pub scope: Scope,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCommand {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub scope: Scope,
    pub targets: Targets,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallCommand {
    pub scope: Scope,
    pub targets: Targets,
}

impl TryFrom<&OperationRequest> for ListCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        Ok(Self { scope: req.scope })
    }
}

impl TryFrom<&OperationRequest> for OutdatedCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        Ok(Self { scope: req.scope })
    }
}

impl TryFrom<&OperationRequest> for ViewCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        let name = required_name(Self::VERB, req)?;
        Ok(Self {
            scope: req.scope,
            target: versioned(name, non_empty(&req.package_version)),
        })
    }
}

impl TryFrom<&OperationRequest> for SearchCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        let name = required_name(Self::VERB, req)?;
        Ok(Self {
            name: name.to_string(),
        })
    }
}

impl TryFrom<&OperationRequest> for InstallCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            scope: req.scope,
            targets: Targets::resolve(Self::VERB, req)?,
            flags: req.extra_flags.clone(),
        })
    }
}

impl TryFrom<&OperationRequest> for UninstallCommand {
    type Error = Error;

    fn try_from(req: &OperationRequest) -> Result<Self> {
        if !req.extra_flags.is_empty() {
            log::debug!("uninstall 不支持附加选项，已忽略: {:?}", req.extra_flags);
        }
        Ok(Self {
            scope: req.scope,
            targets: Targets::resolve(Self::VERB, req)?,
        })
    }
}

// list 的作用域标志位于默认参数之前，outdated 则位于之后，
// 两者顺序不可互换。
impl BuildArgs for ListCommand {
    const VERB: &'static str = "list";

    fn push_args(&self, argv: &mut Vec<String>) {
        push_scope(argv, self.scope);
        push_defaults(argv);
    }
}

impl BuildArgs for OutdatedCommand {
    const VERB: &'static str = "outdated";

    fn push_args(&self, argv: &mut Vec<String>) {
        push_defaults(argv);
        push_scope(argv, self.scope);
    }
}

impl BuildArgs for ViewCommand {
    const VERB: &'static str = "view";

    fn push_args(&self, argv: &mut Vec<String>) {
        argv.push(self.target.clone());
        push_defaults(argv);
        push_scope(argv, self.scope);
    }
}

impl BuildArgs for SearchCommand {
    const VERB: &'static str = "search";

    fn push_args(&self, argv: &mut Vec<String>) {
        argv.push(self.name.clone());
        push_defaults(argv);
    }
}

impl BuildArgs for InstallCommand {
    const VERB: &'static str = "install";

    fn push_args(&self, argv: &mut Vec<String>) {
        push_scope(argv, self.scope);
        self.targets.push(argv);
        argv.extend(self.flags.iter().map(|flag| format!("--{}", flag)));
    }
}

impl BuildArgs for UninstallCommand {
    const VERB: &'static str = "uninstall";

    fn push_args(&self, argv: &mut Vec<String>) {
        push_scope(argv, self.scope);
        self.targets.push(argv);
    }
}

/// 已校验的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List(ListCommand),
    Outdated(OutdatedCommand),
    View(ViewCommand),
    Search(SearchCommand),
    Install(InstallCommand),
    Uninstall(UninstallCommand),
}

impl Operation {
    /// 校验请求；失败时返回 `InvalidRequest`
    pub fn from_request(kind: OperationKind, req: &OperationRequest) -> Result<Self> {
        Ok(match kind {
            OperationKind::List => Self::List(req.try_into()?),
            OperationKind::Outdated => Self::Outdated(req.try_into()?),
            OperationKind::View => Self::View(req.try_into()?),
            OperationKind::Search => Self::Search(req.try_into()?),
            OperationKind::Install => Self::Install(req.try_into()?),
            OperationKind::Uninstall => Self::Uninstall(req.try_into()?),
        })
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::List(_) => OperationKind::List,
            Self::Outdated(_) => OperationKind::Outdated,
            Self::View(_) => OperationKind::View,
            Self::Search(_) => OperationKind::Search,
            Self::Install(_) => OperationKind::Install,
            Self::Uninstall(_) => OperationKind::Uninstall,
        }
    }

    pub fn args(&self) -> ArgumentVector {
        match self {
            Self::List(c) => c.build(),
            Self::Outdated(c) => c.build(),
            Self::View(c) => c.build(),
            Self::Search(c) => c.build(),
            Self::Install(c) => c.build(),
            Self::Uninstall(c) => c.build(),
        }
    }
}

/// 校验并构建参数向量
pub fn build(kind: OperationKind, req: &OperationRequest) -> Result<ArgumentVector> {
    Operation::from_request(kind, req).map(|op| op.args())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: OperationKind, req: &OperationRequest) -> ArgumentVector {
        build(kind, req).unwrap()
    }

    #[test]
    fn test_list_scope_flag_precedes_defaults() {
        let local = args(OperationKind::List, &OperationRequest::new());
        assert_eq!(local, ["list", "--depth=0", "--json"]);
        assert!(!local.contains("-g"));

        let global = args(OperationKind::List, &OperationRequest::new().global());
        assert_eq!(global, ["list", "-g", "--depth=0", "--json"]);
    }

    #[test]
    fn test_outdated_scope_flag_follows_defaults() {
        let local = args(OperationKind::Outdated, &OperationRequest::new());
        assert_eq!(local, ["outdated", "--depth=0", "--json"]);

        let global = args(OperationKind::Outdated, &OperationRequest::new().global());
        assert_eq!(global, ["outdated", "--depth=0", "--json", "-g"]);
    }

    #[test]
    fn test_view_target() {
        let bare = args(OperationKind::View, &OperationRequest::new().package("react"));
        assert_eq!(bare, ["view", "react", "--depth=0", "--json"]);

        let pinned = args(
            OperationKind::View,
            &OperationRequest::new().package("react").version("18.2.0").global(),
        );
        assert_eq!(pinned, ["view", "react@18.2.0", "--depth=0", "--json", "-g"]);
    }

    #[test]
    fn test_search_ignores_scope() {
        let cmd = args(
            OperationKind::Search,
            &OperationRequest::new().package("lodash").global(),
        );
        assert_eq!(cmd, ["search", "lodash", "--depth=0", "--json"]);
    }

    #[test]
    fn test_install_single_with_version() {
        let cmd = args(
            OperationKind::Install,
            &OperationRequest::new().package("lodash").version("4.17.0"),
        );
        assert_eq!(cmd, ["install", "lodash@4.17.0"]);
    }

    #[test]
    fn test_install_multiple_takes_precedence() {
        let cmd = args(
            OperationKind::Install,
            &OperationRequest::new()
                .package("ignored")
                .version("1.0.0")
                .packages(["a", "b"])
                .global(),
        );
        assert_eq!(cmd, ["install", "-g", "a", "b"]);
    }

    #[test]
    fn test_install_extra_flags_keep_order() {
        let cmd = args(
            OperationKind::Install,
            &OperationRequest::new()
                .package("typescript")
                .flags(["save-dev", "save-exact", "save-dev"]),
        );
        assert_eq!(
            cmd,
            ["install", "typescript", "--save-dev", "--save-exact", "--save-dev"]
        );
    }

    #[test]
    fn test_uninstall_pins_version_and_ignores_flags() {
        let cmd = args(
            OperationKind::Uninstall,
            &OperationRequest::new()
                .package("left-pad")
                .version("1.3.0")
                .flags(["save"])
                .global(),
        );
        assert_eq!(cmd, ["uninstall", "-g", "left-pad@1.3.0"]);

        let many = args(
            OperationKind::Uninstall,
            &OperationRequest::new().packages(["left-pad", "is-odd"]),
        );
        assert_eq!(many, ["uninstall", "left-pad", "is-odd"]);
    }

    #[test]
    fn test_empty_package_names_are_skipped() {
        for kind in [OperationKind::Install, OperationKind::Uninstall] {
            let filtered = args(kind, &OperationRequest::new().packages(["", "a", ""]));
            assert_eq!(filtered, [kind.as_str(), "a"]);

            let fallback = args(
                kind,
                &OperationRequest::new().package("lodash").packages([""]),
            );
            assert_eq!(fallback, [kind.as_str(), "lodash"]);

            let err = build(kind, &OperationRequest::new().packages(["", ""])).unwrap_err();
            assert!(err.is_invalid_request(), "{}: {}", kind.as_str(), err);
        }
    }

    #[test]
    fn test_missing_name_is_rejected() {
        for kind in [
            OperationKind::View,
            OperationKind::Search,
            OperationKind::Install,
            OperationKind::Uninstall,
        ] {
            let err = build(kind, &OperationRequest::new()).unwrap_err();
            assert!(err.is_invalid_request(), "{}: {}", kind.as_str(), err);

            let err = build(kind, &OperationRequest::new().package("")).unwrap_err();
            assert!(err.is_invalid_request(), "{}: {}", kind.as_str(), err);
        }
    }

    #[test]
    fn test_verb_matches_kind() {
        let req = OperationRequest::new().package("x");
        for kind in OperationKind::ALL {
            let op = Operation::from_request(kind, &req).unwrap();
            assert_eq!(op.kind(), kind);
            assert_eq!(op.args().verb(), kind.as_str());
        }
    }
}
