pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use stackyard_core::SharingPolicy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// プロジェクトディレクトリ名
pub const PROJECT_DIR: &str = ".stackyard";

/// プロジェクトルートを直接指定する環境変数
pub const PROJECT_ROOT_ENV: &str = "STACKYARD_PROJECT_ROOT";

/// `.stackyard/config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub stack: StackSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing: Option<SharingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSection {
    /// 起動対象のサービス（サービス指定なしの up で使う）
    #[serde(default)]
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub services: HashMap<String, bool>,
}

impl ProjectConfig {
    /// 共有ポリシーに変換
    pub fn sharing_policy(&self) -> Option<SharingPolicy> {
        self.sharing.as_ref().map(|s| SharingPolicy {
            enabled: s.enabled,
            services: s.services.clone(),
        })
    }

    /// プロジェクト名を決定
    ///
    /// 優先順位: 明示指定 > config.yaml の project.name > ルートディレクトリ名
    pub fn project_name(&self, explicit: Option<&str>, root: &Path) -> Result<String> {
        let name = explicit
            .map(str::to_string)
            .or_else(|| self.project.name.clone())
            .or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
            })
            .unwrap_or_default();
        validate_project_name(&name)?;
        Ok(name)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.project.name {
            validate_project_name(name)?;
        }

        let mut seen = HashSet::new();
        for service in &self.stack.enabled {
            if !seen.insert(service.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "stack.enabled に '{service}' が重複しています"
                )));
            }
        }
        Ok(())
    }
}

/// プロジェクト名の検証（英数字とハイフンで2〜50文字）
pub fn validate_project_name(name: &str) -> Result<()> {
    let valid_len = (2..=50).contains(&name.len());
    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(ConfigError::InvalidProjectName {
            name: name.to_string(),
        })
    }
}

/// プロジェクト内の各種パス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.project_dir().join("config.yaml")
    }

    pub fn local_config_file(&self) -> PathBuf {
        self.project_dir().join("config.local.yaml")
    }

    pub fn service_configs_dir(&self) -> PathBuf {
        self.project_dir().join("service-configs")
    }

    /// プロジェクト独自のカタログ（存在すれば同梱カタログの代わりに使う）
    pub fn catalog_dir(&self) -> PathBuf {
        self.project_dir().join("catalog")
    }

    pub fn compose_file(&self) -> PathBuf {
        self.project_dir().join("generated").join("docker-compose.yml")
    }

    /// 特性テーブルの候補（優先順）
    ///
    /// プロジェクト、グローバルの順。どちらも無ければ組み込みテーブルを使う。
    pub fn characteristics_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.project_dir().join("characteristics.yaml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("stackyard").join("characteristics.yaml"));
        }
        candidates
    }
}

/// stackyardのグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackyard");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトルートを探す
///
/// 1. 環境変数 STACKYARD_PROJECT_ROOT
/// 2. カレントディレクトリから上位に `.stackyard/config.yaml` を探す
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let root = PathBuf::from(root);
        if root.join(PROJECT_DIR).join("config.yaml").exists() {
            return Ok(root);
        }
        return Err(ConfigError::ProjectRootNotFound { start: root });
    }

    let current_dir = std::env::current_dir()?;
    find_project_root_from(&current_dir)
}

/// `start` から上位に向かってプロジェクトルートを探す
pub fn find_project_root_from(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).join("config.yaml").is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::ProjectRootNotFound {
            start: start.to_path_buf(),
        })
}

/// プロジェクト設定を読み込む
///
/// `config.local.yaml` があれば `config.yaml` に深くマージする（ローカルが優先）。
#[tracing::instrument]
pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let paths = ProjectPaths::new(root);
    let mut merged = read_yaml(&paths.config_file())?;

    let local = paths.local_config_file();
    if local.exists() {
        debug!(path = %local.display(), "Merging local config");
        let overlay = read_yaml(&local)?;
        merge_yaml(&mut merged, overlay);
    }

    let config: ProjectConfig =
        serde_yaml::from_value(merged).map_err(|e| ConfigError::Parse {
            path: paths.config_file(),
            message: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}

fn read_yaml(path: &Path) -> Result<serde_yaml::Value> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    // 空ファイルは空のマップとして扱う
    Ok(match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    })
}

/// マッピング同士は再帰的にマージ、それ以外は上書き
fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn write_project(root: &Path, config: &str) {
        let dir = root.join(PROJECT_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yaml"), config).unwrap();
    }

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("stackyard"));
        assert!(config_dir.exists());
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(temp_dir.path(), "project:\n  name: myapp\n");
        let nested = temp_dir.path().join("src").join("api");
        fs::create_dir_all(&nested).unwrap();

        let root = find_project_root_from(&nested).unwrap();
        assert_eq!(root, temp_dir.path());
    }

    #[test]
    fn test_find_project_root_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_project_root_from(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::ProjectRootNotFound { .. })));
    }

    #[test]
    #[serial]
    fn test_find_project_root_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(temp_dir.path(), "{}\n");

        temp_env::with_var(PROJECT_ROOT_ENV, Some(temp_dir.path()), || {
            assert_eq!(find_project_root().unwrap(), temp_dir.path());
        });
    }

    #[test]
    #[serial]
    fn test_find_project_root_env_var_without_config() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_var(PROJECT_ROOT_ENV, Some(temp_dir.path()), || {
            assert!(find_project_root().is_err());
        });
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(
            temp_dir.path(),
            r#"
project:
  name: myapp
stack:
  enabled: [postgres, redis]
sharing:
  enabled: true
  services:
    postgres: false
"#,
        );

        let config = load_project_config(temp_dir.path()).unwrap();
        assert_eq!(config.project.name.as_deref(), Some("myapp"));
        assert_eq!(config.stack.enabled, vec!["postgres", "redis"]);

        let policy = config.sharing_policy().unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.services.get("postgres"), Some(&false));
    }

    #[test]
    fn test_local_config_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(
            temp_dir.path(),
            "project:\n  name: myapp\nstack:\n  enabled: [postgres]\n",
        );
        fs::write(
            temp_dir.path().join(PROJECT_DIR).join("config.local.yaml"),
            "stack:\n  enabled: [postgres, kafka]\n",
        )
        .unwrap();

        let config = load_project_config(temp_dir.path()).unwrap();
        // ローカル側の値が優先され、他のキーは残る
        assert_eq!(config.project.name.as_deref(), Some("myapp"));
        assert_eq!(config.stack.enabled, vec!["postgres", "kafka"]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(temp_dir.path(), "");

        let config = load_project_config(temp_dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(config.sharing_policy().is_none());
    }

    #[test]
    fn test_duplicate_enabled_is_validation_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(temp_dir.path(), "stack:\n  enabled: [redis, redis]\n");

        let result = load_project_config(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_project(temp_dir.path(), "stack: [unclosed\n");

        let result = load_project_config(temp_dir.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("myapp").is_ok());
        assert!(validate_project_name("my-app-2").is_ok());
        assert!(validate_project_name("a").is_err());
        assert!(validate_project_name("my_app").is_err());
        assert!(validate_project_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_project_name_priority() {
        let config = ProjectConfig {
            project: ProjectSection {
                name: Some("from-config".to_string()),
            },
            ..Default::default()
        };
        let root = Path::new("/work/MyDir");

        assert_eq!(config.project_name(Some("cli"), root).unwrap(), "cli");
        assert_eq!(config.project_name(None, root).unwrap(), "from-config");
        assert_eq!(
            ProjectConfig::default().project_name(None, root).unwrap(),
            "mydir"
        );
    }

    #[test]
    fn test_project_paths() {
        let paths = ProjectPaths::new("/work/app");
        assert_eq!(
            paths.compose_file(),
            PathBuf::from("/work/app/.stackyard/generated/docker-compose.yml")
        );
        assert_eq!(
            paths.service_configs_dir(),
            PathBuf::from("/work/app/.stackyard/service-configs")
        );
        assert_eq!(
            paths.characteristics_candidates()[0],
            PathBuf::from("/work/app/.stackyard/characteristics.yaml")
        );
    }
}
