//! 特性タグからライフサイクルオプションへの変換
//!
//! サービス定義の `characteristics` はそれ自体は意味を持たないタグで、
//! 対応表（YAML）を通して compose の up/down/stop オプションになる。

use crate::error::{Result, StackError};
use crate::model::{ServiceConfig, service_names};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const EMBEDDED_TABLE: &str = include_str!("../catalog/characteristics.yaml");

const FLAG_REMOVE_ORPHANS: &str = "--remove-orphans";
const FLAG_BUILD: &str = "--build";
const FLAG_FORCE_RECREATE: &str = "--force-recreate";
const FLAG_VOLUMES: &str = "--volumes";
const FLAG_VOLUMES_SHORT: &str = "-v";
const FLAG_TIMEOUT_PREFIX: &str = "--timeout=";

/// 1つの特性に対応するフラグ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    #[serde(default)]
    pub compose_up_flags: Vec<String>,
    #[serde(default)]
    pub compose_down_flags: Vec<String>,
}

/// 特性の対応表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicsTable {
    #[serde(default)]
    pub service_characteristics: HashMap<String, Characteristic>,
}

impl CharacteristicsTable {
    /// 同梱のデフォルト表
    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_TABLE, Path::new("characteristics.yaml"))
    }

    pub fn from_yaml(content: &str, source: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| StackError::YamlParse {
            path: source.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content, path)
    }

    /// 優先順位に従って読み込む
    ///
    /// 最初に存在するファイルを使い、どれも無ければ同梱の表を使う。
    pub fn load_with_priority<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.is_file() {
                debug!(path = %path.display(), "Using characteristics table");
                return Self::from_file(path);
            }
        }
        Self::embedded()
    }

    pub fn up_flags<S: AsRef<str>>(&self, characteristics: &[S]) -> Vec<String> {
        self.collect_flags(characteristics, |c| &c.compose_up_flags)
    }

    pub fn down_flags<S: AsRef<str>>(&self, characteristics: &[S]) -> Vec<String> {
        self.collect_flags(characteristics, |c| &c.compose_down_flags)
    }

    fn collect_flags<S, F>(&self, characteristics: &[S], select: F) -> Vec<String>
    where
        S: AsRef<str>,
        F: Fn(&Characteristic) -> &Vec<String>,
    {
        characteristics
            .iter()
            .filter_map(|tag| self.service_characteristics.get(tag.as_ref()))
            .flat_map(|c| select(c).iter().cloned())
            .collect()
    }
}

/// compose up のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpOptions {
    pub services: Vec<String>,
    pub detach: bool,
    pub build: bool,
    pub force_recreate: bool,
    pub remove_orphans: bool,
    pub no_deps: bool,
    pub timeout: Option<Duration>,
}

/// compose down のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownOptions {
    pub services: Vec<String>,
    pub remove_volumes: bool,
    pub remove_orphans: bool,
    pub timeout: Option<Duration>,
}

/// compose stop のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopOptions {
    pub services: Vec<String>,
    pub timeout: Option<Duration>,
}

/// 特性タグを各操作のオプションに変換する
#[derive(Debug, Clone)]
pub struct CharacteristicsResolver {
    table: CharacteristicsTable,
}

impl CharacteristicsResolver {
    pub fn new(table: CharacteristicsTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CharacteristicsTable {
        &self.table
    }

    pub fn resolve_up_options<S: AsRef<str>>(
        &self,
        characteristics: &[S],
        services: &[ServiceConfig],
        base: UpOptions,
    ) -> UpOptions {
        let mut options = base;
        options.services = service_names(services);

        for flag in self.table.up_flags(characteristics) {
            match flag.as_str() {
                FLAG_REMOVE_ORPHANS => options.remove_orphans = true,
                FLAG_BUILD => options.build = true,
                FLAG_FORCE_RECREATE => options.force_recreate = true,
                other => apply_timeout(other, &mut options.timeout),
            }
        }
        options
    }

    pub fn resolve_down_options<S: AsRef<str>>(
        &self,
        characteristics: &[S],
        services: &[ServiceConfig],
        base: DownOptions,
    ) -> DownOptions {
        let mut options = base;
        options.services = service_names(services);

        for flag in self.table.down_flags(characteristics) {
            match flag.as_str() {
                FLAG_REMOVE_ORPHANS => options.remove_orphans = true,
                FLAG_VOLUMES | FLAG_VOLUMES_SHORT => options.remove_volumes = true,
                other => apply_timeout(other, &mut options.timeout),
            }
        }
        options
    }

    /// stop は down のフラグからタイムアウトのみを使う
    pub fn resolve_stop_options<S: AsRef<str>>(
        &self,
        characteristics: &[S],
        services: &[ServiceConfig],
        base: StopOptions,
    ) -> StopOptions {
        let mut options = base;
        options.services = service_names(services);

        for flag in self.table.down_flags(characteristics) {
            apply_timeout(&flag, &mut options.timeout);
        }
        options
    }
}

/// `--timeout=N` を秒数として反映。それ以外は無視する
fn apply_timeout(flag: &str, timeout: &mut Option<Duration>) {
    let Some(value) = flag.strip_prefix(FLAG_TIMEOUT_PREFIX) else {
        return;
    };
    match value.parse::<u64>() {
        Ok(secs) => *timeout = Some(Duration::from_secs(secs)),
        Err(_) => warn!(flag = %flag, "Ignoring malformed timeout flag"),
    }
}

/// 解決済みサービスの特性タグを集める
///
/// 宣言されたタグに加えて `kind:<種別>` を付与する。重複は最初の出現のみ残す。
pub fn characteristics_for(services: &[ServiceConfig]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for service in services {
        let declared = service.definition.characteristics.iter().cloned();
        let derived = std::iter::once(format!("kind:{}", service.kind().as_str()));
        for tag in declared.chain(derived) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}
