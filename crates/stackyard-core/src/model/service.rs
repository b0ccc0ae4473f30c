//! サービス定義

use super::container::ContainerSpec;
use super::extension::ServiceExtensions;
use super::init::InitServiceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// サービスの種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// 単独で起動するコンテナ
    #[default]
    Container,
    /// 複数のサービスをまとめたもの
    Composite,
    /// 他サービスの環境変数を補うだけのもの
    Configuration,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Composite => "composite",
            Self::Configuration => "configuration",
        }
    }
}

/// カタログ上の可視性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Normal,
    /// 名前での読み込みは可能だが、ユーザーは直接指定できない
    Hidden,
}

/// 依存関係
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub soft: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
}

/// カタログ登録時のヘルスプローブ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProbe {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// ドキュメント用メタデータ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub use_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// サービス定義（カタログエントリ）
///
/// YAML形式：
/// ```yaml
/// name: postgres
/// category: database
/// type: container
/// description: PostgreSQL relational database
/// container:
///   image: postgres:16-alpine
///   ports:
///     - external: "${POSTGRES_PORT:-5432}"
///       internal: 5432
/// dependencies:
///   required: []
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub kind: ServiceKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthProbe>,
    /// ライフサイクルオプションに変換される特性タグ
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characteristics: Vec<String>,
    #[serde(default)]
    pub container: ContainerSpec,
    #[serde(default)]
    pub dependencies: Dependencies,
    /// composite の構成サービス
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// configuration の適用先サービス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_service: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_additions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_service: Option<InitServiceSpec>,
    #[serde(default)]
    pub documentation: Documentation,
    #[serde(flatten)]
    pub extensions: ServiceExtensions,
}

impl ServiceDefinition {
    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }

    /// 依存解決で辿る辺（required と composite の構成サービス）
    pub fn dependency_edges(&self) -> impl Iterator<Item = &String> {
        let components = if self.kind == ServiceKind::Composite {
            self.components.as_slice()
        } else {
            &[]
        };
        self.dependencies.required.iter().chain(components.iter())
    }

    pub fn requires(&self, name: &str) -> bool {
        self.dependencies.required.iter().any(|d| d == name)
    }
}

/// 実行時のサービス設定
///
/// カタログの定義を共有しつつ、ユーザー上書きをマージした
/// 設定レコードを個別に保持する。
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub definition: Arc<ServiceDefinition>,
    pub extensions: ServiceExtensions,
}

impl ServiceConfig {
    pub fn new(definition: Arc<ServiceDefinition>) -> Self {
        let extensions = definition.extensions.clone();
        Self {
            definition,
            extensions,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn kind(&self) -> ServiceKind {
        self.definition.kind
    }

    /// 有効な初期化設定
    pub fn enabled_init(&self) -> Option<&InitServiceSpec> {
        self.definition
            .init_service
            .as_ref()
            .filter(|init| init.enabled)
    }
}

impl From<ServiceDefinition> for ServiceConfig {
    fn from(definition: ServiceDefinition) -> Self {
        Self::new(Arc::new(definition))
    }
}

/// サービス名の一覧を取り出す
pub fn service_names(services: &[ServiceConfig]) -> Vec<String> {
    services.iter().map(|s| s.name().to_string()).collect()
}
