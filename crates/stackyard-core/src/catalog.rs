//! サービスカタログ
//!
//! カテゴリごとに配置されたサービス定義YAMLを読み込み、名前で索引します。
//! 1つでも不正な定義があればカタログ全体の読み込みを中断します。

use crate::error::{Result, StackError};
use crate::model::{ServiceConfig, ServiceDefinition, ServiceKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 同梱のサービス定義 (カテゴリ, ファイル名, 内容)
const EMBEDDED_DOCUMENTS: &[(&str, &str, &str)] = &[
    (
        "cloud",
        "localstack.yaml",
        include_str!("../catalog/cloud/localstack.yaml"),
    ),
    (
        "cloud",
        "localstack-init.yaml",
        include_str!("../catalog/cloud/localstack-init.yaml"),
    ),
    (
        "cloud",
        "localstack-s3.yaml",
        include_str!("../catalog/cloud/localstack-s3.yaml"),
    ),
    (
        "cloud",
        "localstack-sns.yaml",
        include_str!("../catalog/cloud/localstack-sns.yaml"),
    ),
    (
        "cloud",
        "localstack-sqs.yaml",
        include_str!("../catalog/cloud/localstack-sqs.yaml"),
    ),
    (
        "database",
        "mysql.yaml",
        include_str!("../catalog/database/mysql.yaml"),
    ),
    (
        "database",
        "postgres-databases.yaml",
        include_str!("../catalog/database/postgres-databases.yaml"),
    ),
    (
        "database",
        "postgres.yaml",
        include_str!("../catalog/database/postgres.yaml"),
    ),
    (
        "database",
        "redis.yaml",
        include_str!("../catalog/database/redis.yaml"),
    ),
    (
        "messaging",
        "kafka.yaml",
        include_str!("../catalog/messaging/kafka.yaml"),
    ),
    (
        "messaging",
        "kafka-topics.yaml",
        include_str!("../catalog/messaging/kafka-topics.yaml"),
    ),
    (
        "messaging",
        "kafka-ui.yaml",
        include_str!("../catalog/messaging/kafka-ui.yaml"),
    ),
    (
        "observability",
        "grafana.yaml",
        include_str!("../catalog/observability/grafana.yaml"),
    ),
    (
        "observability",
        "jaeger.yaml",
        include_str!("../catalog/observability/jaeger.yaml"),
    ),
    (
        "observability",
        "observability.yaml",
        include_str!("../catalog/observability/observability.yaml"),
    ),
    (
        "observability",
        "prometheus.yaml",
        include_str!("../catalog/observability/prometheus.yaml"),
    ),
];

const MAX_PORT: i64 = 65535;

/// サービスカタログ
///
/// 読み込み後は不変。リゾルバやジェネレータには参照で渡す。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: BTreeMap<String, Arc<ServiceDefinition>>,
}

impl Catalog {
    /// 同梱のサービス定義を読み込む
    pub fn embedded() -> Result<Self> {
        Self::from_documents(EMBEDDED_DOCUMENTS.iter().copied())
    }

    /// ディレクトリ (`<root>/<category>/<name>.yaml`) から読み込む
    #[tracing::instrument(skip(root), fields(root = %root.display()))]
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut documents = Vec::new();

        for category_dir in sorted_entries(root)? {
            if !category_dir.is_dir() {
                continue;
            }
            let Some(category) = category_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let category = category.to_string();

            for file in sorted_entries(&category_dir)? {
                let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if file.is_dir() || yaml_stem(file_name).is_none() {
                    continue;
                }
                let content = std::fs::read_to_string(&file).map_err(|e| StackError::IoError {
                    path: file.clone(),
                    message: e.to_string(),
                })?;
                debug!(file = %file.display(), category = %category, "Found service definition");
                documents.push((category.clone(), file_name.to_string(), content));
            }
        }

        Self::from_documents(documents)
    }

    /// (カテゴリ, ファイル名, 内容) の組から読み込む
    pub fn from_documents<I, S>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        let mut services = BTreeMap::new();

        for (category, file_name, content) in documents {
            let definition =
                parse_document(category.as_ref(), file_name.as_ref(), content.as_ref())?;
            if services.contains_key(&definition.name) {
                return Err(StackError::InvalidServiceDefinition {
                    service: definition.name.clone(),
                    message: "同じ名前のサービスが複数定義されています".to_string(),
                });
            }
            services.insert(definition.name.clone(), Arc::new(definition));
        }

        info!(service_count = services.len(), "Loaded service catalog");
        Ok(Self { services })
    }

    /// サービスを取得
    pub fn get_service(&self, name: &str) -> Result<ServiceConfig> {
        self.services
            .get(name)
            .map(|def| ServiceConfig::new(Arc::clone(def)))
            .ok_or_else(|| StackError::UnknownService(name.to_string()))
    }

    /// 全サービスを取得（非公開サービスを含む）
    pub fn get_all_services(&self) -> BTreeMap<String, ServiceConfig> {
        self.services
            .iter()
            .map(|(name, def)| (name.clone(), ServiceConfig::new(Arc::clone(def))))
            .collect()
    }

    /// ユーザーが指定したサービス名を検証
    pub fn validate_services<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            match self.services.get(name) {
                None => return Err(StackError::UnknownService(name.to_string())),
                Some(def) if def.is_hidden() => {
                    return Err(StackError::HiddenService(name.to_string()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<ServiceDefinition>> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// 公開サービス名の一覧（名前順）
    pub fn names(&self) -> Vec<String> {
        self.services
            .values()
            .filter(|def| !def.is_hidden())
            .map(|def| def.name.clone())
            .collect()
    }

    /// カテゴリごとの公開サービス名
    pub fn by_category(&self) -> BTreeMap<String, Vec<String>> {
        let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for def in self.services.values().filter(|def| !def.is_hidden()) {
            categories
                .entry(def.category.clone())
                .or_default()
                .push(def.name.clone());
        }
        categories
    }

    pub fn categories(&self) -> Vec<String> {
        self.by_category().into_keys().collect()
    }

    /// 直接の必須依存
    pub fn get_dependencies(&self, name: &str) -> Result<Vec<String>> {
        self.services
            .get(name)
            .map(|def| def.dependencies.required.clone())
            .ok_or_else(|| StackError::UnknownService(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| StackError::IoError {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

fn yaml_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".yaml")
        .or_else(|| file_name.strip_suffix(".yml"))
}

fn parse_document(category: &str, file_name: &str, content: &str) -> Result<ServiceDefinition> {
    let source = PathBuf::from(category).join(file_name);
    let stem = yaml_stem(file_name).ok_or_else(|| StackError::YamlParse {
        path: source.clone(),
        message: "拡張子は .yaml または .yml である必要があります".to_string(),
    })?;

    let mut definition: ServiceDefinition =
        serde_yaml::from_str(content).map_err(|e| StackError::YamlParse {
            path: source.clone(),
            message: e.to_string(),
        })?;

    if definition.category.is_empty() {
        definition.category = category.to_string();
    }

    if definition.name != stem {
        return Err(StackError::InvalidServiceDefinition {
            service: stem.to_string(),
            message: format!(
                "宣言された名前 '{}' がファイル名と一致しません",
                definition.name
            ),
        });
    }

    validate_definition(&definition)?;
    Ok(definition)
}

fn validate_definition(def: &ServiceDefinition) -> Result<()> {
    let invalid = |message: &str| StackError::InvalidServiceDefinition {
        service: def.name.clone(),
        message: message.to_string(),
    };

    if def.description.trim().is_empty() {
        return Err(invalid("description は必須です"));
    }

    if let Some(port) = def.default_port
        && !(0..=MAX_PORT).contains(&port)
    {
        return Err(invalid(&format!("default_port が範囲外です: {port}")));
    }

    if let Some(probe) = &def.health_check
        && probe.enabled
        && probe.endpoint.as_deref().is_none_or(str::is_empty)
    {
        return Err(invalid(
            "health_check が有効な場合は endpoint を指定してください",
        ));
    }

    match def.kind {
        ServiceKind::Configuration if def.target_service.is_none() => {
            return Err(invalid("configuration には target_service が必要です"));
        }
        ServiceKind::Composite if def.components.is_empty() => {
            return Err(invalid("composite には components が必要です"));
        }
        _ => {}
    }

    Ok(())
}
