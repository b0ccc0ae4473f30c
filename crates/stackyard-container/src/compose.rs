//! composeドキュメントの生成
//!
//! 解決済みのサービス列から docker compose 形式のドキュメントを作ります。
//! 種別ごとの扱い:
//! - `container`: サービスブロックを出力
//! - `composite`: 構成サービスを展開して出力
//! - `configuration`: 何も出力せず、対象サービスの環境変数に追加

use crate::discovery::discover_init_services;
use crate::error::{ContainerError, Result as ContainerResult};
use crate::labels::resource_labels;
use serde::{Deserialize, Serialize};
use stackyard_core::{
    Catalog, NamingStrategy, Result, ServiceConfig, ServiceDefinition, ServiceKind, StackError,
    expand_env, format_duration,
};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_NETWORK: &str = "default";

/// composeドキュメント
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeDocument {
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, ComposeNetwork>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, ComposeVolume>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    pub container_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<ComposeHealthcheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeHealthcheck {
    pub test: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeNetwork {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeVolume {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ComposeDocument {
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StackError::Generation(format!("YAMLへの変換に失敗: {e}")))
    }

    /// 書き出し済みのファイルを読み込む
    pub fn read(path: &Path) -> ContainerResult<Self> {
        let read_failed = |message: String| ContainerError::ReadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| read_failed(e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| read_failed(e.to_string()))
    }

    /// ファイルに書き出す（既存ファイルは上書き）
    pub fn write(&self, path: &Path) -> ContainerResult<()> {
        let yaml = self.to_yaml()?;
        let write_failed = |e: std::io::Error| ContainerError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        std::fs::write(path, yaml).map_err(write_failed)?;
        info!(path = %path.display(), "Wrote compose document");
        Ok(())
    }
}

/// composeドキュメント生成器
pub struct ComposeGenerator<'a> {
    naming: NamingStrategy,
    catalog: &'a Catalog,
    service_configs_dir: Option<PathBuf>,
}

/// 生成中の状態
#[derive(Default)]
struct Emission {
    document: ComposeDocument,
    /// 出力済みサービスと定義（出力順）
    emitted: Vec<Arc<ServiceDefinition>>,
    /// 後で適用する configuration
    configurations: Vec<Arc<ServiceDefinition>>,
    expanded: HashSet<String>,
}

impl<'a> ComposeGenerator<'a> {
    pub fn new(naming: NamingStrategy, catalog: &'a Catalog) -> Self {
        Self {
            naming,
            catalog,
            service_configs_dir: None,
        }
    }

    /// 初期化コンテナを発見するディレクトリを指定
    pub fn with_service_configs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.service_configs_dir = Some(dir.into());
        self
    }

    pub fn naming(&self) -> &NamingStrategy {
        &self.naming
    }

    #[tracing::instrument(skip_all, fields(project = %self.naming.project(), services = resolved.len()))]
    pub fn generate(&self, resolved: &[ServiceConfig]) -> Result<ComposeDocument> {
        if self.naming.project().is_empty() {
            return Err(StackError::Validation(
                "プロジェクト名が指定されていません".to_string(),
            ));
        }

        let mut emission = Emission::default();

        for service in resolved {
            self.emit_definition(&service.definition, resolved, &mut emission)?;
        }

        if let Some(dir) = &self.service_configs_dir {
            let names: Vec<&str> = resolved.iter().map(|s| s.name()).collect();
            for init_name in discover_init_services(&names, dir) {
                match self.catalog.definition(&init_name) {
                    Some(definition) => self.emit_container(definition, &mut emission)?,
                    None => debug!(service = %init_name, "Init service not in catalog, skipping"),
                }
            }
        }

        self.apply_configurations(&mut emission)?;
        link_dependencies(&mut emission);

        emission.document.networks.insert(
            DEFAULT_NETWORK.to_string(),
            ComposeNetwork {
                name: self.naming.project_network_name(),
                labels: resource_labels(self.naming.project(), "network", "isolated"),
            },
        );

        info!(
            services = emission.document.services.len(),
            volumes = emission.document.volumes.len(),
            "Generated compose document"
        );
        Ok(emission.document)
    }

    fn emit_definition(
        &self,
        definition: &Arc<ServiceDefinition>,
        resolved: &[ServiceConfig],
        emission: &mut Emission,
    ) -> Result<()> {
        match definition.kind {
            ServiceKind::Container => self.emit_container(definition, emission),
            ServiceKind::Configuration => {
                if !emission.expanded.contains(&definition.name) {
                    emission.expanded.insert(definition.name.clone());
                    emission.configurations.push(Arc::clone(definition));
                }
                Ok(())
            }
            ServiceKind::Composite => {
                if !emission.expanded.insert(definition.name.clone()) {
                    return Ok(());
                }
                for component in &definition.components {
                    let component_def = resolved
                        .iter()
                        .find(|s| s.name() == component)
                        .map(|s| &s.definition)
                        .or_else(|| self.catalog.definition(component))
                        .ok_or_else(|| {
                            StackError::Generation(format!(
                                "'{}' の構成サービス '{}' が見つかりません",
                                definition.name, component
                            ))
                        })?;
                    self.emit_definition(component_def, resolved, emission)?;
                }
                Ok(())
            }
        }
    }

    fn emit_container(
        &self,
        definition: &Arc<ServiceDefinition>,
        emission: &mut Emission,
    ) -> Result<()> {
        let name = definition.name.as_str();
        if emission.document.services.contains_key(name) {
            return Ok(());
        }

        let spec = &definition.container;
        if spec.image.is_empty() {
            return Err(StackError::Generation(format!(
                "サービス '{name}' にイメージが指定されていません"
            )));
        }

        let ports = spec
            .ports
            .iter()
            .map(|port| {
                let mapping = format!("{}:{}", expand_env(&port.external), expand_env(&port.internal));
                match port.non_tcp_protocol() {
                    Some(protocol) => format!("{mapping}/{protocol}"),
                    None => mapping,
                }
            })
            .collect();

        let environment = spec
            .environment
            .iter()
            .map(|(key, value)| (key.clone(), expand_env(value)))
            .collect();

        let mut volumes = Vec::with_capacity(spec.volumes.len());
        for volume in &spec.volumes {
            let suffix = if volume.read_only { ":ro" } else { "" };
            if volume.is_bind_mount() {
                volumes.push(format!("{}:{}{}", volume.name, volume.mount, suffix));
                continue;
            }
            let key = format!("{name}-{}", volume.name);
            emission.document.volumes.insert(
                key.clone(),
                ComposeVolume {
                    name: self.naming.volume_name(name, &volume.name),
                    labels: resource_labels(
                        self.naming.project(),
                        name,
                        self.naming.sharing_mode(name),
                    ),
                },
            );
            volumes.push(format!("{key}:{}{}", volume.mount, suffix));
        }

        let healthcheck = spec.health_check.as_ref().map(|hc| ComposeHealthcheck {
            test: hc.test.clone(),
            interval: hc.interval.map(format_duration),
            timeout: hc.timeout.map(format_duration),
            retries: hc.retries,
            start_period: hc.start_period.map(format_duration),
        });

        let service = ComposeService {
            image: spec.image.clone(),
            container_name: self.naming.container_name(name),
            entrypoint: spec.entrypoint.clone(),
            command: spec.command.clone(),
            ports,
            environment,
            volumes,
            restart: spec.restart.map(|r| r.as_compose_str().to_string()),
            mem_limit: spec.memory_limit.clone(),
            healthcheck,
            depends_on: Vec::new(),
            labels: resource_labels(self.naming.project(), name, self.naming.sharing_mode(name)),
            networks: vec![DEFAULT_NETWORK.to_string()],
        };

        debug!(service = %name, "Emitted service block");
        emission.document.services.insert(name.to_string(), service);
        emission.emitted.push(Arc::clone(definition));
        Ok(())
    }

    /// configuration の環境変数を対象サービスに追加（追加側が優先）
    fn apply_configurations(&self, emission: &mut Emission) -> Result<()> {
        for configuration in &emission.configurations {
            let target = configuration.target_service.as_deref().unwrap_or_default();
            let Some(service) = emission.document.services.get_mut(target) else {
                return Err(StackError::Generation(format!(
                    "'{}' の対象サービス '{}' がドキュメントに含まれていません",
                    configuration.name, target
                )));
            };
            for (key, value) in &configuration.environment_additions {
                service.environment.insert(key.clone(), expand_env(value));
            }
            debug!(
                configuration = %configuration.name,
                target = %target,
                "Applied environment additions"
            );
        }
        Ok(())
    }
}

/// 出力済みの必須依存だけを depends_on に入れる
fn link_dependencies(emission: &mut Emission) {
    for definition in &emission.emitted {
        let depends_on: Vec<String> = definition
            .dependencies
            .required
            .iter()
            .filter(|dep| emission.document.services.contains_key(dep.as_str()))
            .cloned()
            .collect();
        if let Some(service) = emission.document.services.get_mut(&definition.name) {
            service.depends_on = depends_on;
        }
    }
}
