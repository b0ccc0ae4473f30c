//! プロジェクトの読み込みと各コマンド共通の処理

use anyhow::Context;
use stackyard_config::{ProjectConfig, ProjectPaths};
use stackyard_container::{ComposeDocument, ComposeGenerator};
use stackyard_core::{
    Catalog, CharacteristicsResolver, CharacteristicsTable, DependencyResolver, NamingStrategy,
    ServiceConfig, apply_overrides,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 読み込み済みのプロジェクト
pub struct ProjectContext {
    pub paths: ProjectPaths,
    pub config: ProjectConfig,
    pub project: String,
    pub catalog: Catalog,
}

impl ProjectContext {
    pub fn load(root: Option<PathBuf>, project: Option<&str>) -> anyhow::Result<Self> {
        let root = match root {
            Some(root) => root,
            None => stackyard_config::find_project_root()?,
        };
        let config = stackyard_config::load_project_config(&root)
            .with_context(|| format!("プロジェクト設定を読み込めません: {}", root.display()))?;
        let project = config.project_name(project, &root)?;
        let catalog = load_catalog(Some(root.as_path()))?;
        debug!(project = %project, root = %root.display(), "Loaded project");

        Ok(Self {
            paths: ProjectPaths::new(root),
            config,
            project,
            catalog,
        })
    }

    /// 指定が無ければ stack.enabled を使う
    pub fn requested_services(&self, services: Vec<String>) -> anyhow::Result<Vec<String>> {
        if !services.is_empty() {
            return Ok(services);
        }
        if self.config.stack.enabled.is_empty() {
            anyhow::bail!(
                "起動するサービスがありません。サービス名を指定するか、.stackyard/config.yaml の stack.enabled に追加してください"
            );
        }
        Ok(self.config.stack.enabled.clone())
    }

    /// 検証・依存解決・上書き適用まで行う
    pub fn resolve(&self, services: &[String]) -> anyhow::Result<Vec<ServiceConfig>> {
        self.catalog.validate_services(services)?;
        let mut resolved = DependencyResolver::new(&self.catalog).resolve(services)?;
        apply_overrides(&mut resolved, &self.paths.service_configs_dir())?;
        Ok(resolved)
    }

    pub fn naming(&self) -> NamingStrategy {
        NamingStrategy::new(&self.project, self.config.sharing_policy())
    }

    pub fn generate(&self, resolved: &[ServiceConfig]) -> anyhow::Result<ComposeDocument> {
        let document = ComposeGenerator::new(self.naming(), &self.catalog)
            .with_service_configs_dir(self.paths.service_configs_dir())
            .generate(resolved)?;
        Ok(document)
    }

    /// 生成してファイルに書き出す
    pub fn write_compose(
        &self,
        resolved: &[ServiceConfig],
    ) -> anyhow::Result<(ComposeDocument, PathBuf)> {
        let document = self.generate(resolved)?;
        let file = self.paths.compose_file();
        document.write(&file)?;
        Ok((document, file))
    }

    /// 書き出し済みの compose ファイルにあるサービス
    ///
    /// 直前の up で実際に起動したものを表す。カタログに無い名前は飛ばす。
    pub fn started_services(&self) -> anyhow::Result<Vec<ServiceConfig>> {
        let document = ComposeDocument::read(&self.paths.compose_file())?;
        Ok(document
            .services
            .keys()
            .filter_map(|name| match self.catalog.get_service(name) {
                Ok(service) => Some(service),
                Err(_) => {
                    debug!(service = %name, "Compose service missing from catalog");
                    None
                }
            })
            .collect())
    }

    pub fn characteristics(&self) -> anyhow::Result<CharacteristicsResolver> {
        let table = CharacteristicsTable::load_with_priority(
            &self.paths.characteristics_candidates(),
        )?;
        Ok(CharacteristicsResolver::new(table))
    }
}

/// プロジェクトに `.stackyard/catalog` があればそれを、無ければ同梱カタログを使う
pub fn load_catalog(root: Option<&Path>) -> anyhow::Result<Catalog> {
    if let Some(root) = root {
        let dir = ProjectPaths::new(root).catalog_dir();
        if dir.is_dir() {
            return Catalog::from_dir(&dir)
                .with_context(|| format!("カタログを読み込めません: {}", dir.display()));
        }
    }
    Ok(Catalog::embedded()?)
}

/// プロジェクト外でも動くコマンド用のカタログ
pub fn discover_catalog(root: Option<PathBuf>) -> anyhow::Result<Catalog> {
    let root = root.or_else(|| stackyard_config::find_project_root().ok());
    load_catalog(root.as_deref())
}

/// compose に渡すサービス名
///
/// ドキュメントに存在しないもの（composite や configuration）を除き、
/// 自動発見された初期化コンテナを末尾に加える。
pub fn compose_services(document: &ComposeDocument, requested: &[String]) -> Vec<String> {
    let mut services: Vec<String> = requested
        .iter()
        .filter(|name| document.services.contains_key(name.as_str()))
        .cloned()
        .collect();
    for name in document.services.keys() {
        if !services.contains(name) {
            services.push(name.clone());
        }
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackyard_container::ComposeService;
    use stackyard_config::{ProjectSection, StackSection};

    fn context(enabled: &[&str]) -> ProjectContext {
        context_at(Path::new("/nonexistent/stackyard-test"), enabled)
    }

    fn context_at(root: &Path, enabled: &[&str]) -> ProjectContext {
        ProjectContext {
            paths: ProjectPaths::new(root),
            config: ProjectConfig {
                project: ProjectSection {
                    name: Some("myapp".to_string()),
                },
                stack: StackSection {
                    enabled: enabled.iter().map(|s| s.to_string()).collect(),
                },
                sharing: None,
            },
            project: "myapp".to_string(),
            catalog: Catalog::embedded().unwrap(),
        }
    }

    #[test]
    fn test_requested_services_fallback_to_enabled() {
        let ctx = context(&["postgres"]);
        assert_eq!(ctx.requested_services(vec![]).unwrap(), vec!["postgres"]);
        assert_eq!(
            ctx.requested_services(vec!["redis".to_string()]).unwrap(),
            vec!["redis"]
        );
        assert!(context(&[]).requested_services(vec![]).is_err());
    }

    #[test]
    fn test_resolve_rejects_hidden_service() {
        let ctx = context(&[]);
        let err = ctx.resolve(&["localstack-init".to_string()]).unwrap_err();
        assert!(err.to_string().contains("localstack-init"));
    }

    #[test]
    fn test_compose_services_filters_and_appends() {
        let mut document = ComposeDocument::default();
        for name in ["jaeger", "localstack", "localstack-init"] {
            document
                .services
                .insert(name.to_string(), ComposeService::default());
        }
        let requested = vec![
            "localstack".to_string(),
            "localstack-sqs".to_string(),
            "jaeger".to_string(),
        ];

        assert_eq!(
            compose_services(&document, &requested),
            vec!["localstack", "jaeger", "localstack-init"]
        );
    }

    #[test]
    fn test_load_catalog_defaults_to_embedded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = load_catalog(Some(temp_dir.path())).unwrap();
        assert!(catalog.contains("postgres"));
    }

    #[test]
    fn test_started_services_come_from_written_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = context_at(temp_dir.path(), &["postgres"]);

        let resolved = ctx.resolve(&["redis".to_string()]).unwrap();
        ctx.write_compose(&resolved).unwrap();

        let started = ctx.started_services().unwrap();
        let names: Vec<_> = started.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["redis"]);
    }
}
