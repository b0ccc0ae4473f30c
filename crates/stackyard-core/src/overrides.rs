//! プロジェクトごとのサービス設定上書き
//!
//! `{dir}/{service}.yml` をフラットなマップとして読み込み、
//! 設定レコードのリストを置き換えます。カタログで宣言されて
//! いないレコードは必要に応じて作成されます。

use crate::error::{Result, StackError};
use crate::model::ServiceConfig;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 解決済みサービスに上書きファイルを適用
pub fn apply_overrides(services: &mut [ServiceConfig], dir: &Path) -> Result<()> {
    for service in services.iter_mut() {
        let Some(path) = override_file(dir, service.name()) else {
            debug!(service = %service.name(), "No override file");
            continue;
        };

        let document = read_document(&path)?;
        let merged = service.extensions.merge_document(&document);
        info!(
            service = %service.name(),
            file = %path.display(),
            fields = merged,
            "Applied service overrides"
        );
    }
    Ok(())
}

fn override_file(dir: &Path, service: &str) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| dir.join(format!("{service}.{ext}")))
        .find(|path| path.is_file())
}

fn read_document(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let invalid = |message: String| {
        StackError::Validation(format!("{} を読み込めません: {}", path.display(), message))
    };

    let yaml: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
    if yaml.is_null() {
        return Ok(Map::new());
    }
    match serde_json::to_value(yaml).map_err(|e| invalid(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(invalid("トップレベルはマップである必要があります".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocalstackConfig, ServiceDefinition, ServiceExtensions};

    fn localstack_sqs() -> ServiceConfig {
        ServiceConfig::from(ServiceDefinition {
            name: "localstack-sqs".to_string(),
            extensions: ServiceExtensions {
                localstack: Some(LocalstackConfig::default()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_override_replaces_declared_lists() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("localstack-sqs.yml"),
            "queues:\n  - name: orders\n  - name: payments\n    fifo: true\n  - just-a-string\n",
        )
        .unwrap();

        let mut services = vec![localstack_sqs()];
        apply_overrides(&mut services, temp_dir.path()).unwrap();

        let localstack = services[0].extensions.localstack.as_ref().unwrap();
        assert_eq!(localstack.queues.len(), 2);
        assert_eq!(localstack.queues[1]["fifo"], true);
        // カタログ上の定義はそのまま
        assert!(
            services[0]
                .definition
                .extensions
                .localstack
                .as_ref()
                .unwrap()
                .queues
                .is_empty()
        );
    }

    #[test]
    fn test_yaml_extension_and_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut services = vec![localstack_sqs()];

        apply_overrides(&mut services, temp_dir.path()).unwrap();
        assert!(services[0].extensions.localstack.as_ref().unwrap().queues.is_empty());

        std::fs::write(
            temp_dir.path().join("localstack-sqs.yaml"),
            "buckets:\n  - name: assets\n",
        )
        .unwrap();
        apply_overrides(&mut services, temp_dir.path()).unwrap();
        assert_eq!(services[0].extensions.localstack.as_ref().unwrap().buckets.len(), 1);
    }

    #[test]
    fn test_service_without_records_gets_record_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("app-db.yml"),
            "databases:\n  - name: app\n  - name: analytics\n",
        )
        .unwrap();

        let mut services = vec![ServiceConfig::from(ServiceDefinition {
            name: "app-db".to_string(),
            ..Default::default()
        })];
        apply_overrides(&mut services, temp_dir.path()).unwrap();

        let postgres = services[0].extensions.postgres.as_ref().unwrap();
        assert_eq!(postgres.databases.len(), 2);
        assert_eq!(postgres.databases[0]["name"], "app");
        assert!(services[0].extensions.localstack.is_none());
        assert!(services[0].extensions.kafka.is_none());
    }

    #[test]
    fn test_unrelated_keys_create_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("redis.yml"), "maxmemory: 256mb
").unwrap();

        let mut services = vec![ServiceConfig::from(ServiceDefinition {
            name: "redis".to_string(),
            ..Default::default()
        })];
        apply_overrides(&mut services, temp_dir.path()).unwrap();

        assert!(services[0].extensions.is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_validation_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("localstack-sqs.yml"), "queues: [unclosed").unwrap();

        let mut services = vec![localstack_sqs()];
        let err = apply_overrides(&mut services, temp_dir.path()).unwrap_err();
        assert!(matches!(err, StackError::Validation(_)));

        std::fs::write(temp_dir.path().join("localstack-sqs.yml"), "- a\n- b\n").unwrap();
        let err = apply_overrides(&mut services, temp_dir.path()).unwrap_err();
        assert!(matches!(err, StackError::Validation(_)));
    }
}
