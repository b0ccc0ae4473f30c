//! 初期化スクリプト用のテンプレートデータ集約
//!
//! あるサービスに依存している全サービスから、設定レコードの
//! 空でないリストを外部名で集めます。

use crate::model::{MergeableConfig, ServiceConfig};
use crate::template::Variables;
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

/// `target` のスクリプトに渡すコンテキストを作る
///
/// 同じキーに複数のサービスが寄与した場合は解決順に連結する。
/// 1つのサービス内で複数のレコードが同じキーを持つ場合は最初のレコードのみ使う。
pub fn collect_template_data(target: &ServiceConfig, resolved: &[ServiceConfig]) -> Variables {
    let mut data = Variables::new();

    for contributor in resolved
        .iter()
        .filter(|s| s.definition.requires(target.name()))
    {
        let mut seen = HashSet::new();
        for record in contributor.extensions.records() {
            contribute(&mut data, record, &mut seen);
        }
        trace!(
            service = %target.name(),
            contributor = %contributor.name(),
            "Collected template data"
        );
    }

    data
}

fn contribute(data: &mut Variables, record: &dyn MergeableConfig, seen: &mut HashSet<&'static str>) {
    for (field, entries) in record.populated_fields() {
        if !seen.insert(field) {
            continue;
        }
        let items = entries.iter().cloned().map(Value::Object);
        match data.get_mut(field) {
            Some(Value::Array(existing)) => existing.extend(items),
            _ => {
                data.insert(field.to_string(), Value::Array(items.collect()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConfigEntry, Dependencies, KafkaConfig, LocalstackConfig, ServiceDefinition,
        ServiceExtensions,
    };
    use serde_json::json;

    fn entry(name: &str) -> ConfigEntry {
        json!({ "name": name }).as_object().cloned().unwrap()
    }

    fn service(name: &str, requires: &[&str], extensions: ServiceExtensions) -> ServiceConfig {
        ServiceConfig::from(ServiceDefinition {
            name: name.to_string(),
            dependencies: Dependencies {
                required: requires.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            extensions,
            ..Default::default()
        })
    }

    fn localstack(queues: &[&str], buckets: &[&str]) -> ServiceExtensions {
        ServiceExtensions {
            localstack: Some(LocalstackConfig {
                queues: queues.iter().map(|q| entry(q)).collect(),
                buckets: buckets.iter().map(|b| entry(b)).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_dependent_lists_are_exposed() {
        let target = service("localstack", &[], ServiceExtensions::default());
        let resolved = vec![
            target.clone(),
            service("localstack-sqs", &["localstack"], localstack(&["orders"], &[])),
        ];

        let data = collect_template_data(&target, &resolved);

        assert_eq!(data["queues"], json!([{"name": "orders"}]));
        // 空のリストは含めない
        assert!(!data.contains_key("buckets"));
        assert!(!data.contains_key("topics"));
    }

    #[test]
    fn test_non_dependents_contribute_nothing() {
        let target = service("localstack", &[], ServiceExtensions::default());
        let resolved = vec![
            target.clone(),
            service("unrelated", &["postgres"], localstack(&["ignored"], &[])),
        ];

        assert!(collect_template_data(&target, &resolved).is_empty());
    }

    #[test]
    fn test_multiple_contributors_are_concatenated() {
        let target = service("localstack", &[], ServiceExtensions::default());
        let resolved = vec![
            target.clone(),
            service("localstack-sqs", &["localstack"], localstack(&["orders"], &[])),
            service("billing", &["localstack"], localstack(&["invoices"], &["reports"])),
            service(
                "events",
                &["localstack"],
                ServiceExtensions {
                    kafka: Some(KafkaConfig {
                        topics: vec![entry("audit")],
                    }),
                    ..Default::default()
                },
            ),
        ];

        let data = collect_template_data(&target, &resolved);

        assert_eq!(data["queues"], json!([{"name": "orders"}, {"name": "invoices"}]));
        assert_eq!(data["buckets"], json!([{"name": "reports"}]));
        assert_eq!(data["topics"], json!([{"name": "audit"}]));
    }

    #[test]
    fn test_uses_merged_extensions_not_catalog_defaults() {
        let target = service("localstack", &[], ServiceExtensions::default());
        let mut sqs = service("localstack-sqs", &["localstack"], localstack(&[], &[]));
        sqs.extensions
            .localstack
            .as_mut()
            .unwrap()
            .queues
            .push(entry("from-override"));

        let data = collect_template_data(&target, &[target.clone(), sqs]);

        assert_eq!(data["queues"], json!([{"name": "from-override"}]));
    }

    #[test]
    fn test_key_counted_once_per_contributor() {
        let target = service("kafka", &[], ServiceExtensions::default());
        let orders = vec![entry("orders")];
        let ui = service(
            "kafka-ui",
            &["kafka"],
            ServiceExtensions {
                localstack: Some(LocalstackConfig {
                    topics: orders.clone(),
                    ..Default::default()
                }),
                kafka: Some(KafkaConfig { topics: orders }),
                ..Default::default()
            },
        );

        let data = collect_template_data(&target, &[target.clone(), ui]);

        assert_eq!(data["topics"], json!([{"name": "orders"}]));
    }

    /// 同梱カタログの初期化スクリプトに上書きファイルの内容が届くまで
    fn rendered_init_script(request: &str, file: &str, content: &str, target: &str) -> String {
        use crate::{Catalog, DependencyResolver, TemplateProcessor, apply_overrides};

        let catalog = Catalog::embedded().unwrap();
        let mut resolved = DependencyResolver::new(&catalog)
            .resolve(&[request])
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file), content).unwrap();
        apply_overrides(&mut resolved, dir.path()).unwrap();

        let target = resolved.iter().find(|s| s.name() == target).unwrap();
        let data = collect_template_data(target, &resolved);
        let script = &target.enabled_init().unwrap().scripts[0].content;
        TemplateProcessor::with_variables(data)
            .render_str(script)
            .unwrap()
    }

    #[test]
    fn test_postgres_databases_reach_init_script() {
        let script = rendered_init_script(
            "postgres-databases",
            "postgres-databases.yml",
            "databases:\n  - name: app\n  - name: analytics\n",
            "postgres",
        );

        assert!(script.contains(r#"CREATE DATABASE \"app\""#), "{script}");
        assert!(script.contains(r#"CREATE DATABASE \"analytics\""#), "{script}");
    }

    #[test]
    fn test_kafka_topics_reach_init_script() {
        let script = rendered_init_script(
            "kafka-topics",
            "kafka-topics.yml",
            "topics:\n  - name: orders\n    partitions: 3\n  - name: events\n",
            "kafka",
        );

        assert!(script.contains("--topic orders --partitions 3"), "{script}");
        assert!(script.contains("--topic events --partitions 1"), "{script}");
    }

    #[test]
    fn test_dependent_service_file_reaches_init_script() {
        // kafka-ui は topics を持つ記録を宣言していない
        let script = rendered_init_script(
            "kafka-ui",
            "kafka-ui.yml",
            "topics:\n  - name: audit\n",
            "kafka",
        );

        assert_eq!(script.matches("--topic audit").count(), 1, "{script}");
    }
}
