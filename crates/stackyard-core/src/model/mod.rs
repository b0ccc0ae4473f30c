//! モデル定義
//!
//! stackyardで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod container;
mod extension;
mod init;
mod service;

// Re-exports
pub use container::*;
pub use extension::*;
pub use init::*;
pub use service::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_definition_from_yaml() {
        let yaml = r#"
name: localstack-sqs
category: cloud
type: configuration
description: SQS on LocalStack
target_service: localstack
environment_additions:
  SQS_ENDPOINT_STRATEGY: path
dependencies:
  required: [localstack]
localstack:
  queues: []
"#;
        let def: ServiceDefinition = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(def.kind, ServiceKind::Configuration);
        assert_eq!(def.target_service.as_deref(), Some("localstack"));
        assert!(def.requires("localstack"));
        assert!(def.extensions.localstack.is_some());
        assert!(!def.is_hidden());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let yaml = "name: x\ntype: daemon\ndescription: x";
        let result: Result<ServiceDefinition, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_composite_edges_include_components() {
        let def = ServiceDefinition {
            name: "observability".to_string(),
            kind: ServiceKind::Composite,
            components: vec!["jaeger".to_string(), "prometheus".to_string()],
            dependencies: Dependencies {
                required: vec!["network-tools".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };

        let edges: Vec<_> = def.dependency_edges().cloned().collect();
        assert_eq!(edges, vec!["network-tools", "jaeger", "prometheus"]);
    }

    #[test]
    fn test_service_config_owns_extensions() {
        let def = ServiceDefinition {
            name: "kafka".to_string(),
            extensions: ServiceExtensions {
                kafka: Some(KafkaConfig::default()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut config = ServiceConfig::from(def);
        config
            .extensions
            .kafka
            .as_mut()
            .unwrap()
            .topics
            .push(serde_json::Map::new());

        // カタログ側の定義は変更されない
        assert!(
            config
                .definition
                .extensions
                .kafka
                .as_ref()
                .unwrap()
                .topics
                .is_empty()
        );
        assert_eq!(config.name(), "kafka");
    }
}
