//! 初期化サービス定義

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 初期化スクリプトの実行モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitMode {
    /// ホストのシェルで実行
    #[default]
    Local,
    /// 使い捨てコンテナ内で実行
    Container,
}

/// 初期化スクリプト
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitScript {
    #[serde(default)]
    pub name: String,
    pub content: String,
}

/// 初期化サービス設定
///
/// YAML形式：
/// ```yaml
/// init_service:
///   enabled: true
///   mode: container
///   image: amazon/aws-cli:2.15.0
///   environment:
///     AWS_REGION: us-east-1
///   scripts:
///     - name: create-queues
///       content: |
///         {% for q in queues %}aws sqs create-queue --queue-name {{ q.name }}
///         {% endfor %}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitServiceSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: InitMode,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: Vec<InitScript>,
}
