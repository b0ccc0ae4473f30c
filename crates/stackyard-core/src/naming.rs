//! コンテナ・ボリューム・ネットワークの命名規則

use std::collections::HashMap;

/// 共有モードで使うツール共通のプレフィックス
pub const SHARED_PREFIX: &str = "stackyard";

/// 共有モードのネットワーク名
pub const SHARED_NETWORK: &str = "stackyard-shared";

/// サービス共有ポリシー
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharingPolicy {
    pub enabled: bool,
    /// サービスごとの上書き
    pub services: HashMap<String, bool>,
}

/// 命名戦略
///
/// 共有されるサービスはプロジェクトをまたいで同じ名前を使い、
/// それ以外はプロジェクト名で名前空間を分ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingStrategy {
    project: String,
    sharing: Option<SharingPolicy>,
}

impl NamingStrategy {
    pub fn new(project: impl Into<String>, sharing: Option<SharingPolicy>) -> Self {
        Self {
            project: project.into(),
            sharing,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn is_shared(&self, service: &str) -> bool {
        let Some(policy) = &self.sharing else {
            return false;
        };
        policy
            .services
            .get(service)
            .copied()
            .unwrap_or(policy.enabled)
    }

    /// 共有モードの表示名（ラベル用）
    pub fn sharing_mode(&self, service: &str) -> &'static str {
        if self.is_shared(service) {
            "shared"
        } else {
            "isolated"
        }
    }

    pub fn container_name(&self, service: &str) -> String {
        format!("{}-{}", self.prefix_for(service), service)
    }

    pub fn volume_name(&self, service: &str, suffix: &str) -> String {
        format!("{}-{}-{}", self.prefix_for(service), service, suffix)
    }

    pub fn network_name(&self, service: &str) -> String {
        if self.is_shared(service) {
            SHARED_NETWORK.to_string()
        } else {
            self.project_network_name()
        }
    }

    pub fn project_network_name(&self) -> String {
        format!("{}-network", self.project)
    }

    fn prefix_for(&self, service: &str) -> &str {
        if self.is_shared(service) {
            SHARED_PREFIX
        } else {
            &self.project
        }
    }
}
