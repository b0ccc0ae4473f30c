//! リソースラベル
//!
//! 生成したネットワーク・ボリューム・コンテナには同じラベルを付け、
//! プロジェクト単位での一覧・削除に使う。

use std::collections::BTreeMap;

pub const LABEL_MANAGED: &str = "io.stackyard.managed";
pub const LABEL_PROJECT: &str = "io.stackyard.project";
pub const LABEL_SERVICE: &str = "io.stackyard.service";
pub const LABEL_SHARING_MODE: &str = "io.stackyard.sharing-mode";
pub const LABEL_VERSION: &str = "io.stackyard.version";

/// 標準ラベルを作成
pub fn resource_labels(project: &str, service: &str, sharing_mode: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_MANAGED.to_string(), "true".to_string()),
        (LABEL_PROJECT.to_string(), project.to_string()),
        (LABEL_SERVICE.to_string(), service.to_string()),
        (LABEL_SHARING_MODE.to_string(), sharing_mode.to_string()),
        (LABEL_VERSION.to_string(), env!("CARGO_PKG_VERSION").to_string()),
    ])
}

/// Docker API のラベルフィルタ
pub fn project_filter(project: &str) -> String {
    format!("{LABEL_PROJECT}={project}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_labels() {
        let labels = resource_labels("myapp", "postgres", "isolated");

        assert_eq!(labels.len(), 5);
        assert_eq!(labels[LABEL_MANAGED], "true");
        assert_eq!(labels[LABEL_PROJECT], "myapp");
        assert_eq!(labels[LABEL_SERVICE], "postgres");
        assert_eq!(labels[LABEL_SHARING_MODE], "isolated");
        assert_eq!(labels[LABEL_VERSION], env!("CARGO_PKG_VERSION"));
        assert_eq!(project_filter("myapp"), "io.stackyard.project=myapp");
    }
}
