//! 依存関係の解決
//!
//! 要求されたサービス名から、依存先が先に来る重複のない列を作ります。

use crate::catalog::Catalog;
use crate::error::{Result, StackError};
use crate::model::ServiceConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// 探索中（パス上にある）
    Visiting,
    /// 出力済み
    Done,
}

#[derive(Default)]
struct Walk {
    marks: HashMap<String, Mark>,
    path: Vec<String>,
    order: Vec<ServiceConfig>,
}

/// 依存関係リゾルバ
pub struct DependencyResolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// 要求されたサービスと推移的な必須依存を解決
    ///
    /// 要求されたサービスが存在しない場合はエラー。推移的な依存が
    /// カタログに無い場合はスキップする。
    #[tracing::instrument(skip(self, names), fields(requested = names.len()))]
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ServiceConfig>> {
        if names.is_empty() {
            return Err(StackError::Validation(
                "サービスが指定されていません".to_string(),
            ));
        }

        let mut walk = Walk::default();
        for name in names {
            let name = name.as_ref();
            if !self.catalog.contains(name) {
                return Err(StackError::UnknownService(name.to_string()));
            }
            self.visit(name, &mut walk)?;
        }

        check_conflicts(&walk.order)?;
        debug!(resolved = walk.order.len(), "Resolved service dependencies");
        Ok(walk.order)
    }

    fn visit(&self, name: &str, walk: &mut Walk) -> Result<()> {
        match walk.marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = walk.path.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle = walk.path[start..].to_vec();
                cycle.push(name.to_string());
                return Err(StackError::CyclicDependency(cycle));
            }
            None => {}
        }

        let Some(definition) = self.catalog.definition(name) else {
            debug!(service = %name, "Skipping dependency missing from catalog");
            return Ok(());
        };

        walk.marks.insert(name.to_string(), Mark::Visiting);
        walk.path.push(name.to_string());

        for dependency in definition.dependency_edges() {
            self.visit(dependency, walk)?;
        }

        walk.path.pop();
        walk.marks.insert(name.to_string(), Mark::Done);
        walk.order.push(ServiceConfig::new(Arc::clone(definition)));
        Ok(())
    }
}

/// 解決結果に `conflicts` で排他とされた組が含まれていないか確認
fn check_conflicts(resolved: &[ServiceConfig]) -> Result<()> {
    for service in resolved {
        let conflicting = service
            .definition
            .dependencies
            .conflicts
            .iter()
            .find(|other| resolved.iter().any(|s| s.name() == other.as_str()));
        if let Some(other) = conflicting {
            return Err(StackError::Validation(format!(
                "サービス '{}' と '{}' は同時に使用できません",
                service.name(),
                other
            )));
        }
    }
    Ok(())
}
