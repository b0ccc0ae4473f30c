//! 初期化スクリプトのオーケストレーション
//!
//! 解決順にサービスを辿り、有効な初期化設定を持つサービスの
//! スクリプトを宣言順に展開・実行します。1つでも失敗すれば中断します。

use crate::error::Result;
use crate::runner::{ScriptRequest, ScriptRunner};
use stackyard_core::{
    InitMode, NamingStrategy, ServiceConfig, StackError, TemplateProcessor, collect_template_data,
    expand_env,
};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// 初期化オーケストレーター
pub struct InitOrchestrator<L, C> {
    local: L,
    container: C,
}

impl<L, C> InitOrchestrator<L, C>
where
    L: ScriptRunner,
    C: ScriptRunner,
{
    pub fn new(local: L, container: C) -> Self {
        Self { local, container }
    }

    /// 解決済みサービスの初期化スクリプトを順に実行
    ///
    /// 戻り値は実行したスクリプト数。
    #[instrument(skip_all, fields(project = %project, services = resolved.len()))]
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        resolved: &[ServiceConfig],
        project: &str,
    ) -> Result<usize> {
        let network = NamingStrategy::new(project, None).project_network_name();
        let mut executed = 0;

        for service in resolved {
            let Some(init) = service.enabled_init() else {
                continue;
            };

            let data = collect_template_data(service, resolved);
            let environment: BTreeMap<String, String> = init
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), expand_env(v)))
                .collect();

            for script in &init.scripts {
                if cancel.is_cancelled() {
                    return Err(StackError::Cancelled.into());
                }

                let mut processor = TemplateProcessor::with_variables(data.clone());
                let rendered =
                    processor
                        .render_str(&script.content)
                        .map_err(|e| StackError::InitScript {
                            service: service.name().to_string(),
                            message: format!("{}: {}", script.name, e),
                        })?;

                let request = ScriptRequest {
                    service: service.name().to_string(),
                    script_name: script.name.clone(),
                    script: rendered,
                    image: init.image.clone(),
                    environment: environment.clone(),
                    project: project.to_string(),
                    network: network.clone(),
                };

                info!(
                    service = %service.name(),
                    script = %script.name,
                    mode = ?init.mode,
                    "Running init script"
                );
                match init.mode {
                    InitMode::Local => self.local.run(cancel, &request).await?,
                    InitMode::Container => self.container.run(cancel, &request).await?,
                }
                executed += 1;
            }
        }

        info!(executed, "Init scripts completed");
        Ok(executed)
    }
}
