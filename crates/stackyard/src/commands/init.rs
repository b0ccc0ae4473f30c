use crate::context::ProjectContext;
use colored::Colorize;
use stackyard_container::{DockerInitRunner, InitOrchestrator, LocalShellRunner, init_docker};
use stackyard_core::ServiceConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn handle(ctx: &ProjectContext, services: Vec<String>) -> anyhow::Result<()> {
    let requested = ctx.requested_services(services)?;
    let resolved = ctx.resolve(&requested)?;
    run(ctx, &resolved).await
}

/// 初期化スクリプトを実行（Ctrl-C で中断）
pub(crate) async fn run(ctx: &ProjectContext, resolved: &[ServiceConfig]) -> anyhow::Result<()> {
    if !resolved.iter().any(|s| s.enabled_init().is_some()) {
        debug!("No init scripts to run");
        return Ok(());
    }

    println!();
    println!("{}", "初期化スクリプトを実行中...".blue());

    let docker = init_docker().await?;
    let orchestrator = InitOrchestrator::new(LocalShellRunner::new(), DockerInitRunner::new(docker));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = orchestrator.run(&cancel, resolved, &ctx.project).await;
    signal.abort();

    match result {
        Ok(executed) => {
            println!(
                "  {} {} 個のスクリプトを実行しました",
                "✓".green(),
                executed
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("  {}", "初期化を中断しました".yellow());
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
