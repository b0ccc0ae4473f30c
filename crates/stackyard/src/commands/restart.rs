use crate::context::{ProjectContext, compose_services};
use colored::Colorize;
use stackyard_container::{ComposeEngine, DockerComposeCli};
use stackyard_core::{StopOptions, UpOptions, characteristics_for};

/// 停止してから特性どおりのオプションで起動し直す
pub async fn handle(ctx: &ProjectContext, services: Vec<String>) -> anyhow::Result<()> {
    println!("プロジェクト: {}", ctx.project.cyan());

    let requested = ctx.requested_services(services)?;
    let resolved = ctx.resolve(&requested)?;
    super::print_resolved(&resolved);

    let (document, file) = ctx.write_compose(&resolved)?;
    let characteristics = ctx.characteristics()?;
    let tags = characteristics_for(&resolved);

    let mut stop_options =
        characteristics.resolve_stop_options(&tags, &resolved, StopOptions::default());
    stop_options.services = compose_services(&document, &stop_options.services);

    let base = UpOptions {
        detach: true,
        ..Default::default()
    };
    let mut up_options = characteristics.resolve_up_options(&tags, &resolved, base);
    up_options.services = compose_services(&document, &up_options.services);

    let engine = DockerComposeCli::new();
    let project = engine.load(&ctx.project, &file).await?;

    println!();
    println!("{}", "サービスを停止中...".yellow());
    engine.stop(&project, &stop_options).await?;

    println!("{}", "サービスを起動中...".blue());
    engine.up(&project, &up_options).await?;

    println!();
    println!("{}", "✓ 再起動しました".green().bold());
    Ok(())
}
