use crate::context::{ProjectContext, compose_services};
use colored::Colorize;
use stackyard_container::{ComposeEngine, DockerComposeCli};
use stackyard_core::{StopOptions, characteristics_for};

pub async fn handle(ctx: &ProjectContext, services: Vec<String>) -> anyhow::Result<()> {
    let requested = ctx.requested_services(services)?;
    let resolved = ctx.resolve(&requested)?;

    let file = ctx.paths.compose_file();
    if !file.exists() {
        anyhow::bail!(
            "composeファイルがありません: {}\n先に yard up を実行してください",
            file.display()
        );
    }
    // 生成済みファイルのサービスだけを対象にする
    let document = ctx.generate(&resolved)?;

    let tags = characteristics_for(&resolved);
    let mut options =
        ctx.characteristics()?
            .resolve_stop_options(&tags, &resolved, StopOptions::default());
    options.services = compose_services(&document, &options.services);

    println!("{}", "サービスを停止中...".yellow());
    for name in &options.services {
        println!("  • {}", name.cyan());
    }

    let engine = DockerComposeCli::new();
    let project = engine.load(&ctx.project, &file).await?;
    engine.stop(&project, &options).await?;

    println!();
    println!("{}", "✓ 停止しました".green().bold());
    Ok(())
}
