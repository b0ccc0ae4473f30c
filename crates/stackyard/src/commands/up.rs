use crate::context::{ProjectContext, compose_services};
use colored::Colorize;
use stackyard_container::{ComposeEngine, DockerComposeCli};
use stackyard_core::{UpOptions, characteristics_for};

pub async fn handle(
    ctx: &ProjectContext,
    services: Vec<String>,
    build: bool,
    force_recreate: bool,
    no_init: bool,
) -> anyhow::Result<()> {
    println!("プロジェクト: {}", ctx.project.cyan());

    let requested = ctx.requested_services(services)?;
    let resolved = ctx.resolve(&requested)?;
    super::print_resolved(&resolved);

    let (document, file) = ctx.write_compose(&resolved)?;
    println!();
    println!("composeファイル: {}", file.display().to_string().cyan());

    let engine = DockerComposeCli::new();
    let project = engine.load(&ctx.project, &file).await?;

    let base = UpOptions {
        detach: true,
        build,
        force_recreate,
        ..Default::default()
    };
    let tags = characteristics_for(&resolved);
    let mut options = ctx
        .characteristics()?
        .resolve_up_options(&tags, &resolved, base);
    options.services = compose_services(&document, &options.services);

    println!();
    println!("{}", "サービスを起動中...".blue());
    engine.up(&project, &options).await?;

    if no_init {
        println!("  {}", "初期化スクリプトをスキップしました".dimmed());
    } else {
        super::init::run(ctx, &resolved).await?;
    }

    println!();
    println!("{}", "✓ 起動が完了しました".green().bold());
    Ok(())
}
