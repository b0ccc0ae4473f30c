use crate::context::ProjectContext;
use colored::Colorize;
use stackyard_container::{ComposeEngine, DockerComposeCli, init_docker, remove_project_resources};
use stackyard_core::{DownOptions, characteristics_for};

pub async fn handle(ctx: &ProjectContext, volumes: bool, purge: bool) -> anyhow::Result<()> {
    println!("プロジェクト: {}", ctx.project.cyan());

    let file = ctx.paths.compose_file();
    if file.exists() {
        // 特性は実際に起動した compose ファイルのサービスから求める
        let resolved = ctx.started_services()?;
        let base = DownOptions {
            remove_volumes: volumes,
            ..Default::default()
        };
        let tags = characteristics_for(&resolved);
        let options = ctx
            .characteristics()?
            .resolve_down_options(&tags, &resolved, base);

        let engine = DockerComposeCli::new();
        let project = engine.load(&ctx.project, &file).await?;
        println!("{}", "サービスを停止中...".yellow());
        engine.down(&project, &options).await?;
    } else {
        println!(
            "  {}",
            "composeファイルがありません。停止するサービスはありません".dimmed()
        );
    }

    if purge {
        println!();
        println!("{}", "プロジェクトのリソースを削除中...".yellow());
        let docker = init_docker().await?;
        let report = remove_project_resources(&docker, &ctx.project, volumes).await?;
        for name in &report.containers {
            println!("  ✓ コンテナ: {}", name.cyan());
        }
        for name in &report.networks {
            println!("  ✓ ネットワーク: {}", name.cyan());
        }
        for name in &report.volumes {
            println!("  ✓ ボリューム: {}", name.cyan());
        }
    }

    println!();
    println!("{}", "✓ 停止しました".green().bold());
    Ok(())
}
