use crate::context::ProjectContext;
use stackyard_container::{ComposeEngine, DockerComposeCli, LogOptions};

pub async fn handle(
    ctx: &ProjectContext,
    service: Option<String>,
    lines: usize,
    follow: bool,
) -> anyhow::Result<()> {
    let file = ctx.paths.compose_file();
    if !file.exists() {
        anyhow::bail!(
            "composeファイルがありません: {}\n先に yard up を実行してください",
            file.display()
        );
    }

    let options = LogOptions {
        services: service.into_iter().collect(),
        follow,
        tail: Some(lines.to_string()),
        ..Default::default()
    };

    let engine = DockerComposeCli::new();
    let project = engine.load(&ctx.project, &file).await?;
    engine.logs(&project, &options).await?;
    Ok(())
}
