use crate::context::ProjectContext;
use colored::Colorize;

/// composeファイルを生成（`stdout` なら標準出力のみ）
pub fn handle(ctx: &ProjectContext, services: Vec<String>, stdout: bool) -> anyhow::Result<()> {
    let requested = ctx.requested_services(services)?;
    let resolved = ctx.resolve(&requested)?;

    if stdout {
        print!("{}", ctx.generate(&resolved)?.to_yaml()?);
        return Ok(());
    }

    let (document, file) = ctx.write_compose(&resolved)?;
    println!(
        "{} {} ({} サービス)",
        "✓ composeファイルを生成しました:".green(),
        file.display().to_string().cyan(),
        document.services.len()
    );
    Ok(())
}
