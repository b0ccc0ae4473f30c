use crate::context::ProjectContext;
use colored::Colorize;
use stackyard_container::{ProjectContainer, init_docker, list_project_containers};

/// プロジェクトのラベルを持つコンテナを表示
pub async fn handle(ctx: &ProjectContext, services: Vec<String>) -> anyhow::Result<()> {
    println!("プロジェクト: {}", ctx.project.cyan());

    let docker = init_docker().await?;
    let containers = list_project_containers(&docker, &ctx.project).await?;
    let containers = select_containers(containers, &services);

    println!();
    if containers.is_empty() {
        println!("{}", "コンテナはありません".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<30} {:<20} {:<25} {:<30}", "NAME", "SERVICE", "STATUS", "IMAGE").bold()
    );
    println!("{}", "─".repeat(105).dimmed());

    for container in &containers {
        let status = if container.status.starts_with("Up") {
            container.status.green()
        } else {
            container.status.red()
        };
        println!(
            "{:<30} {:<20} {:<25} {:<30}",
            container.name.cyan(),
            container.service.as_deref().unwrap_or("-"),
            status,
            container.image.dimmed()
        );
    }
    Ok(())
}

/// サービス名の指定があれば、そのサービスラベルを持つものだけ残して名前順に並べる
fn select_containers(
    mut containers: Vec<ProjectContainer>,
    services: &[String],
) -> Vec<ProjectContainer> {
    if !services.is_empty() {
        containers.retain(|c| c.service.as_ref().is_some_and(|s| services.contains(s)));
    }
    containers.sort_by(|a, b| a.name.cmp(&b.name));
    containers
}
