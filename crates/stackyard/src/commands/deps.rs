use colored::Colorize;
use stackyard_core::{Catalog, DependencyResolver};

/// 依存解決の結果を起動順に表示
pub fn handle(catalog: &Catalog, services: Vec<String>) -> anyhow::Result<()> {
    catalog.validate_services(&services)?;
    let resolved = DependencyResolver::new(catalog).resolve(&services)?;

    println!("{}", "起動順:".bold());
    for (index, service) in resolved.iter().enumerate() {
        let marker = if services.iter().any(|s| s == service.name()) {
            "".normal()
        } else {
            "(依存)".dimmed()
        };
        println!(
            "  {:>2}. {} [{}] {}",
            index + 1,
            service.name().cyan(),
            service.kind().as_str(),
            marker
        );
    }
    Ok(())
}
