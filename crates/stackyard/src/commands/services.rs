use colored::Colorize;
use stackyard_core::Catalog;

/// カタログのサービスをカテゴリごとに表示
pub fn handle(catalog: &Catalog, category: Option<String>) -> anyhow::Result<()> {
    let by_category = catalog.by_category();

    if let Some(category) = category.as_ref().filter(|c| !by_category.contains_key(*c)) {
        anyhow::bail!(
            "カテゴリ '{}' が見つかりません\n利用可能なカテゴリ: {}",
            category,
            catalog.categories().join(", ")
        );
    }

    for (name, services) in &by_category {
        if category.as_ref().is_some_and(|c| c != name) {
            continue;
        }
        println!("{}", format!("{name}:").bold());
        for service in services {
            let Some(definition) = catalog.definition(service) else {
                continue;
            };
            println!("  {:<20} {}", service.cyan(), definition.description);
            if !definition.dependencies.required.is_empty() {
                println!(
                    "  {:<20} {}",
                    "",
                    format!("依存: {}", definition.dependencies.required.join(", ")).dimmed()
                );
            }
        }
        println!();
    }
    Ok(())
}
