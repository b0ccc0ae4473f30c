pub mod deps;
pub mod down;
pub mod exec;
pub mod generate;
pub mod init;
pub mod logs;
pub mod restart;
pub mod services;
pub mod status;
pub mod stop;
pub mod up;

use colored::Colorize;
use stackyard_core::{ServiceConfig, ServiceKind};

/// 解決済みサービスの一覧を表示
pub(crate) fn print_resolved(resolved: &[ServiceConfig]) {
    println!();
    println!("{}", format!("サービス一覧 ({} 個):", resolved.len()).bold());
    for service in resolved {
        match service.kind() {
            ServiceKind::Container => println!("  • {}", service.name().cyan()),
            kind => println!(
                "  • {} {}",
                service.name().cyan(),
                format!("({})", kind.as_str()).dimmed()
            ),
        }
    }
}
