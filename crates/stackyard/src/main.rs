mod commands;
mod context;

use clap::{Parser, Subcommand};
use context::ProjectContext;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "yard")]
#[command(about = "宣言的なローカル開発スタック", long_about = None)]
struct Cli {
    /// プロジェクトルート（省略時は .stackyard/config.yaml を上位に探す）
    #[arg(long, global = true, env = "STACKYARD_PROJECT_ROOT")]
    project_root: Option<PathBuf>,

    /// プロジェクト名（省略時は config.yaml の project.name）
    #[arg(short, long, global = true, env = "STACKYARD_PROJECT")]
    project: Option<String>,

    /// 詳細なログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// スタックを起動
    Up {
        /// サービス名（省略時は stack.enabled）
        services: Vec<String>,
        /// イメージをビルドしてから起動
        #[arg(long)]
        build: bool,
        /// コンテナを再作成
        #[arg(long)]
        force_recreate: bool,
        /// 初期化スクリプトを実行しない
        #[arg(long)]
        no_init: bool,
    },
    /// スタックを停止して削除
    Down {
        /// ボリュームも削除
        #[arg(long)]
        volumes: bool,
        /// ラベルの付いたリソースを残らず削除
        #[arg(long)]
        purge: bool,
    },
    /// サービスを停止（コンテナは残す）
    Stop {
        /// サービス名（省略時は stack.enabled）
        services: Vec<String>,
    },
    /// サービスを停止してから起動し直す
    Restart {
        /// サービス名（省略時は stack.enabled）
        services: Vec<String>,
    },
    /// プロジェクトのコンテナの状態を表示
    Status {
        /// サービス名（省略時は全サービス）
        services: Vec<String>,
    },
    /// composeファイルを生成
    Generate {
        /// サービス名（省略時は stack.enabled）
        services: Vec<String>,
        /// ファイルに書かず標準出力に出す
        #[arg(long)]
        stdout: bool,
    },
    /// カタログのサービス一覧を表示
    Services {
        /// カテゴリで絞り込む
        #[arg(short, long)]
        category: Option<String>,
    },
    /// 依存関係を解決して起動順を表示
    Deps {
        /// サービス名
        #[arg(required = true)]
        services: Vec<String>,
    },
    /// 初期化スクリプトのみ実行
    Init {
        /// サービス名（省略時は stack.enabled）
        services: Vec<String>,
    },
    /// コンテナのログを表示
    Logs {
        /// サービス名（省略時は全サービス）
        service: Option<String>,
        /// ログをリアルタイムで追跡
        #[arg(short, long)]
        follow: bool,
        /// 表示する行数
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },
    /// サービスコンテナ内でコマンドを実行
    Exec {
        /// サービス名
        service: String,
        /// 実行ユーザー
        #[arg(short, long)]
        user: Option<String>,
        /// 環境変数 (KEY=VALUE)
        #[arg(short, long = "env")]
        env: Vec<String>,
        /// 実行するコマンド（-- 以降）。省略時は /bin/sh
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.verbose {
        filter = filter.add_directive(tracing::Level::DEBUG.into());
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // プロジェクト設定が不要なコマンド
    match cli.command {
        Commands::Version => {
            println!("stackyard {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Services { category } => {
            let catalog = context::discover_catalog(cli.project_root)?;
            return commands::services::handle(&catalog, category);
        }
        Commands::Deps { services } => {
            let catalog = context::discover_catalog(cli.project_root)?;
            return commands::deps::handle(&catalog, services);
        }
        _ => {}
    }

    let ctx = ProjectContext::load(cli.project_root, cli.project.as_deref())?;

    match cli.command {
        Commands::Up {
            services,
            build,
            force_recreate,
            no_init,
        } => {
            commands::up::handle(&ctx, services, build, force_recreate, no_init).await?;
        }
        Commands::Down { volumes, purge } => {
            commands::down::handle(&ctx, volumes, purge).await?;
        }
        Commands::Stop { services } => {
            commands::stop::handle(&ctx, services).await?;
        }
        Commands::Restart { services } => {
            commands::restart::handle(&ctx, services).await?;
        }
        Commands::Status { services } => {
            commands::status::handle(&ctx, services).await?;
        }
        Commands::Generate { services, stdout } => {
            commands::generate::handle(&ctx, services, stdout)?;
        }
        Commands::Init { services } => {
            commands::init::handle(&ctx, services).await?;
        }
        Commands::Logs {
            service,
            follow,
            lines,
        } => {
            commands::logs::handle(&ctx, service, lines, follow).await?;
        }
        Commands::Exec {
            service,
            user,
            env,
            command,
        } => {
            let code = commands::exec::handle(&ctx, service, user, env, command).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Version | Commands::Services { .. } | Commands::Deps { .. } => {
            unreachable!("handled before project loading")
        }
    }

    Ok(())
}
