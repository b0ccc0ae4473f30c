use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "プロジェクトが見つかりません: {start} から上位に .stackyard/config.yaml がありません\n\
        STACKYARD_PROJECT_ROOT 環境変数または --project-root で直接指定できます"
    )]
    ProjectRootNotFound { start: PathBuf },

    #[error("設定ファイルの解析に失敗しました: {path}\n{message}")]
    Parse { path: PathBuf, message: String },

    #[error("不正なプロジェクト名です: '{name}' (英数字とハイフンで2〜50文字)")]
    InvalidProjectName { name: String },

    #[error("設定の検証に失敗しました: {0}")]
    Validation(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
