use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("YAMLパースエラー: {path}\n理由: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("サービスが見つかりません: {0}")]
    UnknownService(String),

    #[error("サービス '{0}' は内部サービスのため直接指定できません")]
    HiddenService(String),

    #[error("検証エラー: {0}")]
    Validation(String),

    #[error("サービス定義 '{service}' が不正です: {message}")]
    InvalidServiceDefinition { service: String, message: String },

    #[error("循環依存が検出されました: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("composeファイル生成エラー: {0}")]
    Generation(String),

    #[error("サービス '{service}' の初期化スクリプトが失敗しました: {message}")]
    InitScript { service: String, message: String },

    #[error("テンプレート展開エラー: {0}")]
    TemplateRenderError(String),

    #[error("操作がキャンセルされました")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, StackError>;
