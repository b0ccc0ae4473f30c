use stackyard_core::StackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(
        "Dockerに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • docker ps コマンドが正常に動作するか確認してください"
    )]
    DockerConnectionFailed(String),

    #[error(
        "イメージ '{image}' が見つかりません\n\nヒント:\n  • イメージ名とタグを確認してください\n  • docker pull {image} でイメージをダウンロードしてください"
    )]
    ImageNotFound { image: String },

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),

    #[error("docker compose の実行に失敗しました ({command}): {message}")]
    EngineFailed { command: String, message: String },

    #[error("composeファイルを読み込めません: {path}\n理由: {message}")]
    ReadFailed {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("composeファイルを書き込めません: {path}\n理由: {message}")]
    WriteFailed {
        path: std::path::PathBuf,
        message: String,
    },
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        match &err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } if message.contains("No such image") => ContainerError::ImageNotFound {
                image: message
                    .trim_start_matches("No such image: ")
                    .to_string(),
            },
            _ => {
                // 接続エラーの可能性をチェック
                let err_str = err.to_string();
                if err_str.contains("Connection refused")
                    || err_str.contains("No such file or directory")
                {
                    ContainerError::DockerConnectionFailed(err_str)
                } else {
                    ContainerError::DockerApiError(err_str)
                }
            }
        }
    }
}

impl ContainerError {
    /// 操作がキャンセルされたかどうか
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContainerError::Stack(StackError::Cancelled))
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
