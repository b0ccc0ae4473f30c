//! 初期化スクリプトの実行
//!
//! ホストのシェルで実行する `LocalShellRunner` と、
//! 使い捨てコンテナで実行する `DockerInitRunner` を提供します。

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::docker::pull_image;
use crate::error::{ContainerError, Result};
use crate::labels::resource_labels;
use bollard::Docker;
use bollard::container::{Config, CreateContainerOptions};
use bollard::models::HostConfig;
use futures_util::stream::StreamExt;
use stackyard_core::StackError;
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 展開済みスクリプトの実行要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub service: String,
    pub script_name: String,
    pub script: String,
    pub image: String,
    pub environment: BTreeMap<String, String>,
    pub project: String,
    pub network: String,
}

impl ScriptRequest {
    fn failure(&self, message: impl Into<String>) -> ContainerError {
        ContainerError::Stack(StackError::InitScript {
            service: self.service.clone(),
            message: format!("{}: {}", self.script_name, message.into()),
        })
    }
}

/// スクリプト実行のトレイト
#[allow(async_fn_in_trait)]
pub trait ScriptRunner {
    /// 終了コード0以外は `StackError::InitScript`、キャンセル時は `StackError::Cancelled`
    async fn run(&self, cancel: &CancellationToken, request: &ScriptRequest) -> Result<()>;
}

/// ホストのシェルで実行
#[derive(Debug, Clone)]
pub struct LocalShellRunner {
    shell: String,
}

impl LocalShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Default for LocalShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner for LocalShellRunner {
    async fn run(&self, cancel: &CancellationToken, request: &ScriptRequest) -> Result<()> {
        debug!(service = %request.service, script = %request.script_name, "Running init script on host");

        // プロセスの環境変数を引き継いだ上で追加する
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&request.script)
            .envs(&request.environment)
            .env("DOCKER_IMAGE", &request.image)
            .env("DOCKER_NETWORK", &request.network)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| request.failure(format!("シェルを起動できません: {e}")))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| request.failure(e.to_string()))?;
                if status.success() {
                    Ok(())
                } else {
                    let code = status.code().map_or("不明".to_string(), |c| c.to_string());
                    Err(request.failure(format!("終了コード {code}")))
                }
            }
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(service = %request.service, error = %e, "Failed to kill init script");
                }
                Err(StackError::Cancelled.into())
            }
        }
    }
}

/// 使い捨てコンテナで実行
pub struct DockerInitRunner {
    docker: Docker,
}

impl DockerInitRunner {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// `{service}-init-{unix秒}`
    pub fn container_name(service: &str) -> String {
        format!("{service}-init-{}", chrono::Utc::now().timestamp())
    }

    fn container_config(request: &ScriptRequest) -> Config<String> {
        let env = request
            .environment
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let labels: HashMap<String, String> =
            resource_labels(&request.project, &request.service, "isolated")
                .into_iter()
                .collect();

        Config {
            image: Some(request.image.clone()),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                request.script.clone(),
            ]),
            env: Some(env),
            labels: Some(labels),
            host_config: Some(HostConfig {
                network_mode: Some(request.network.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    async fn create(&self, name: &str, request: &ScriptRequest) -> Result<()> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        };
        let config = Self::container_config(request);

        match self
            .docker
            .create_container(Some(options.clone()), config.clone())
            .await
        {
            Ok(_) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // イメージが無ければ取得して再作成
                pull_image(&self.docker, &request.image).await?;
                self.docker.create_container(Some(options), config).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn start_and_wait(
        &self,
        cancel: &CancellationToken,
        name: &str,
        request: &ScriptRequest,
    ) -> Result<()> {
        self.docker
            .start_container(name, None::<bollard::query_parameters::StartContainerOptions>)
            .await?;

        let mut wait_stream = self
            .docker
            .wait_container(name, None::<bollard::query_parameters::WaitContainerOptions>);

        tokio::select! {
            next = wait_stream.next() => match next {
                Some(Ok(response)) if response.status_code == 0 => Ok(()),
                Some(Ok(response)) => {
                    Err(request.failure(format!("終了コード {}", response.status_code)))
                }
                // 0以外の終了コードは bollard 側でエラーに変換される
                Some(Err(bollard::errors::Error::DockerContainerWaitError { error, code })) => {
                    let detail = if error.is_empty() { String::new() } else { format!(" ({error})") };
                    Err(request.failure(format!("終了コード {code}{detail}")))
                }
                Some(Err(e)) => Err(e.into()),
                None => Err(request.failure("コンテナの終了を確認できませんでした")),
            },
            _ = cancel.cancelled() => Err(StackError::Cancelled.into()),
        }
    }

    async fn remove(&self, name: &str) {
        let result = self
            .docker
            .remove_container(
                name,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
        if let Err(e) = result {
            warn!(container = %name, error = %e, "Failed to remove init container");
        }
    }
}

impl ScriptRunner for DockerInitRunner {
    async fn run(&self, cancel: &CancellationToken, request: &ScriptRequest) -> Result<()> {
        if request.image.is_empty() {
            return Err(request.failure("init_service.image が指定されていません"));
        }

        let name = Self::container_name(&request.service);
        info!(
            service = %request.service,
            container = %name,
            image = %request.image,
            "Running init script in container"
        );

        self.create(&name, request).await?;
        let result = self.start_and_wait(cancel, &name, request).await;
        self.remove(&name).await;
        result
    }
}
