//! compose 実行エンジン
//!
//! composeファイルの解釈やコンテナの起動停止は `docker compose` に任せる。
//! 引数の組み立ては純粋関数として分離してある。

use crate::error::{ContainerError, Result};
use stackyard_core::{DownOptions, StopOptions, UpOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// 読み込み済みのcomposeプロジェクト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeProject {
    pub name: String,
    pub file: PathBuf,
}

impl ComposeProject {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "compose".to_string(),
            "-p".to_string(),
            self.name.clone(),
            "-f".to_string(),
            self.file.display().to_string(),
        ]
    }

    pub fn up_args(&self, options: &UpOptions) -> Vec<String> {
        let mut args = self.base_args();
        args.push("up".to_string());
        if options.detach {
            args.push("-d".to_string());
        }
        if options.build {
            args.push("--build".to_string());
        }
        if options.force_recreate {
            args.push("--force-recreate".to_string());
        }
        if options.remove_orphans {
            args.push("--remove-orphans".to_string());
        }
        if options.no_deps {
            args.push("--no-deps".to_string());
        }
        if let Some(timeout) = options.timeout {
            args.push("--timeout".to_string());
            args.push(timeout.as_secs().to_string());
        }
        args.extend(options.services.iter().cloned());
        args
    }

    /// down はプロジェクト全体が対象のためサービス名は渡さない
    pub fn down_args(&self, options: &DownOptions) -> Vec<String> {
        let mut args = self.base_args();
        args.push("down".to_string());
        if options.remove_volumes {
            args.push("--volumes".to_string());
        }
        if options.remove_orphans {
            args.push("--remove-orphans".to_string());
        }
        if let Some(timeout) = options.timeout {
            args.push("--timeout".to_string());
            args.push(timeout.as_secs().to_string());
        }
        args
    }

    pub fn stop_args(&self, options: &StopOptions) -> Vec<String> {
        let mut args = self.base_args();
        args.push("stop".to_string());
        if let Some(timeout) = options.timeout {
            args.push("--timeout".to_string());
            args.push(timeout.as_secs().to_string());
        }
        args.extend(options.services.iter().cloned());
        args
    }

    pub fn exec_args(&self, service: &str, options: &ExecOptions) -> Vec<String> {
        let mut args = self.base_args();
        args.push("exec".to_string());
        if !options.tty {
            args.push("-T".to_string());
        }
        if let Some(user) = &options.user {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        if let Some(workdir) = &options.workdir {
            args.push("--workdir".to_string());
            args.push(workdir.clone());
        }
        for (key, value) in &options.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(service.to_string());
        args.extend(options.command.iter().cloned());
        args
    }

    pub fn logs_args(&self, options: &LogOptions) -> Vec<String> {
        let mut args = self.base_args();
        args.push("logs".to_string());
        if options.follow {
            args.push("--follow".to_string());
        }
        if options.timestamps {
            args.push("--timestamps".to_string());
        }
        if let Some(tail) = &options.tail {
            args.push("--tail".to_string());
            args.push(tail.clone());
        }
        if let Some(since) = &options.since {
            args.push("--since".to_string());
            args.push(since.clone());
        }
        args.extend(options.services.iter().cloned());
        args
    }
}

/// exec のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub command: Vec<String>,
    pub user: Option<String>,
    pub workdir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub tty: bool,
}

/// logs のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub services: Vec<String>,
    pub follow: bool,
    pub timestamps: bool,
    pub tail: Option<String>,
    pub since: Option<String>,
}

/// compose 実行エンジンのトレイト
#[allow(async_fn_in_trait)]
pub trait ComposeEngine {
    async fn load(&self, project: &str, file: &Path) -> Result<ComposeProject>;
    async fn up(&self, project: &ComposeProject, options: &UpOptions) -> Result<()>;
    async fn down(&self, project: &ComposeProject, options: &DownOptions) -> Result<()>;
    async fn stop(&self, project: &ComposeProject, options: &StopOptions) -> Result<()>;
    /// コマンドの終了コードを返す
    async fn exec(&self, project: &ComposeProject, service: &str, options: &ExecOptions)
    -> Result<i32>;
    async fn logs(&self, project: &ComposeProject, options: &LogOptions) -> Result<()>;
}

/// `docker compose` CLI を使う実装
#[derive(Debug, Clone)]
pub struct DockerComposeCli {
    program: String,
}

impl DockerComposeCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// 別の実行ファイルを使う（podman など）
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 標準入出力を引き継いで実行し、終了コードを返す
    async fn run_inherited(&self, args: &[String]) -> Result<i32> {
        debug!("Running: {} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.failed(args, e.to_string()))?;
        Ok(status.code().unwrap_or(-1))
    }

    async fn run_checked(&self, args: &[String]) -> Result<()> {
        let code = self.run_inherited(args).await?;
        if code != 0 {
            return Err(self.failed(args, format!("終了コード {code}")));
        }
        Ok(())
    }

    fn failed(&self, args: &[String], message: String) -> ContainerError {
        // base_args の直後がサブコマンド
        let command = args.get(5).cloned().unwrap_or_else(|| args.join(" "));
        ContainerError::EngineFailed { command, message }
    }
}

impl Default for DockerComposeCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeEngine for DockerComposeCli {
    /// composeファイルを検証してプロジェクトを返す
    async fn load(&self, project: &str, file: &Path) -> Result<ComposeProject> {
        let compose = ComposeProject::new(project, file);
        let mut args = compose.base_args();
        args.push("config".to_string());
        args.push("--quiet".to_string());

        debug!("Running: {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.failed(&args, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failed(&args, stderr.trim().to_string()));
        }
        Ok(compose)
    }

    async fn up(&self, project: &ComposeProject, options: &UpOptions) -> Result<()> {
        self.run_checked(&project.up_args(options)).await
    }

    async fn down(&self, project: &ComposeProject, options: &DownOptions) -> Result<()> {
        self.run_checked(&project.down_args(options)).await
    }

    async fn stop(&self, project: &ComposeProject, options: &StopOptions) -> Result<()> {
        self.run_checked(&project.stop_args(options)).await
    }

    async fn exec(
        &self,
        project: &ComposeProject,
        service: &str,
        options: &ExecOptions,
    ) -> Result<i32> {
        self.run_inherited(&project.exec_args(service, options)).await
    }

    async fn logs(&self, project: &ComposeProject, options: &LogOptions) -> Result<()> {
        self.run_checked(&project.logs_args(options)).await
    }
}
