#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(".stackyard")).unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) {
        let path = self.root.path().join(".stackyard").join("config.yaml");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_local_config(&self, content: &str) {
        let path = self.root.path().join(".stackyard").join("config.local.yaml");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_service_config(&self, file_name: &str, content: &str) {
        let dir = self.root.path().join(".stackyard").join("service-configs");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// プロジェクトルートで実行する `yard` コマンド
    pub fn yard(&self) -> Command {
        let mut cmd = yard();
        cmd.current_dir(self.path());
        cmd
    }

    #[allow(dead_code)]
    pub async fn docker_container_exists(&self, name: &str) -> bool {
        let docker = bollard::Docker::connect_with_local_defaults().unwrap();
        docker
            .inspect_container(
                name,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
            .is_ok()
    }
}

/// 外部の環境変数に左右されない `yard` コマンド
pub fn yard() -> Command {
    let mut cmd = Command::cargo_bin("yard").unwrap();
    cmd.env_remove("STACKYARD_PROJECT_ROOT")
        .env_remove("STACKYARD_PROJECT")
        .env_remove("RUST_LOG");
    cmd
}
