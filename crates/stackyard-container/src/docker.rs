//! Docker API ヘルパー
//!
//! 接続、イメージ取得、ラベル単位でのリソース一覧・削除。

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use crate::error::{ContainerError, Result};
use crate::labels::{LABEL_SERVICE, project_filter};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Docker接続を初期化して疎通を確認
pub async fn init_docker() -> Result<Docker> {
    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
    docker
        .ping()
        .await
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
    Ok(docker)
}

/// イメージ名とタグを分離
/// 例: "redis:7-alpine" -> ("redis", "7-alpine")
///     "postgres" -> ("postgres", "latest")
///     "localhost:5000/tool" -> ("localhost:5000/tool", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// イメージをpull
pub async fn pull_image(docker: &Docker, image: &str) -> Result<()> {
    let (image_name, tag) = parse_image_tag(image);
    info!(image = %image, "Pulling image");

    let options = bollard::image::CreateImageOptions {
        from_image: image_name,
        tag,
        ..Default::default()
    };
    let mut stream = docker.create_image(Some(options), None, None);

    while let Some(progress) = stream.next().await {
        match progress {
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                ..
            }) => debug!(image = %image, status = %status, "Pull progress"),
            Ok(_) => {}
            Err(e) => {
                return Err(ContainerError::DockerApiError(format!(
                    "イメージのダウンロードに失敗しました ({image}): {e}"
                )));
            }
        }
    }
    Ok(())
}

/// プロジェクトのコンテナ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContainer {
    pub id: String,
    pub name: String,
    pub service: Option<String>,
    pub image: String,
    pub status: String,
}

fn label_filters(project: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([("label".to_string(), vec![project_filter(project)])])
}

/// ラベルでプロジェクトのコンテナを一覧
pub async fn list_project_containers(docker: &Docker, project: &str) -> Result<Vec<ProjectContainer>> {
    let options = bollard::container::ListContainersOptions {
        all: true,
        filters: label_filters(project),
        ..Default::default()
    };
    let containers = docker.list_containers(Some(options)).await?;

    Ok(containers
        .into_iter()
        .map(|c| ProjectContainer {
            id: c.id.unwrap_or_default(),
            name: c
                .names
                .as_ref()
                .and_then(|n| n.first())
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            service: c
                .labels
                .as_ref()
                .and_then(|labels| labels.get(LABEL_SERVICE))
                .cloned(),
            image: c.image.unwrap_or_default(),
            status: c.status.unwrap_or_default(),
        })
        .collect())
}

/// 削除結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub containers: Vec<String>,
    pub networks: Vec<String>,
    pub volumes: Vec<String>,
}

/// プロジェクトのラベルを持つリソースを削除
///
/// コンテナ、ネットワークの順に削除し、`volumes` が真ならボリュームも削除する。
/// 個別の削除失敗は警告に留めて続行する。
#[tracing::instrument(skip(docker))]
pub async fn remove_project_resources(
    docker: &Docker,
    project: &str,
    volumes: bool,
) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for container in list_project_containers(docker, project).await? {
        match docker
            .remove_container(
                &container.id,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(_) => report.containers.push(container.name),
            Err(e) => warn!(container = %container.name, error = %e, "Failed to remove container"),
        }
    }

    let options = bollard::network::ListNetworksOptions {
        filters: label_filters(project),
    };
    for network in docker.list_networks(Some(options)).await? {
        let Some(name) = network.name else {
            continue;
        };
        match docker.remove_network(&name).await {
            Ok(_) => report.networks.push(name),
            Err(e) => warn!(network = %name, error = %e, "Failed to remove network"),
        }
    }

    if volumes {
        let options = bollard::volume::ListVolumesOptions {
            filters: label_filters(project),
        };
        let listed = docker.list_volumes(Some(options)).await?;
        for volume in listed.volumes.unwrap_or_default() {
            match docker
                .remove_volume(&volume.name, None::<bollard::query_parameters::RemoveVolumeOptions>)
                .await
            {
                Ok(_) => report.volumes.push(volume.name),
                Err(e) => warn!(volume = %volume.name, error = %e, "Failed to remove volume"),
            }
        }
    }

    info!(
        containers = report.containers.len(),
        networks = report.networks.len(),
        volumes = report.volumes.len(),
        "Removed project resources"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_tag() {
        assert_eq!(parse_image_tag("redis:7-alpine"), ("redis", "7-alpine"));
        assert_eq!(parse_image_tag("postgres"), ("postgres", "latest"));
        assert_eq!(
            parse_image_tag("localhost:5000/tools/aws"),
            ("localhost:5000/tools/aws", "latest")
        );
        assert_eq!(
            parse_image_tag("localhost:5000/tools/aws:2"),
            ("localhost:5000/tools/aws", "2")
        );
    }

    #[test]
    fn test_label_filters() {
        let filters = label_filters("myapp");
        assert_eq!(filters["label"], vec!["io.stackyard.project=myapp"]);
    }
}
