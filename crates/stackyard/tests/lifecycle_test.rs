mod common;

use common::TestProject;

/// up → status → restart → down --purge のライフサイクル
///
/// Docker依存: docker compose と Docker デーモンが必要
/// 実行方法: `cargo test --test lifecycle_test -- --ignored`
#[tokio::test]
#[ignore = "Docker依存テスト - CI Tier2で実行"]
async fn test_up_restart_and_purge() {
    let project = TestProject::new();
    project.write_config("project:\n  name: yard-lifecycle\nstack:\n  enabled: [redis]\n");

    project.yard().args(["up", "--no-init"]).assert().success();
    assert!(
        project
            .docker_container_exists("yard-lifecycle-redis")
            .await
    );

    project
        .yard()
        .arg("status")
        .assert()
        .success()
        .stdout(predicates::str::contains("yard-lifecycle-redis"));

    project.yard().arg("restart").assert().success();
    assert!(
        project
            .docker_container_exists("yard-lifecycle-redis")
            .await
    );

    project.yard().args(["down", "--purge"]).assert().success();
    assert!(
        !project
            .docker_container_exists("yard-lifecycle-redis")
            .await
    );
}
