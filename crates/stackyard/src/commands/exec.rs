use crate::context::ProjectContext;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use stackyard_container::{ComposeEngine, DockerComposeCli, ExecOptions};

/// サービスコンテナでコマンドを実行し、終了コードを返す
pub async fn handle(
    ctx: &ProjectContext,
    service: String,
    user: Option<String>,
    env: Vec<String>,
    command: Vec<String>,
) -> anyhow::Result<i32> {
    let file = ctx.paths.compose_file();
    if !file.exists() {
        anyhow::bail!(
            "composeファイルがありません: {}\n先に yard up を実行してください",
            file.display()
        );
    }

    // コマンドが省略された場合は /bin/sh
    let command = if command.is_empty() {
        vec!["/bin/sh".to_string()]
    } else {
        command
    };

    let options = ExecOptions {
        command,
        user,
        workdir: None,
        env: parse_env_pairs(&env)?,
        tty: std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
    };

    let engine = DockerComposeCli::new();
    let project = engine.load(&ctx.project, &file).await?;
    Ok(engine.exec(&project, &service, &options).await?)
}

/// `KEY=VALUE` 形式を分解
fn parse_env_pairs(pairs: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("環境変数は KEY=VALUE 形式で指定してください: {pair}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_pairs() {
        let env = parse_env_pairs(&["PGDATABASE=app".to_string(), "EMPTY=".to_string()]).unwrap();
        assert_eq!(env["PGDATABASE"], "app");
        assert_eq!(env["EMPTY"], "");

        assert!(parse_env_pairs(&["INVALID".to_string()]).is_err());
    }
}
