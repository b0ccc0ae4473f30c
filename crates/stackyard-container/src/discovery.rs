//! 初期化コンテナの自動発見
//!
//! サービス設定ディレクトリにある `{service}-{anything}.yml` から、
//! 追加で起動すべき `{service}-init` を推定します。

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 解決済みサービスに対応する初期化サービス名を発見
///
/// ファイル名を `-` で分割し、長いプレフィックスから順に候補を作る。
/// 候補が解決済みサービス名と一致するか、その前方一致であれば
/// `{候補}-init` を採用して短い候補は試さない。
#[tracing::instrument(skip(resolved), fields(dir = %dir.display()))]
pub fn discover_init_services<S: AsRef<str>>(resolved: &[S], dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    visit_dir(dir, &mut files, &mut visited);
    files.sort();

    let mut found = BTreeSet::new();
    for file in &files {
        let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(candidate) = match_candidate(stem, resolved) {
            debug!(file = %file.display(), service = %candidate, "Discovered init service");
            found.insert(format!("{candidate}-init"));
        }
    }

    found.into_iter().collect()
}

fn match_candidate<S: AsRef<str>>(stem: &str, resolved: &[S]) -> Option<String> {
    let parts: Vec<&str> = stem.split('-').collect();
    if parts.len() < 2 {
        return None;
    }

    (1..parts.len()).rev().find_map(|len| {
        let candidate = parts[..len].join("-");
        resolved
            .iter()
            .any(|name| name.as_ref().starts_with(&candidate))
            .then_some(candidate)
    })
}

/// ディレクトリを再帰的に走査して YAML ファイルを集める
///
/// 読めないディレクトリや項目は警告を出して飛ばす。
fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>, visited: &mut HashSet<PathBuf>) {
    if !dir.is_dir() {
        return;
    }

    let canonical_dir = match dir.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to canonicalize directory, skipping");
            return;
        }
    };
    if !visited.insert(canonical_dir.clone()) {
        warn!(dir = %canonical_dir.display(), "Symlink loop detected, skipping");
        return;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to read directory, skipping");
            return;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read directory entry, skipping");
                continue;
            }
        };
        if path.is_dir() {
            visit_dir(&path, files, visited);
        } else if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yml" | "yaml")
        ) {
            files.push(path);
        }
    }
}
