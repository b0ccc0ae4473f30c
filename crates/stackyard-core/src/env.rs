//! 環境変数展開
//!
//! `${VAR:-default}` 形式をプロセスの環境変数で展開します。

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENV_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*):-([^}]*)\}").ok());

/// プロセスの環境変数で展開
pub fn expand_env(value: &str) -> String {
    expand_env_with(value, |key| std::env::var(key).ok())
}

/// 任意の参照関数で展開
///
/// 値が未設定または空の場合はデフォルト値を使う。
/// 文字列中の式はすべて展開するが、1つでも解釈できない `${` があれば
/// 値全体を変換せずそのまま残す。
pub fn expand_env_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let openings = value.matches("${").count();
    if openings == 0 {
        return value.to_string();
    }
    let Some(pattern) = ENV_PATTERN.as_ref() else {
        return value.to_string();
    };
    let well_formed = pattern
        .find_iter(value)
        .filter(|m| m.as_str().matches("${").count() == 1)
        .count();
    if well_formed != openings {
        return value.to_string();
    }

    pattern
        .replace_all(value, |caps: &Captures| {
            let key = &caps[1];
            let default = &caps[2];
            match lookup(key) {
                Some(v) if !v.is_empty() => v,
                _ => default.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "TEST_VAR" => Some("from-env".to_string()),
            "EMPTY_VAR" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn test_expands_set_variable() {
        assert_eq!(expand_env_with("${TEST_VAR:-default}", lookup), "from-env");
    }

    #[test]
    fn test_falls_back_to_default() {
        assert_eq!(expand_env_with("${MISSING_VAR:-default}", lookup), "default");
        assert_eq!(expand_env_with("${EMPTY_VAR:-fallback}", lookup), "fallback");
        assert_eq!(expand_env_with("${MISSING_VAR:-}", lookup), "");
    }

    #[test]
    fn test_malformed_expression_is_literal() {
        assert_eq!(
            expand_env_with("${TEST_VAR:-default", lookup),
            "${TEST_VAR:-default"
        );
        assert_eq!(expand_env_with("${TEST_VAR}", lookup), "${TEST_VAR}");
        assert_eq!(expand_env_with("plain", lookup), "plain");
    }

    #[test]
    fn test_partly_malformed_value_is_left_whole() {
        // 入れ子や閉じていない式は一部だけ展開しない
        assert_eq!(
            expand_env_with("${A:-x ${TEST_VAR:-y}", lookup),
            "${A:-x ${TEST_VAR:-y}"
        );
        assert_eq!(
            expand_env_with("${TEST_VAR:-a}-${BROKEN", lookup),
            "${TEST_VAR:-a}-${BROKEN"
        );
        assert_eq!(
            expand_env_with("${HOME}/${TEST_VAR:-a}", lookup),
            "${HOME}/${TEST_VAR:-a}"
        );
    }

    #[test]
    fn test_expands_inside_larger_string() {
        assert_eq!(
            expand_env_with("postgres://${TEST_VAR:-u}@${HOST:-localhost}:5432", lookup),
            "postgres://from-env@localhost:5432"
        );
    }

    #[test]
    #[serial]
    fn test_process_environment() {
        temp_env::with_var("STACKYARD_ENV_TEST", Some("8080"), || {
            assert_eq!(expand_env("${STACKYARD_ENV_TEST:-3000}"), "8080");
        });
        temp_env::with_var_unset("STACKYARD_ENV_TEST", || {
            assert_eq!(expand_env("${STACKYARD_ENV_TEST:-3000}"), "3000");
        });
    }
}
