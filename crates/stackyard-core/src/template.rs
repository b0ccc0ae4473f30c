//! 初期化スクリプトのテンプレート展開
//!
//! 依存サービスから集めたデータ（動的なマップ）を Tera のコンテキストにして
//! スクリプト本文を展開します。

use crate::error::{Result, StackError};
use std::collections::HashMap;
use tera::{Context, Tera};

/// 変数コンテキスト
pub type Variables = HashMap<String, serde_json::Value>;

/// テンプレートプロセッサ
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    pub fn with_variables(variables: Variables) -> Self {
        let mut context = Context::new();
        for (key, value) in variables {
            context.insert(key, &value);
        }
        Self {
            tera: Tera::default(),
            context,
        }
    }

    /// 文字列をテンプレートとして展開
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(template, &self.context)
            .map_err(|e| StackError::TemplateRenderError(render_error_detail(&e)))
    }
}

/// Teraエラーの原因を辿って1行にまとめる
fn render_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }
    let detail = details.join(" | ");

    // "Variable `xxx` not found in context"
    if let Some(start) = detail.find("Variable `")
        && let Some(end) = detail[start..].find("` not found in context")
    {
        let name = &detail[start + "Variable `".len()..start + end];
        return format!(
            "未定義の変数: `{name}`\nヒント: 依存サービスの設定に追加するか、`is defined` で存在を確認してください"
        );
    }

    detail
}
