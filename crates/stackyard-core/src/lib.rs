//! stackyard core
//!
//! サービスカタログ、依存関係の解決、命名規則、特性の解決、
//! 初期化スクリプトのテンプレート展開を提供します。

pub mod aggregate;
pub mod catalog;
pub mod characteristics;
pub mod env;
pub mod error;
pub mod model;
pub mod naming;
pub mod overrides;
pub mod resolver;
pub mod template;

pub use aggregate::collect_template_data;
pub use catalog::Catalog;
pub use characteristics::{
    CharacteristicsResolver, CharacteristicsTable, DownOptions, StopOptions, UpOptions,
    characteristics_for,
};
pub use env::{expand_env, expand_env_with};
pub use error::{Result, StackError};
pub use model::*;
pub use naming::{NamingStrategy, SHARED_NETWORK, SHARED_PREFIX, SharingPolicy};
pub use overrides::apply_overrides;
pub use resolver::DependencyResolver;
pub use template::{TemplateProcessor, Variables};
