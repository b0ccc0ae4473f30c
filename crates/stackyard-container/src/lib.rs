//! stackyard container
//!
//! composeドキュメントの生成、初期化コンテナの発見、初期化スクリプトの実行、
//! docker compose / Docker API との連携を提供します。

pub mod compose;
pub mod discovery;
pub mod docker;
pub mod engine;
pub mod error;
pub mod init;
pub mod labels;
pub mod runner;

pub use compose::*;
pub use discovery::discover_init_services;
pub use docker::*;
pub use engine::*;
pub use error::*;
pub use init::InitOrchestrator;
pub use runner::*;
