//! サービス固有の設定レコード
//!
//! サービスごとの `*Config` レコードと、そのリストフィールドを
//! 外部名で公開する `MergeableConfig` を定義します。
//! ユーザーの上書きファイルのマージと、初期化スクリプトの
//! テンプレートデータ集約の両方がこのインターフェースを通ります。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// リストの要素（任意のキーを持つマップ）
pub type ConfigEntry = Map<String, Value>;

/// マージ・集約可能な設定レコード
pub trait MergeableConfig {
    /// レコードが持つリストフィールドの外部名
    fn field_names(&self) -> &'static [&'static str];

    /// 外部名とリストの対応
    fn list_fields(&self) -> Vec<(&'static str, &[ConfigEntry])>;

    /// 外部名からリストへの可変参照を取得
    fn list_field_mut(&mut self, name: &str) -> Option<&mut Vec<ConfigEntry>>;

    /// 空でないリストフィールドのみ
    fn populated_fields(&self) -> Vec<(&'static str, &[ConfigEntry])> {
        self.list_fields()
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    /// ドキュメントのリスト値でフィールドを置き換える
    ///
    /// マップ以外の要素は捨てる。空リストはマージしない。
    /// 戻り値は置き換えたフィールド数。
    fn merge_lists(&mut self, document: &Map<String, Value>) -> usize {
        let mut merged = 0;
        for name in self.field_names() {
            let Some(Value::Array(items)) = document.get(*name) else {
                continue;
            };
            let entries: Vec<ConfigEntry> = items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect();
            if entries.is_empty() {
                continue;
            }
            if let Some(field) = self.list_field_mut(name) {
                *field = entries;
                merged += 1;
            }
        }
        merged
    }
}

macro_rules! config_record {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$field_meta:meta])* $field:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                #[serde(default, skip_serializing_if = "Vec::is_empty")]
                pub $field: Vec<ConfigEntry>,
            )+
        }

        impl $name {
            /// リストフィールドの外部名
            pub const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];
        }

        impl MergeableConfig for $name {
            fn field_names(&self) -> &'static [&'static str] {
                Self::FIELDS
            }

            fn list_fields(&self) -> Vec<(&'static str, &[ConfigEntry])> {
                vec![$((stringify!($field), self.$field.as_slice())),+]
            }

            fn list_field_mut(&mut self, name: &str) -> Option<&mut Vec<ConfigEntry>> {
                match name {
                    $(stringify!($field) => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

config_record! {
    /// LocalStack のリソース定義
    LocalstackConfig {
        /// SQS キュー
        queues,
        /// SNS トピック
        topics,
        /// S3 バケット
        buckets,
    }
}

config_record! {
    /// Kafka のトピック定義
    KafkaConfig { topics }
}

config_record! {
    /// PostgreSQL のデータベース定義
    PostgresConfig { databases }
}

/// サービス定義に付随する設定レコード群
///
/// カタログで宣言されていないレコードも、上書きファイルに
/// そのレコードのキーがあれば既定値で作成してからマージする。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localstack: Option<LocalstackConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,
}

impl ServiceExtensions {
    /// 宣言済みのレコード
    pub fn records(&self) -> Vec<&dyn MergeableConfig> {
        let mut records: Vec<&dyn MergeableConfig> = Vec::new();
        if let Some(r) = &self.localstack {
            records.push(r);
        }
        if let Some(r) = &self.kafka {
            records.push(r);
        }
        if let Some(r) = &self.postgres {
            records.push(r);
        }
        records
    }

    fn records_mut(&mut self) -> Vec<&mut dyn MergeableConfig> {
        let mut records: Vec<&mut dyn MergeableConfig> = Vec::new();
        if let Some(r) = &mut self.localstack {
            records.push(r);
        }
        if let Some(r) = &mut self.kafka {
            records.push(r);
        }
        if let Some(r) = &mut self.postgres {
            records.push(r);
        }
        records
    }

    /// 上書きドキュメントを全レコードにマージ
    ///
    /// 宣言済みレコードが持たないキーに値があれば、そのキーを持つ
    /// 未宣言レコードを作成する。
    pub fn merge_document(&mut self, document: &Map<String, Value>) -> usize {
        self.create_missing_records(document);
        self.records_mut()
            .into_iter()
            .map(|record| record.merge_lists(document))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn create_missing_records(&mut self, document: &Map<String, Value>) {
        let declared: HashSet<&'static str> = self
            .records()
            .iter()
            .flat_map(|record| record.field_names().iter().copied())
            .collect();
        let wanted = |fields: &[&str]| {
            fields
                .iter()
                .any(|field| !declared.contains(field) && has_entries(document, field))
        };

        if self.localstack.is_none() && wanted(LocalstackConfig::FIELDS) {
            self.localstack = Some(LocalstackConfig::default());
        }
        if self.kafka.is_none() && wanted(KafkaConfig::FIELDS) {
            self.kafka = Some(KafkaConfig::default());
        }
        if self.postgres.is_none() && wanted(PostgresConfig::FIELDS) {
            self.postgres = Some(PostgresConfig::default());
        }
    }
}

/// マップの要素を1つ以上含むリストか
fn has_entries(document: &Map<String, Value>, field: &str) -> bool {
    matches!(document.get(field), Some(Value::Array(items)) if items.iter().any(Value::is_object))
}
