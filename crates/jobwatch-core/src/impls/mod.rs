//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryObjectStore**: offline に切り替え可能な object store
//! - **ScriptedRuntime**: 登録済みの state / stats / logs を返す container runtime
//!
//! # 本番用実装
//! S3 や Docker Engine へのアダプタは埋め込み側のクレートで ports を実装します。

pub mod inmem_store;
pub mod scripted_runtime;

// 主要な型を再エクスポート
pub use self::inmem_store::InMemoryObjectStore;
pub use self::scripted_runtime::ScriptedRuntime;
