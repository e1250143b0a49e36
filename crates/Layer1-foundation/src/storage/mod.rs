//! Storage module for Weave
//!
//! - `db`: SQLite - 플러그인용 `Database` 구현
//! - `json`: JSON - 설정 파일 저장/로드

mod db;
mod json;

// SQLite (Database 구현)
pub use db::SqliteDatabase;

// JSON Storage (범용)
pub use json::{JsonStore, PROJECT_DIR};
