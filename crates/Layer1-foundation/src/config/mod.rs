//! Config - 통합 설정 관리
//!
//! - `weave.rs` - WeaveConfig, PluginSettings

mod weave;

pub use weave::{PluginSettings, WeaveConfig, WEAVE_CONFIG_FILE};
