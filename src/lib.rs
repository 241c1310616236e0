//! 食材密度AI照合ツール
//!
//! 密度が未知の食材を、LLMとの対話で密度リファレンスの食材に照合する。

pub mod ai_provider;
pub mod batch;
pub mod cli;
pub mod completion;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod logging;
