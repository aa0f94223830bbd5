//! 认证模块
//!
//! - [`TerminalIdentity`] - 设备 API key 提取器
//! - [`require_admin`] - 管理端 token 中间件

pub mod admin;
pub mod terminal;

pub use admin::require_admin;
pub use terminal::{TerminalIdentity, client_ip};
