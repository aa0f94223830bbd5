//! Terminal Hub - 门店硬件支付终端服务
//!
//! # 架构概述
//!
//! - **终端存储** (`terminals::store`): 终端注册、查询、删除
//! - **配对** (`terminals::pairing`): 一次性 6 位配对码换取 API key
//! - **连接表** (`terminals::registry`): 在线终端的 WebSocket 推送通道
//! - **支付会话** (`terminals::sessions`): 内存中的支付会话状态机
//! - **推送** (`terminals::dispatch`): 向终端下发支付请求/取消
//! - **HTTP API** (`api`): 终端接口、管理接口、结账接口
//!
//! # 模块结构
//!
//! ```text
//! terminal-hub/src/
//! ├── core/          # 配置、状态、错误、后台任务
//! ├── auth/          # API key / admin token 认证
//! ├── api/           # HTTP 路由和处理器
//! ├── terminals/     # 终端子系统
//! ├── db/            # SQLite 存储层
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod terminals;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use shared::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Initialize logging from the given config
pub fn setup_environment(config: &Config) {
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
 _____                   _             _   _   _       _
|_   _|__ _ __ _ __ ___ (_)_ __   __ _| | | | | |_   _| |__
  | |/ _ \ '__| '_ ` _ \| | '_ \ / _` | | | |_| | | | | '_ \
  | |  __/ |  | | | | | | | | | | (_| | | |  _  | |_| | |_) |
  |_|\___|_|  |_| |_| |_|_|_| |_|\__,_|_| |_| |_|\__,_|_.__/
    "#
    );
}
