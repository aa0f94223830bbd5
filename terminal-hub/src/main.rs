use terminal_hub::{Config, Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 加载 .env (不存在也没关系)
    dotenv::dotenv().ok();

    // 2. 加载配置 (生产环境缺少 ADMIN_API_TOKEN 时直接退出)
    let config = Config::from_env().map_err(|e| -> Box<dyn std::error::Error> {
        eprintln!("Invalid configuration: {e}");
        e
    })?;

    // 3. 日志
    setup_environment(&config);
    print_banner();

    tracing::info!(
        environment = %config.environment,
        store_id = %config.store_id,
        port = config.http_port,
        "Terminal Hub starting..."
    );

    // 4. 启动 HTTP 服务器 (Server::run 会初始化状态并启动后台任务)
    let server = Server::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
