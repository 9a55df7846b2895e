use anyhow::Result;
use clap::Parser;
use rtserver::{
    app::{self, AppStateBuilder},
    config::{Cli, Config},
    preflight,
};
use std::fs::File;
use tokio::select;
use tracing::{error, info, level_filters::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.conf {
        Some(conf) if std::path::Path::new(&conf).exists() => Config::load(&conf)?,
        _ => Config::default(),
    };

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    let _guard = if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to create log file {}: {}", log_file, e))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        log_fmt.with_writer(non_blocking).try_init().ok();
        Some(guard)
    } else {
        log_fmt.try_init().ok();
        None
    };

    if let Err(e) = preflight::validate_start(&config).await {
        for issue in &e.issues {
            error!(field = issue.field.as_str(), "{}", issue.message);
        }
        return Err(e.into());
    }

    let state = AppStateBuilder::new().config(config).build();
    let token = state.token.clone();

    info!(
        "Starting {} on {}",
        rtserver::version::get_useragent(),
        state.config.http_addr
    );
    let mut server = tokio::spawn(app::run(state));
    select! {
        result = &mut server => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("Received CTRL+C, shutting down");
            token.cancel();
            server.await??;
        }
    }
    Ok(())
}
