mod feed_source;
mod health;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use submux_core::app::App;
use submux_core::config::Config;
use submux_core::feed::{DedupStore, FeedSource, MemoryDedup};
use submux_core::media::FfmpegRunner;
use submux_core::router::Router;

use feed_source::HttpFeedSource;
use telegram::TelegramChat;

#[derive(Parser)]
#[command(name = "submuxd", about = "Subtitle mux and publish bot")]
struct Args {
    /// Override the temp work directory (WORK_DIR).
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Media tool binary to invoke.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,
}

fn init_logging(log_file: Option<&PathBuf>) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    if let Some(path) = log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("failed to open log file {}: {e}", path.display()),
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut cfg = Config::from_env();
    if let Some(workdir) = args.workdir {
        cfg.workdir = workdir;
    }
    init_logging(cfg.log_file.as_ref());

    if cfg.owner_ids.is_empty() {
        log::warn!("[main] OWNER_IDS is empty; every session-driving event will be dropped");
    }
    if let Err(e) = std::fs::create_dir_all(&cfg.workdir) {
        log::error!("[main] cannot create work dir {}: {e}", cfg.workdir.display());
        std::process::exit(1);
    }

    let chat = Arc::new(TelegramChat::new(&cfg.bot_token));
    match chat.get_me().await {
        Ok(username) => {
            log::info!("[main] running as @{username}");
            cfg.bot_username = username;
        }
        Err(e) => log::warn!("[main] getMe failed ({e}); share links will use BOT_USERNAME"),
    }

    let feed_source: Option<Arc<dyn FeedSource>> = cfg
        .rss_url
        .clone()
        .map(|url| Arc::new(HttpFeedSource::new(url)) as Arc<dyn FeedSource>);
    let dedup: Arc<dyn DedupStore> = Arc::new(MemoryDedup::new());

    let cfg = Arc::new(cfg);
    let app = App::new(
        Arc::clone(&cfg),
        chat.clone(),
        Arc::new(FfmpegRunner::new(args.ffmpeg)),
        feed_source,
        dedup,
    );

    let _reaper = app.orchestrator.spawn_reaper();
    if let Some(port) = cfg.port {
        tokio::spawn(health::serve(port));
    }

    let router = Router::new(Arc::clone(&app));
    log::info!("[main] event loop started");

    let mut offset: i64 = 0;
    loop {
        match chat.poll_updates(offset).await {
            Ok((events, next_offset)) => {
                offset = next_offset;
                for event in events {
                    router.handle(event).await;
                }
            }
            Err(e) => {
                log::error!("[main] update poll failed: {e}");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}
