mod api;
mod app;
mod config;
mod device;
mod input;
mod playback;
mod store;
mod upload;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use api::SyncClient;
use device::DeviceMonitor;
use playback::adapter::OriginalStreams;
use store::VideoStore;

#[derive(Debug, Parser)]
#[command(name = "streamflex", version, about = "StreamFlex video client")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch a video: mpv window plus terminal controls.
    Watch { id: String },
    /// Print the server's videos to stdout (headless).
    List,
    /// Upload a video with progress output (headless).
    Upload {
        video: PathBuf,
        /// Optional thumbnail image.
        #[arg(long)]
        thumbnail: Option<PathBuf>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "User")]
        uploader: String,
    },
    /// Like a video (headless).
    Like { id: String },
    /// Delete a video and its stored assets (headless).
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let client = make_client(&cfg)?;

    match cli.command {
        Command::Watch { id } => {
            let videos = client.list_videos().await.context("load videos")?;
            let mut store = VideoStore::default();
            store.replace_all(videos);

            let monitor = DeviceMonitor::new(cfg.player.initial_width);
            if let Ok((cols, _)) = crossterm::terminal::size() {
                monitor.observe_width(cols as u32 * app::CELL_WIDTH_PX);
            }

            let mut app = app::App::new(
                cfg,
                client,
                store,
                monitor,
                Box::new(OriginalStreams),
                &id,
            );
            app.run().await?;
        }
        Command::List => {
            let videos = client.list_videos().await.context("load videos")?;
            print_videos(&videos);
        }
        Command::Upload {
            video,
            thumbnail,
            title,
            description,
            uploader,
        } => {
            let controller = upload::UploadController::new(client);
            let mut progress = controller.subscribe_progress();
            let printer = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    if let Some(pct) = *progress.borrow() {
                        print!("\rUploading... {pct:3}%");
                        let _ = std::io::stdout().flush();
                    }
                }
            });

            let req = upload::UploadRequest {
                video_path: video,
                thumbnail_path: thumbnail,
                title,
                description,
                uploader,
            };
            let result = controller.upload(&req).await;
            drop(controller);
            let _ = printer.await;
            println!();

            match result {
                Ok(v) => println!("Uploaded \"{}\" (id={})", v.title, v.id),
                Err(e) => anyhow::bail!("{e}"),
            }
        }
        Command::Like { id } => {
            let videos = client.list_videos().await.context("load videos")?;
            let mut store = VideoStore::default();
            store.replace_all(videos);

            if !store.apply_like(&id) {
                anyhow::bail!("no video with id {id}");
            }
            let optimistic = store.get_by_id(&id).map(|v| v.likes).unwrap_or(0);
            println!("likes: {optimistic} (syncing)");

            let video = client.record_like(&id).await.context("record like")?;
            println!("likes: {} (server)", video.likes);
            store.update(video);
        }
        Command::Delete { id, yes } => {
            let videos = client.list_videos().await.context("load videos")?;
            let mut store = VideoStore::default();
            store.replace_all(videos);

            let Some(video) = store.get_by_id(&id) else {
                anyhow::bail!("no video with id {id}");
            };
            if !store.is_deletable(&id) {
                anyhow::bail!(
                    "\"{}\" was not uploaded through StreamFlex and can't be deleted",
                    video.title
                );
            }
            if !yes && !confirm(&format!("Delete \"{}\" permanently?", video.title))? {
                println!("Aborted.");
                return Ok(());
            }

            client.delete_video(&id).await.context("delete video")?;
            store.remove(&id);
            println!("Deleted {id}.");
        }
    }

    Ok(())
}

fn make_client(cfg: &config::Config) -> anyhow::Result<SyncClient> {
    // Environment beats the config file, matching deploy-time overrides.
    let base = std::env::var("STREAMFLEX_API_BASE")
        .ok()
        .or_else(|| cfg.api.base_url.clone());
    SyncClient::new(base.as_deref())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().context("flush prompt")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("read confirmation")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_videos(videos: &[api::models::Video]) {
    for (i, v) in videos.iter().enumerate() {
        println!(
            "{:02}. {}  [{}] {} views, {} likes  (id={})",
            i + 1,
            v.title,
            app::format_time(v.duration as f64),
            v.analytics.views,
            v.likes,
            v.id
        );
    }
}
