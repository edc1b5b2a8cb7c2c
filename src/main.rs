use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use notify::{PollWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;
use warp::Filter;

mod config;
mod date;
mod indexer;
mod metadata;
mod renderer;
mod upload;
mod viewer;

use config::Config;
use indexer::Indexer;
use viewer::{Screen, Source, Viewer};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "A minimal essay archive • written • kept")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the essay index artifacts
    Generate {
        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Serve the generated archive locally
    Serve {
        /// Path to the dist directory to serve
        #[arg(short, long, default_value = "dist")]
        dist: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "3007")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Watch for changes and regenerate automatically
        #[arg(short, long, default_value = "true")]
        watch: bool,
    },
    /// Browse the archive from the terminal
    Browse {
        /// Base URL of a served archive; defaults to reading the local output directory
        #[arg(short, long)]
        url: Option<String>,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Create a new essay skeleton
    New {
        /// Title of the new essay
        #[arg(short, long)]
        title: String,

        /// Subtitle of the new essay
        #[arg(short, long)]
        subtitle: Option<String>,

        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Essays directory
        #[arg(short, long)]
        essays_dir: Option<PathBuf>,
    },
    /// Upload the generated artifacts to S3
    Upload {
        /// Path to config file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    println!(
        r#"
   ◜ q u i l l ◝
   written • kept

"#
    );

    match cli.command {
        Commands::Generate { config } => {
            let config = Config::load(&config)
                .context("Failed to load configuration")?;

            let indexer = Indexer::new(config);
            if let Err(e) = indexer.generate().await {
                eprintln!("{}", format!("Error: {}", e).red());
                process::exit(1);
            }
        }
        Commands::Serve { dist, port, host, config, watch } => {
            serve_site(dist, host, port, config, watch).await?;
        }
        Commands::Browse { url, config } => {
            browse_archive(url, config).await?;
        }
        Commands::New { title, subtitle, config, essays_dir } => {
            create_new_essay(title, subtitle, config, essays_dir).await?;
        }
        Commands::Upload { config } => {
            upload_archive(config).await?;
        }
    }

    Ok(())
}

async fn serve_site(
    dist_path: PathBuf,
    host: String,
    port: u16,
    config_path: PathBuf,
    watch: bool,
) -> Result<()> {
    if !dist_path.exists() {
        eprintln!("{}", format!("Error: Directory '{}' does not exist. Run 'quill generate' first.", dist_path.display()).red());
        process::exit(1);
    }

    if !dist_path.is_dir() {
        eprintln!("{}", format!("Error: '{}' is not a directory.", dist_path.display()).red());
        process::exit(1);
    }

    println!("{}", "Starting server...".green().bold());
    println!("{}", format!("Serving: {}", dist_path.display()).blue());
    println!("{}", format!("URL: http://{}:{}", host, port).blue());

    let _watcher_handle = if watch {
        println!("{}", "File watching enabled - changes will trigger regeneration".yellow());
        Some(setup_file_watcher(config_path.clone()).await?)
    } else {
        None
    };

    println!("{}", "Press Ctrl+C to stop".yellow());

    let static_files = warp::fs::dir(dist_path);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    let routes = static_files
        .with(cors)
        .with(warp::log("quill"));

    let addr: std::net::IpAddr = host.parse()
        .context("Invalid host address")?;

    warp::serve(routes)
        .run((addr, port))
        .await;

    Ok(())
}

struct WatcherHandle {
    _watcher: PollWatcher,
    _task_handle: tokio::task::JoinHandle<()>,
}

async fn setup_file_watcher(config_path: PathBuf) -> Result<WatcherHandle> {
    let (tx, rx) = mpsc::channel();

    let mut watcher = PollWatcher::new(
        move |res| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Failed to send file watch event: {}", e);
                }
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_secs(1)),
    )?;

    // Load config to get the essays directory
    let config = Config::load(&config_path)?;
    let essays_dir = PathBuf::from(&config.essays_dir);

    if essays_dir.exists() {
        watcher.watch(&essays_dir, RecursiveMode::Recursive)?;
        println!("{}", format!("Watching: {}", essays_dir.display()).blue());
    }

    // Also watch config file
    watcher.watch(&config_path, RecursiveMode::NonRecursive)?;

    let config_name = config_path.file_name().map(|n| n.to_os_string());

    // Spawn background task to handle file changes
    let task_handle = tokio::spawn(async move {
        let mut last_generation = std::time::Instant::now();

        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    // Check if it's a markdown file or the config file
                    let is_relevant = event.paths.iter().any(|path| {
                        path.extension().map_or(false, |ext| ext == "md")
                            || path.file_name().map_or(false, |name| {
                                config_name.as_deref() == Some(name)
                            })
                    });

                    if is_relevant {
                        // Debounce: only regenerate if it's been at least 1 second since last generation
                        if last_generation.elapsed() > Duration::from_secs(1) {
                            match event.kind {
                                notify::EventKind::Create(_)
                                | notify::EventKind::Modify(_)
                                | notify::EventKind::Remove(_) => {
                                    println!("{}", "File changed, regenerating archive...".yellow());
                                    last_generation = std::time::Instant::now();

                                    if let Err(e) = regenerate_archive(&config_path).await {
                                        eprintln!("{}", format!("Regeneration failed: {}", e).red());
                                    } else {
                                        println!("{}", "Archive regenerated successfully!".green());
                                    }
                                }
                                _ => {
                                    // Ignore other event types
                                }
                            }
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        }
    });

    Ok(WatcherHandle {
        _watcher: watcher,
        _task_handle: task_handle,
    })
}

async fn regenerate_archive(config_path: &PathBuf) -> Result<()> {
    let config = Config::load(config_path)?;
    Indexer::new(config).generate().await?;
    Ok(())
}

async fn browse_archive(url: Option<String>, config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)
        .context("Failed to load configuration")?;

    let source = match url {
        Some(url) => {
            println!("{}", format!("Reading archive from {}", url).blue());
            Source::http(url)
        }
        None => {
            println!("{}", format!("Reading archive from {}/", config.output_dir).blue());
            Source::dir(&config.output_dir)
        }
    };

    match Viewer::load(source).await {
        Ok(viewer) => run_browser(viewer).await,
        Err(e) => {
            eprintln!("{}", viewer::INDEX_ERROR_HTML.red());
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    }
}

async fn run_browser(mut viewer: Viewer) -> Result<()> {
    let mut screen = viewer.list_screen();

    loop {
        match screen {
            Screen::List { count_label, .. } => {
                println!();
                println!("{}", count_label.white().bold());
                println!();
                for (i, essay) in viewer.essays().iter().enumerate() {
                    println!("  {}. {} ({})", i + 1, essay.title.cyan().bold(), essay.date);
                    if !essay.subtitle.is_empty() {
                        println!("     {}", essay.subtitle.white());
                    }
                }
                println!();

                let input = prompt_line("Select an essay number, or q to quit")?;
                if input.eq_ignore_ascii_case("q") {
                    return Ok(());
                }

                match input.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= viewer.essays().len() => {
                        let filename = viewer.essays()[n - 1].file_link.clone();
                        if let Screen::Loading { html } = viewer.loading_screen() {
                            println!("{}", html.yellow());
                        }
                        screen = viewer.select(&filename).await;
                    }
                    _ => {
                        println!("{}", "Not a valid selection.".red());
                        screen = viewer.list_screen();
                    }
                }
            }
            Screen::Article { html, .. } => {
                println!();
                println!("{}", html);
                println!();
                prompt_line("Press Enter to return to the essay list")?;
                screen = viewer.back();
            }
            Screen::ArticleError { html } => {
                eprintln!("{}", html.red());
                prompt_line("Press Enter to return to the essay list")?;
                screen = viewer.back();
            }
            Screen::Loading { .. } => {
                screen = viewer.list_screen();
            }
        }
    }
}

fn prompt_line(question: &str) -> Result<String> {
    use std::io::{self, Write};

    print!("{}: ", question.cyan().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn sanitize_slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let provisional: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let collapsed = {
        // collapse runs of '-'
        let mut out = String::with_capacity(provisional.len());
        let mut last_dash = false;
        for ch in provisional.chars() {
            if ch == '-' {
                if !last_dash { out.push('-'); }
                last_dash = true;
            } else {
                out.push(ch);
                last_dash = false;
            }
        }
        out
    };
    let trimmed = collapsed.trim_matches('-').to_string();
    if trimmed.is_empty() { "untitled".to_string() } else { trimmed }
}

async fn create_new_essay(
    title: String,
    subtitle: Option<String>,
    config_path: PathBuf,
    essays_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load(&config_path)
        .context("Failed to load configuration")?;

    let essays_directory = essays_dir.unwrap_or_else(|| PathBuf::from(&config.essays_dir));

    std::fs::create_dir_all(&essays_directory)
        .context("Failed to create essays directory")?;

    let slug = sanitize_slug(&title);
    let filename = format!("{}.md", slug);
    let file_path = essays_directory.join(&filename);

    if file_path.exists() {
        eprintln!("{}", format!("Error: File '{}' already exists.", file_path.display()).red());
        process::exit(1);
    }

    let current_date = chrono::Utc::now().format("%b %-d, %Y").to_string();

    let subtitle_block = subtitle
        .as_ref()
        .map(|s| format!("### {}\n\n", s))
        .unwrap_or_default();

    let content = format!(
        "# {}\n\n{}**{}**\n\nWrite your essay here...\n",
        title, subtitle_block, current_date
    );

    std::fs::write(&file_path, content)
        .context("Failed to write new essay file")?;

    println!("{}", "New essay created successfully!".green().bold());
    println!();
    println!("{}: {}", "Title".white().bold(), title.cyan());
    if let Some(sub) = subtitle {
        println!("{}: {}", "Subtitle".white().bold(), sub.cyan());
    }
    println!("{}: {}", "Date".white().bold(), current_date.cyan());
    println!("{}: {}", "File".white().bold(), file_path.display().to_string().cyan());
    println!();
    println!("Next steps:");
    println!("  1. Edit the file: {}", file_path.display().to_string().yellow());
    println!("  2. Generate the index: {}", "quill generate".yellow());
    println!("  3. Read it back: {}", "quill browse".yellow());

    Ok(())
}

async fn upload_archive(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path)
        .context("Failed to load configuration")?;

    let output_dir = PathBuf::from(&config.output_dir);
    let essays_path = output_dir.join(indexer::ESSAYS_DATA_FILE);
    let file_list_path = output_dir.join(indexer::FILE_LIST_FILE);

    if !essays_path.exists() || !file_list_path.exists() {
        eprintln!("{}", format!("Error: Artifacts not found in '{}'. Run 'quill generate' first.", output_dir.display()).red());
        process::exit(1);
    }

    let essays_json = std::fs::read_to_string(&essays_path)
        .with_context(|| format!("Failed to read {}", essays_path.display()))?;
    let file_list_json = std::fs::read_to_string(&file_list_path)
        .with_context(|| format!("Failed to read {}", file_list_path.display()))?;

    if let Err(e) = upload::upload_artifacts(&config, &essays_json, &file_list_json).await {
        eprintln!("{}", format!("Error uploading to S3: {}", e).red());
        process::exit(1);
    }

    println!("{}", "Upload complete!".green().bold());

    Ok(())
}
