use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use window_embed::commands::CommandHandler;
use window_embed::config::Config;
use window_embed::diagnostics;
use window_embed::events::{ChannelSink, EventSink, WindowInfo};
use window_embed::services::platform::{Backend, Platform};
use window_embed::services::pubsub::EventHub;
use window_embed::services::registry::SessionRegistry;
use window_embed::services::session::SessionParams;
use window_embed::services::window_system::WindowDirectory;

#[derive(Parser, Debug)]
#[command(name = "window-embed")]
#[command(about = "Встраивание окна внешнего приложения в панель окна-хоста")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "embed.toml")]
    config: String,

    /// Режим сухого запуска (без реальных окон)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Принимать команды JSON-строками из stdin (по умолчанию)
    Run,
    /// Показать окна верхнего уровня, сгруппированные по исполняемому файлу
    Windows {
        /// Номер пути из общего списка
        index: Option<usize>,
    },
    /// Выводить путь каждого активированного окна
    Listen,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    // --log-level заменяет и уровень, и фильтр из конфигурации
    let directives = match &args.log_level {
        Some(level) => level.clone(),
        None => format!("{},{}", config.logging.level, config.logging.filter),
    };
    init_tracing(&directives, &config.logging.format)?;

    info!("Запуск window-embed v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let backend = Backend::new(&config, args.dry_run)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&backend, &config).await,
        Command::Windows { index } => list_windows(&backend, index),
        Command::Listen => listen(&backend, &config).await,
    }
}

async fn run(backend: &Backend, config: &Config) -> Result<()> {
    let platform = Platform::assemble(backend, config)?;
    let registry = Arc::new(SessionRegistry::new(platform.context.clone()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn EventSink> = Arc::new(ChannelSink::new(tx));

    let mut handles = Vec::new();
    for watcher in platform.watchers {
        let name = watcher.name();
        handles.push(tokio::spawn(async move {
            if let Err(e) = watcher.run().await {
                error!("Ошибка в {}: {}", name, e);
            }
        }));
    }

    // События сессий печатаются отдельной задачей: sink не блокирует сессию
    handles.push(tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Не удалось сериализовать событие {}: {}", event, e),
            }
        }
    }));

    for session in &config.sessions {
        let params = SessionParams::from_config(session, Arc::clone(&sink));
        if let Err(e) = registry.add(&session.identity, params) {
            warn!("Сессия '{}' из конфигурации пропущена: {}", session.identity, e);
        }
    }

    let handler = CommandHandler::new(Arc::clone(&registry), Arc::clone(&sink));
    info!("Все сервисы запущены, ожидаем команды в stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = handler.handle_line(&line);
                    println!("{}", serde_json::to_string(&response)?);
                }
                Ok(None) => {
                    info!("stdin закрыт");
                    break;
                }
                Err(e) => {
                    error!("Ошибка чтения stdin: {}", e);
                    break;
                }
            }
        }
    }

    info!("Завершение работы...");
    registry.shutdown();

    for handle in handles {
        handle.abort();
    }

    info!("window-embed завершил работу");
    Ok(())
}

fn list_windows(backend: &Backend, index: Option<usize>) -> Result<()> {
    let windows = backend.system().list_windows()?;
    let groups = diagnostics::group_by_path(windows);

    match index {
        None => println!("Окна по исполняемым файлам:{}", diagnostics::format_summary(&groups)),
        Some(index) => match diagnostics::format_details(&groups, index) {
            Ok(details) => println!("{}", details),
            Err(message) => eprintln!("{}", message),
        },
    }
    Ok(())
}

async fn listen(backend: &Backend, config: &Config) -> Result<()> {
    let hub = Arc::new(EventHub::new());
    hub.subscribe(|window: &WindowInfo| {
        info!("Активировано окно: {}", window.path.display());
    });

    let watcher = backend.activation_watcher(Arc::clone(&hub), config);
    let handle = tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            error!("Ошибка отслеживания активации: {}", e);
        }
    });

    signal::ctrl_c().await?;
    info!("Получен сигнал завершения (Ctrl+C)");
    handle.abort();
    Ok(())
}

fn init_tracing(directives: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))?;

    // stdout занят протоколом, логи идут в stderr
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
