pub mod challenge;
pub mod daemon_path;
pub mod output;
pub mod popup;
pub mod process;

use std::{env, path::PathBuf, time::Duration};

use ansi_term::Colour;
use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use output::status_line;
use popup::{PopupController, POLL_PERIOD};
use process::{kill_previous_servers, restart_server};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    daemon::{shutdown::detect_shutdown, start_daemon, DaemonSettings},
    messaging::channel::{Notifier, SocketNotifier},
    storage::{
        entities::FlagsPatch,
        state_store::{FileStateStore, StateStore},
    },
    utils::{
        clock::DefaultClock,
        dir::AppPaths,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "feedblock", version, long_about = None)]
#[command(about = "Hides the home timeline and shows what your focus is worth", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Show whether blocking is on and what it's worth")]
    Status {},
    #[command(about = "Keep showing the money card, refreshed every second")]
    Watch {},
    #[command(about = "Turn feed blocking on")]
    Enable {},
    #[command(about = "Turn feed blocking off. Asks you to type a phrase first")]
    Disable {},
    #[command(about = "Set the annual salary used for the money estimate")]
    Salary { amount: String },
    #[command(about = "Hide other sections of the site")]
    Options {
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        messages: Option<bool>,
        #[arg(long)]
        explore: Option<bool>,
        #[arg(long)]
        post: Option<bool>,
    },
    #[command(about = "Tell the daemon the browser moved to another page")]
    Navigate { path: String },
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(long, default_value = "/home", help = "Page shown when the daemon starts")]
        path: String,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(long, default_value = "/home")]
        path: String,
        #[arg(
            long = "interval-ms",
            default_value_t = 1000,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval_ms: u64,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let paths = AppPaths::resolve(args.dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &paths.logs_dir(), logging_level, args.log)?;

    let controller = PopupController::new(
        FileStateStore::new(paths.dir().to_path_buf())?,
        SocketNotifier::new(paths.socket_file()),
        Box::new(DefaultClock),
    );

    match args.commands {
        Commands::Status {} => {
            let state = controller.load().await;
            println!("{}", status_line(&state));
            match controller.content_status().await {
                Some(reply) => println!("Daemon is running, blocking {}", on_off(reply.enabled)),
                None => println!("{}", Colour::Yellow.paint("Daemon is not running")),
            }
            println!("\n{}", controller.money_card(&state));
            Ok(())
        }
        Commands::Watch {} => {
            controller.load().await;
            let cancel = CancellationToken::new();
            let watch = controller.watch(POLL_PERIOD, cancel.clone(), |state, card| {
                // Clear the screen and move to the top before redrawing.
                print!("\x1B[2J\x1B[H");
                println!("{}\n\n{card}", status_line(state));
            });
            tokio::join!(detect_shutdown(cancel), watch);
            Ok(())
        }
        Commands::Enable {} => {
            let state = controller.enable().await;
            println!("{}", status_line(&state));
            Ok(())
        }
        Commands::Disable {} => disable(&controller).await,
        Commands::Salary { amount } => {
            match controller.set_salary(&amount).await {
                Ok(salary) => println!("Annual salary set to ${salary}"),
                Err(e) => println!("{}", Colour::Red.paint(e.to_string())),
            }
            Ok(())
        }
        Commands::Options {
            notifications,
            messages,
            explore,
            post,
        } => {
            let state = controller
                .update_options(FlagsPatch {
                    block_notifications: notifications,
                    block_messages: messages,
                    block_explore: explore,
                    block_post: post,
                })
                .await;
            let flags = state.flags;
            println!("Notifications hidden: {}", on_off(flags.block_notifications));
            println!("Messages hidden:      {}", on_off(flags.block_messages));
            println!("Explore hidden:       {}", on_off(flags.block_explore));
            println!("Post button hidden:   {}", on_off(flags.block_post));
            Ok(())
        }
        Commands::Navigate { path } => {
            controller.navigate(path).await;
            Ok(())
        }
        Commands::Init { path } => {
            let daemon = to_daemon_path(env::current_exe()?);
            restart_server(&daemon, &paths, &path)?;
            println!("Daemon started");
            Ok(())
        }
        Commands::Stop {} => {
            let daemon = to_daemon_path(env::current_exe()?);
            let stopped = kill_previous_servers(&daemon)?;
            println!("Stopped {stopped} daemons");
            Ok(())
        }
        Commands::Serve { path, interval_ms } => {
            start_daemon(
                paths,
                DaemonSettings {
                    location: path,
                    reconcile_interval: Duration::from_millis(interval_ms),
                },
            )
            .await
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Asks for the challenge phrase until it's typed correctly. An empty line or end of input gives
/// up without changing anything.
async fn disable<S: StateStore, N: Notifier>(controller: &PopupController<S, N>) -> Result<()> {
    let state = controller.load().await;
    if !state.enabled {
        println!("{}", status_line(&state));
        return Ok(());
    }

    let challenge = controller.begin_disable(&mut rand::thread_rng());
    println!("To disable feed blocking, type the following phrase:\n");
    println!("  {}\n", Colour::Yellow.bold().paint(challenge.phrase()));

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(typed) = lines.next_line().await? else {
            break;
        };
        if typed.trim().is_empty() {
            break;
        }
        match controller.confirm_disable(&challenge, &typed).await {
            Ok(state) => {
                println!("{}", status_line(&state));
                return Ok(());
            }
            Err(e) => println!("{}", Colour::Red.paint(e.to_string())),
        }
    }

    info!("Disable cancelled");
    println!("Cancelled, blocking stays on");
    Ok(())
}
