//! Entry point for the **tabtangle** daemon.
//!
//! Started by the browser as a native messaging host, it answers on
//! stdin/stdout and additionally listens on a Unix socket.  With
//! `--simulate` it drives an in-memory desktop instead and only the socket
//! is served, which is handy for trying commands without a browser.
//!
//! Logs go to stderr (`RUST_LOG=debug`); stdout belongs to the browser.

use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::mpsc;
use tabtangle::command::{Bounds, Command, Outcome};
use tabtangle::config::Config;
use tabtangle::dispatcher::ActionDispatcher;
use tabtangle::host::memory::MemoryHost;
use tabtangle::host::native;
use tabtangle::ipc::listener::{default_socket_path, UnixSocketListener};
use tabtangle::store::{JsonFileStore, MemoryStore, Store};
use tabtangle::traits::{CommandSource, WindowHost};

/// `$XDG_<var>` or `$HOME/<fallback>`, joined with `tabtangle`.
fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    let base = std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(fallback)
    });
    base.join("tabtangle")
}

/// Try to load the config from `$XDG_CONFIG_HOME/tabtangle/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = xdg_dir("XDG_CONFIG_HOME", ".config").join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no usable config ({}), using defaults", e);
            Config::default()
        }
    }
}

fn open_store() -> JsonFileStore {
    let path = xdg_dir("XDG_STATE_HOME", ".local/state").join("state.json");
    match JsonFileStore::open(&path) {
        Ok(store) => {
            debug!("state file {}", store.path().display());
            store
        }
        Err(e) => {
            error!("cannot open state file {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    // The browser passes the extension origin as an argument; ignore it.
    let simulate = std::env::args().skip(1).any(|a| a == "--simulate");
    let config = load_config();

    if simulate {
        run_simulated(config);
    } else {
        run_native(config);
    }
}

/// Native messaging mode: the browser is the host.
fn run_native(config: Config) {
    let store = open_store();
    let (host, mut source) = native::channel(std::io::stdin(), std::io::stdout());

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    {
        let tx = cmd_tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = source.run(tx) {
                error!("native messaging error: {}", e);
            }
            // Without the browser there is nothing left to drive.
            info!("browser gone, exiting");
            std::process::exit(0);
        });
    }
    spawn_socket_listener(cmd_tx);

    start_event_loop(ActionDispatcher::new(host, store, config), cmd_rx);
}

/// Simulation mode: a small in-memory desktop, commands over the socket.
fn run_simulated(config: Config) {
    let host = MemoryHost::with_work_area(config.layout.fallback_work_area);
    host.add_window(Bounds::new(60, 40, 1100, 760), &["https://example.com", "https://example.org"]);
    host.add_window(Bounds::new(200, 120, 900, 640), &["https://example.net"]);
    info!("simulating {} window(s)", host.snapshot().len());

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_socket_listener(cmd_tx);

    start_event_loop(ActionDispatcher::new(host, MemoryStore::new(), config), cmd_rx);
}

//  Event loop

fn start_event_loop<H: WindowHost, S: Store>(
    mut dispatcher: ActionDispatcher<H, S>,
    cmd_rx: mpsc::Receiver<Command>,
) {
    info!("tabtangle running");
    for cmd in cmd_rx {
        let name = cmd.to_string();
        match dispatcher.handle(cmd) {
            Ok(Outcome::Skipped(reason)) => debug!("{}: skipped ({})", name, reason),
            Ok(outcome) => info!("{}: {}", name, outcome),
            Err(e) => error!("{} failed: {}", name, e),
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_socket_listener(tx: mpsc::Sender<Command>) {
    let path = default_socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
