pub mod builtin;
pub mod config;
pub mod execution;
pub mod input;
pub mod interpreter;
pub mod parser;
pub mod session;
pub mod sig;

use std::error::Error;
use std::io;

use env_logger::Env;
use log::{info, warn};

use crate::config::Config;
use crate::execution::ForkLauncher;
use crate::input::Editor;
use crate::interpreter::Interpreter;
use crate::session::{ProcessDir, Session};
use crate::sig::{install_sighandler, interrupt_handler};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().filter_or("STSH_LOG", "warn")).init();

    let config: Config = argh::from_env();
    install_sighandler(libc::SIGINT, interrupt_handler)?;

    let editor = Editor::new(config.history.clone())?;
    let mut shell = Interpreter::new(
        editor,
        ForkLauncher::default(),
        Session::from_env(ProcessDir),
        config.limits(),
        io::stdout(),
    );

    if !config.no_banner {
        if let Err(e) = shell.banner() {
            warn!("writing banner failed: {}", e);
        }
    }

    shell.run();
    shell.input_mut().save_history();
    info!("leaving");

    Ok(())
}
