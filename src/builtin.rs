use std::io::{self, Write};
use std::path::Path;

use log::debug;

use crate::parser::ArgumentVector;
use crate::session::{Session, WorkingDir};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Builtin {
    Exit,
    Cd,
    Help,
    Hello,
}

impl Builtin {
    pub(crate) const ALL: [Builtin; 4] =
        [Builtin::Cd, Builtin::Exit, Builtin::Help, Builtin::Hello];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Cd => "cd",
            Builtin::Help => "help",
            Builtin::Hello => "hello",
        }
    }

    /// Exact, case-sensitive lookup.
    pub(crate) fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd),
            "help" => Some(Builtin::Help),
            "hello" => Some(Builtin::Hello),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Handled,
    NotHandled,
    Exit,
}

/// Runs `argv` in-process when its program names a builtin.
///
/// Only `argv[0]` is matched; trailing arguments never change which
/// builtin runs. Failures of a builtin are reported on `out` and still
/// count as handled.
pub(crate) fn try_builtin<D: WorkingDir>(
    argv: &ArgumentVector,
    session: &mut Session<D>,
    out: &mut dyn Write,
) -> io::Result<Dispatch> {
    let builtin = match argv.program().and_then(Builtin::lookup) {
        Some(builtin) => builtin,
        None => return Ok(Dispatch::NotHandled),
    };
    debug!("builtin {}", builtin.name());

    match builtin {
        Builtin::Exit => {
            writeln!(out, "\nGoodbye!")?;
            return Ok(Dispatch::Exit);
        }
        Builtin::Cd => change_dir(argv, session, out)?,
        Builtin::Help => {
            writeln!(out, "\nAvailable commands:")?;
            for builtin in Builtin::ALL.iter() {
                writeln!(out, " - {}", builtin.name())?;
            }
        }
        Builtin::Hello => {
            writeln!(out, "\nHello, {}! This is your custom shell.", session.user())?;
        }
    }

    Ok(Dispatch::Handled)
}

fn change_dir<D: WorkingDir>(
    argv: &ArgumentVector,
    session: &mut Session<D>,
    out: &mut dyn Write,
) -> io::Result<()> {
    let target = match argv.arg(1) {
        Some(target) => target,
        None => return writeln!(out, "cd failed: missing directory operand"),
    };

    if let Err(e) = session.dir.change(Path::new(target)) {
        writeln!(out, "cd failed: {}: {}", target, e)?;
    }

    Ok(())
}
