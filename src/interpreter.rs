use std::io::{self, Write};

use log::{debug, error, info, warn};

use crate::builtin::{self, Dispatch};
use crate::config::Limits;
use crate::execution::Launcher;
use crate::input::{Input, LineSource};
use crate::parser::{self, ArgumentVector, ParseError, PipelineStages};
use crate::session::{Session, WorkingDir};
use crate::sig::{self, INTERRUPT_HINT};

const PROMPT: &str = ">>> ";

/// What to do with one input line after tokenizing and builtin dispatch.
#[derive(Debug, PartialEq)]
pub(crate) enum ExecutionPlan {
    None,
    Exit,
    Single(ArgumentVector),
    Piped(ArgumentVector, ArgumentVector),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Interpreter<I, L, D, W> {
    input: I,
    launcher: L,
    session: Session<D>,
    limits: Limits,
    out: W,
}

impl<I, L, D, W> Interpreter<I, L, D, W>
where
    I: LineSource,
    L: Launcher,
    D: WorkingDir,
    W: Write,
{
    pub(crate) fn new(input: I, launcher: L, session: Session<D>, limits: Limits, out: W) -> Self {
        Interpreter {
            input,
            launcher,
            session,
            limits,
            out,
        }
    }

    pub(crate) fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub(crate) fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n************ WELCOME TO STSH ************")?;
        writeln!(self.out, "Use 'help' to see available commands, 'exit' to quit.")?;
        writeln!(self.out, "User: @{}", self.session.user())?;
        writeln!(self.out, "*****************************************")
    }

    /// Reads and executes lines until `exit` or the end of input.
    pub(crate) fn run(&mut self) {
        while self.step() == Flow::Continue {}
    }

    /// One prompt and one line. Output that can no longer be written ends
    /// the session like the end of input does.
    pub(crate) fn step(&mut self) -> Flow {
        match self.try_step() {
            Ok(flow) => flow,
            Err(e) => {
                error!("writing output failed: {}", e);
                Flow::Exit
            }
        }
    }

    fn try_step(&mut self) -> io::Result<Flow> {
        self.print_dir()?;

        match self.input.read_line(PROMPT) {
            Ok(Input::Line(line)) => self.execute_line(&line),
            Ok(Input::Interrupted) => {
                writeln!(self.out, "{}", INTERRUPT_HINT)?;
                Ok(Flow::Continue)
            }
            Ok(Input::Eof) => {
                info!("end of input");
                Ok(Flow::Exit)
            }
            Err(e) => {
                error!("{}", e);
                Ok(Flow::Exit)
            }
        }
    }

    fn print_dir(&mut self) -> io::Result<()> {
        match self.session.dir.current() {
            Ok(dir) => writeln!(self.out, "\nDir: {}", dir.display())?,
            Err(e) => writeln!(self.out, "\ncould not read current directory: {}", e)?,
        }
        self.out.flush()
    }

    pub(crate) fn execute_line(&mut self, line: &str) -> io::Result<Flow> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        let plan = match self.plan(line) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("rejected line: {}", e);
                writeln!(self.out, "stsh: {}", e)?;
                return Ok(Flow::Continue);
            }
        };
        debug!("plan {:?}", plan);
        self.out.flush()?;

        let interrupts = sig::interrupt_count();

        let launched = match &plan {
            ExecutionPlan::Exit => return Ok(Flow::Exit),
            ExecutionPlan::None => return Ok(Flow::Continue),
            ExecutionPlan::Single(argv) => self.launcher.run(argv),
            ExecutionPlan::Piped(left, right) => self.launcher.run_piped(left, right),
        };

        match launched {
            Ok(children) => {
                for child in children {
                    debug!("child {} finished with {:?}", child.pid, child.status);
                }
            }
            Err(e) => writeln!(self.out, "stsh: launching failed: {}", e)?,
        }
        if sig::interrupt_count() != interrupts {
            info!("interrupted while waiting for {:?}", plan);
        }

        Ok(Flow::Continue)
    }

    /// Tokenizes `line` and gives builtins the first stage.
    pub(crate) fn plan(&mut self, line: &str) -> Result<ExecutionPlan, PlanError> {
        parser::check_line(line, &self.limits)?;

        let max_args = self.limits.max_args;
        let stages = parser::split_pipe(line);
        debug!("piped: {}", stages.is_piped());

        let (first, second) = match stages {
            PipelineStages::Single(stage) => (parser::split_whitespace(stage, max_args)?, None),
            PipelineStages::Piped(left, right) => (
                parser::split_whitespace(left, max_args)?,
                Some(parser::split_whitespace(right, max_args)?),
            ),
        };

        if first.is_empty() {
            return Ok(ExecutionPlan::None);
        }

        match builtin::try_builtin(&first, &mut self.session, &mut self.out)? {
            Dispatch::Exit => return Ok(ExecutionPlan::Exit),
            Dispatch::Handled => return Ok(ExecutionPlan::None),
            Dispatch::NotHandled => {}
        }

        Ok(match second {
            None => ExecutionPlan::Single(first),
            Some(second) if second.is_empty() => ExecutionPlan::None,
            Some(second) => ExecutionPlan::Piped(first, second),
        })
    }
}

#[derive(Debug)]
pub(crate) enum PlanError {
    Parse(ParseError),
    Io(io::Error),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Parse(e) => write!(f, "{}", e),
            PlanError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<ParseError> for PlanError {
    fn from(e: ParseError) -> Self {
        PlanError::Parse(e)
    }
}

impl From<io::Error> for PlanError {
    fn from(e: io::Error) -> Self {
        PlanError::Io(e)
    }
}
