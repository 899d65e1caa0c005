use std::error::Error;
use std::ffi::{CStr, CString, NulError};
use std::fmt;
use std::ptr::null;

use libc::{
    __errno_location, _exit, c_char, c_int, c_void, close, dup2, execvp, fork, pid_t, pipe2,
    signal, strerror, waitpid, write, EINTR, O_CLOEXEC, SIGPIPE, SIG_DFL, STDERR_FILENO,
    STDIN_FILENO, STDOUT_FILENO,
};
use log::{debug, warn};

use crate::parser::ArgumentVector;

/// Exit status of a child whose program could not be executed.
pub(crate) const EXIT_NOT_FOUND: c_int = 127;
const EXIT_REDIRECT_FAILED: c_int = 126;

#[derive(Debug)]
pub enum ExecutionError {
    Syscall(c_int),
    InvalidArgument(NulError),
    EmptyCommand,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Syscall(error_num) => write!(
                f,
                "{}",
                unsafe { CStr::from_ptr(strerror(*error_num)) }.to_string_lossy()
            ),
            ExecutionError::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
            ExecutionError::EmptyCommand => write!(f, "empty command"),
        }
    }
}

impl Error for ExecutionError {}

impl From<NulError> for ExecutionError {
    fn from(e: NulError) -> Self {
        ExecutionError::InvalidArgument(e)
    }
}

fn last_error() -> ExecutionError {
    ExecutionError::Syscall(unsafe { *__errno_location() })
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum ExitStatus {
    Exited(c_int),
    Signaled(c_int),
}

impl ExitStatus {
    fn from_raw(status: c_int) -> ExitStatus {
        if libc::WIFSIGNALED(status) {
            ExitStatus::Signaled(libc::WTERMSIG(status))
        } else {
            ExitStatus::Exited(libc::WEXITSTATUS(status))
        }
    }
}

/// One spawned process. `status` is set once it has been reaped.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) struct ChildProcess {
    pub pid: pid_t,
    pub status: Option<ExitStatus>,
}

impl ChildProcess {
    fn spawned(pid: pid_t) -> Self {
        ChildProcess { pid, status: None }
    }

    /// Blocks until exactly this child has terminated.
    fn wait(&mut self) -> Result<ExitStatus, ExecutionError> {
        let mut raw: c_int = 0;
        loop {
            match unsafe { waitpid(self.pid, &mut raw, 0) } {
                -1 if unsafe { *__errno_location() } == EINTR => continue,
                -1 => return Err(last_error()),
                _ => break,
            }
        }

        let status = ExitStatus::from_raw(raw);
        debug!("reaped {} with {:?}", self.pid, status);
        self.status = Some(status);
        Ok(status)
    }
}

/// Everything a child needs between `fork` and `exec`, prepared up front
/// so the child does not allocate.
struct Program {
    _args: Vec<CString>,
    argv: Vec<*const c_char>,
    not_found: Vec<u8>,
}

impl Program {
    fn new(argv: &ArgumentVector) -> Result<Program, ExecutionError> {
        let name = argv.program().ok_or(ExecutionError::EmptyCommand)?;
        let args = argv.to_cstrings()?;
        let mut ptrs: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
        ptrs.push(null());

        Ok(Program {
            not_found: format!("Command not found: {}\n", name).into_bytes(),
            _args: args,
            argv: ptrs,
        })
    }
}

/// Replaces the image of a freshly forked child. Only async-signal-safe
/// calls happen here.
unsafe fn exec_child(
    program: &Program,
    stdin: Option<c_int>,
    stdout: Option<c_int>,
    unused: &[c_int],
) -> ! {
    if let Some(fd) = stdin {
        if dup2(fd, STDIN_FILENO) == -1 {
            _exit(EXIT_REDIRECT_FAILED);
        }
    }
    if let Some(fd) = stdout {
        if dup2(fd, STDOUT_FILENO) == -1 {
            _exit(EXIT_REDIRECT_FAILED);
        }
    }
    for &fd in unused {
        if fd > STDERR_FILENO {
            close(fd);
        }
    }

    // ignored dispositions survive exec and the Rust runtime ignores SIGPIPE
    signal(SIGPIPE, SIG_DFL);

    execvp(program.argv[0], program.argv.as_ptr());

    write(
        STDERR_FILENO,
        program.not_found.as_ptr() as *const c_void,
        program.not_found.len(),
    );
    _exit(EXIT_NOT_FOUND)
}

fn spawn(
    program: &Program,
    stdin: Option<c_int>,
    stdout: Option<c_int>,
    unused: &[c_int],
) -> Result<ChildProcess, ExecutionError> {
    match unsafe { fork() } {
        -1 => Err(last_error()),
        0 => unsafe { exec_child(program, stdin, stdout, unused) },
        pid => {
            debug!("spawned {}", pid);
            Ok(ChildProcess::spawned(pid))
        }
    }
}

/// Both ends of an anonymous pipe, closed on drop unless already closed.
struct Pipe {
    read: c_int,
    write: c_int,
}

impl Pipe {
    fn new() -> Result<Pipe, ExecutionError> {
        let mut filedes: [c_int; 2] = [-1, -1];
        match unsafe { pipe2(filedes.as_mut_ptr(), O_CLOEXEC) } {
            -1 => Err(last_error()),
            _ => Ok(Pipe {
                read: filedes[0],
                write: filedes[1],
            }),
        }
    }

    fn close(&mut self) {
        for &fd in [self.read, self.write].iter() {
            if fd != -1 {
                unsafe { close(fd) };
            }
        }
        self.read = -1;
        self.write = -1;
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close();
    }
}

/// Starts external programs for the interpreter and waits for them.
pub(crate) trait Launcher {
    fn run(&mut self, argv: &ArgumentVector) -> Result<Vec<ChildProcess>, ExecutionError>;
    fn run_piped(
        &mut self,
        left: &ArgumentVector,
        right: &ArgumentVector,
    ) -> Result<Vec<ChildProcess>, ExecutionError>;
}

/// Launches programs with `fork`/`execvp`, inheriting the standard streams
/// of the interpreter.
#[derive(Debug, Default)]
pub(crate) struct ForkLauncher {
    output: Option<c_int>,
}

impl ForkLauncher {
    /// A launcher whose last stage writes to `fd` instead of the inherited
    /// standard output. The descriptor stays owned by the caller.
    #[cfg(test)]
    pub(crate) fn with_output(fd: c_int) -> Self {
        ForkLauncher { output: Some(fd) }
    }
}

impl Launcher for ForkLauncher {
    fn run(&mut self, argv: &ArgumentVector) -> Result<Vec<ChildProcess>, ExecutionError> {
        let program = Program::new(argv)?;

        let mut child = spawn(&program, None, self.output, &[])?;
        child.wait()?;

        Ok(vec![child])
    }

    fn run_piped(
        &mut self,
        left: &ArgumentVector,
        right: &ArgumentVector,
    ) -> Result<Vec<ChildProcess>, ExecutionError> {
        let left = Program::new(left)?;
        let right = Program::new(right)?;

        let mut pipe = Pipe::new()?;
        let ends = [pipe.read, pipe.write];

        let mut producer = spawn(&left, None, Some(pipe.write), &ends)?;
        let consumer = spawn(&right, Some(pipe.read), self.output, &ends);

        // the consumer only sees end of input once no write end is left open here
        pipe.close();

        let mut consumer = match consumer {
            Ok(consumer) => consumer,
            Err(e) => {
                if let Err(wait_error) = producer.wait() {
                    warn!("reaping {} failed: {}", producer.pid, wait_error);
                }
                return Err(e);
            }
        };

        let producer_status = producer.wait();
        let consumer_status = consumer.wait();
        producer_status?;
        consumer_status?;

        Ok(vec![producer, consumer])
    }
}
