use std::error::Error;
use std::ffi::CStr;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::null_mut;
use std::sync::atomic::{AtomicUsize, Ordering};

use libc::{
    __errno_location, c_int, c_void, sigaction, sigemptyset, sighandler_t, siginfo_t, strerror,
    write, STDOUT_FILENO,
};
use log::debug;

macro_rules! interrupt_hint {
    () => {
        "Use 'exit' to quit the shell."
    };
}

pub(crate) const INTERRUPT_HINT: &str = interrupt_hint!();
const INTERRUPT_MESSAGE: &[u8] = concat!("\n", interrupt_hint!(), "\n").as_bytes();

/// Number of SIGINTs seen by `interrupt_handler` since start.
static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, PartialEq)]
pub enum SigError {
    Syscall(c_int),
}

impl fmt::Display for SigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigError::Syscall(error_num) => write!(
                f,
                "{}",
                unsafe { CStr::from_ptr(strerror(*error_num)) }.to_string_lossy()
            ),
        }
    }
}

impl Error for SigError {}

/// Tells the user how to leave while a foreground command runs. The child
/// gets the same SIGINT through the terminal's process group and stops on
/// its own; nothing is forwarded from here.
pub(crate) extern "C" fn interrupt_handler(
    sig: c_int,
    _info: *mut siginfo_t,
    _gdata: *mut c_void,
) {
    if sig == libc::SIGINT {
        INTERRUPTS.fetch_add(1, Ordering::SeqCst);
        unsafe {
            write(
                STDOUT_FILENO,
                INTERRUPT_MESSAGE.as_ptr() as *const c_void,
                INTERRUPT_MESSAGE.len(),
            )
        };
    }
}

/// Compare two readings to learn whether SIGINT arrived in between.
pub(crate) fn interrupt_count() -> usize {
    INTERRUPTS.load(Ordering::SeqCst)
}

pub(crate) fn install_sighandler(
    signum: c_int,
    handler: extern "C" fn(c_int, *mut siginfo_t, *mut c_void),
) -> Result<(), SigError> {
    let mut sa: sigaction = unsafe { MaybeUninit::<sigaction>::zeroed().assume_init() };
    sa.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
    sa.sa_sigaction = handler as sighandler_t;
    unsafe { sigemptyset(&mut sa.sa_mask as *mut _) };

    match unsafe { libc::sigaction(signum, &sa, null_mut()) } {
        -1 => Err(SigError::Syscall(unsafe { *__errno_location() })),
        _ => {
            debug!("installed handler for signal {}", signum);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ptr::null_mut;

    #[test]
    fn test_install_sighandler() {
        assert_eq!(
            super::install_sighandler(libc::SIGINT, super::interrupt_handler),
            Ok(())
        );
    }

    #[test]
    fn test_install_sighandler_rejects_invalid_signal() {
        let result = super::install_sighandler(libc::SIGKILL, super::interrupt_handler);
        assert_eq!(result, Err(super::SigError::Syscall(libc::EINVAL)));
        assert_eq!(result.unwrap_err().to_string(), "Invalid argument");
    }

    #[test]
    fn test_interrupt_message_carries_hint() {
        let message = std::str::from_utf8(super::INTERRUPT_MESSAGE).unwrap();
        assert_eq!(message.trim(), super::INTERRUPT_HINT);
    }

    #[test]
    fn test_interrupt_handler_counts_sigint_only() {
        let before = super::interrupt_count();
        super::interrupt_handler(libc::SIGUSR2, null_mut(), null_mut());
        assert_eq!(super::interrupt_count(), before);

        super::interrupt_handler(libc::SIGINT, null_mut(), null_mut());
        assert!(super::interrupt_count() > before);
    }

    #[test]
    fn test_raised_sigint_reaches_handler() {
        super::install_sighandler(libc::SIGINT, super::interrupt_handler).unwrap();

        let before = super::interrupt_count();
        // raise returns only after the handler ran in this thread
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
        assert!(super::interrupt_count() > before);
    }
}
