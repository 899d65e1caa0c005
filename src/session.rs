use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Where the interpreter currently is in the file system.
pub(crate) trait WorkingDir {
    fn current(&self) -> io::Result<PathBuf>;
    fn change(&mut self, path: &Path) -> io::Result<()>;
}

/// The working directory of the interpreter process itself. Spawned
/// children inherit it.
#[derive(Debug, Default)]
pub(crate) struct ProcessDir;

impl WorkingDir for ProcessDir {
    fn current(&self) -> io::Result<PathBuf> {
        env::current_dir()
    }

    fn change(&mut self, path: &Path) -> io::Result<()> {
        env::set_current_dir(path)
    }
}

#[derive(Debug)]
pub(crate) struct Session<D> {
    pub dir: D,
    user: Option<String>,
}

impl<D: WorkingDir> Session<D> {
    pub(crate) fn new(dir: D, user: Option<String>) -> Self {
        Session { dir, user }
    }

    pub(crate) fn from_env(dir: D) -> Self {
        let user = env::var("USER").or_else(|_| env::var("LOGNAME")).ok();
        Session::new(dir, user)
    }

    /// Empty when the invoking user could not be resolved.
    pub(crate) fn user(&self) -> &str {
        self.user.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::WorkingDir;

    /// In-memory directory tree for exercising builtins.
    #[derive(Debug)]
    pub(crate) struct FakeDir {
        pub cwd: PathBuf,
        pub existing: HashSet<PathBuf>,
        pub broken: bool,
    }

    impl FakeDir {
        pub(crate) fn new(cwd: &str, existing: &[&str]) -> Self {
            FakeDir {
                cwd: PathBuf::from(cwd),
                existing: existing.iter().map(PathBuf::from).collect(),
                broken: false,
            }
        }
    }

    impl WorkingDir for FakeDir {
        fn current(&self) -> io::Result<PathBuf> {
            if self.broken {
                Err(io::Error::new(io::ErrorKind::NotFound, "directory vanished"))
            } else {
                Ok(self.cwd.clone())
            }
        }

        fn change(&mut self, path: &Path) -> io::Result<()> {
            let target = self.cwd.join(path);
            if self.existing.contains(&target) {
                self.cwd = target;
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "No such file or directory",
                ))
            }
        }
    }
}
