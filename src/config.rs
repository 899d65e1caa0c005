use std::path::PathBuf;

use argh::FromArgs;

pub(crate) const DEFAULT_MAX_LINE_LEN: usize = 1000;
pub(crate) const DEFAULT_MAX_ARGS: usize = 100;

#[derive(FromArgs, Debug)]
/// A minimal interactive shell with builtins and single-pipe pipelines.
pub(crate) struct Config {
    /// longest accepted input line in characters; longer lines are rejected
    #[argh(option, default = "DEFAULT_MAX_LINE_LEN")]
    pub max_line: usize,

    /// most tokens accepted per pipeline stage; larger stages are rejected
    #[argh(option, default = "DEFAULT_MAX_ARGS")]
    pub max_args: usize,

    /// file the recall history is loaded from and saved to
    #[argh(option)]
    pub history: Option<PathBuf>,

    /// do not print the welcome banner
    #[argh(switch)]
    pub no_banner: bool,
}

impl Config {
    pub(crate) fn limits(&self) -> Limits {
        Limits {
            max_line_len: self.max_line,
            max_args: self.max_args,
        }
    }
}

/// Parse-time safety caps for a single input line.
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) struct Limits {
    pub max_line_len: usize,
    pub max_args: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_args: DEFAULT_MAX_ARGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use argh::FromArgs;
    use std::path::PathBuf;

    use super::{Config, Limits};

    #[test]
    fn test_defaults() {
        let config = Config::from_args(&["stsh"], &[]).unwrap();
        assert_eq!(config.limits(), Limits::default());
        assert_eq!(config.history, None);
        assert!(!config.no_banner);
    }

    #[test]
    fn test_flags() {
        let config = Config::from_args(
            &["stsh"],
            &[
                "--max-line",
                "80",
                "--max-args",
                "8",
                "--history",
                "/tmp/stsh_history",
                "--no-banner",
            ],
        )
        .unwrap();

        assert_eq!(
            config.limits(),
            Limits {
                max_line_len: 80,
                max_args: 8
            }
        );
        assert_eq!(config.history, Some(PathBuf::from("/tmp/stsh_history")));
        assert!(config.no_banner);
    }

    #[test]
    fn test_rejects_non_numeric_limit() {
        assert!(Config::from_args(&["stsh"], &["--max-args", "many"]).is_err());
    }
}
