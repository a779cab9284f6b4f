//! Selection and verbosity of the running test binary.
//!
//! A delegated run must reproduce what the caller asked for, so the
//! selection pattern and verbosity are read back from the process
//! arguments. Both `-name` and `--name` spellings are accepted, with the
//! value either attached (`-run=Foo`) or in the next argument
//! (`-run Foo`).

const RUN_FLAGS: [&str; 2] = ["test.run", "run"];
const VERBOSE_FLAGS: [&str; 2] = ["test.v", "v"];

/// Runner flags found on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerFlags {
    /// Selection pattern, empty when none was given.
    pub selection: String,
    /// Whether verbose output was requested.
    pub verbose: bool,
}

impl RunnerFlags {
    /// Reads the flags of the current process.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    /// Reads the flags from `args` (without the program name). Later
    /// occurrences win.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let mut flags = Self::default();
        let mut i = 0;
        while i < args.len() {
            let Some(flag) = strip_dashes(&args[i]) else {
                i += 1;
                continue;
            };
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (flag, None),
            };

            if RUN_FLAGS.contains(&name) {
                if let Some(value) = inline {
                    value.clone_into(&mut flags.selection);
                } else if let Some(value) = args.get(i + 1) {
                    flags.selection.clone_from(value);
                    i += 1;
                }
            } else if VERBOSE_FLAGS.contains(&name) {
                flags.verbose = inline.is_none_or(parse_bool);
            }
            i += 1;
        }
        flags
    }
}

fn strip_dashes(arg: &str) -> Option<&str> {
    let rest = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    (!rest.is_empty() && !rest.starts_with('-')).then_some(rest)
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}
