//! Structured remote commands.
//!
//! Commands are kept as an argument vector and only rendered to a shell
//! string at the exec boundary, with every argument single-quoted, so
//! credentials and database names cannot break out of their argument.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `--name=value` when a value is present.
    pub fn opt_flag(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(format!("--{name}={value}")),
            None => self,
        }
    }

    /// Route the command through `docker exec <container>` when a container is set.
    pub fn in_container(self, container: Option<&str>) -> Self {
        let Some(container) = container else {
            return self;
        };

        let mut args = vec!["exec".to_string(), container.to_string(), self.program];
        args.extend(self.args);
        Self {
            program: "docker".to_string(),
            args,
        }
    }

    /// Render as a single POSIX shell command line.
    pub fn to_shell(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| shell_quote(part))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render for logs, with anything that looks like a password masked.
    pub fn redacted(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|arg| {
                if arg.starts_with("--password=") {
                    "--password=***".to_string()
                } else {
                    arg.clone()
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

fn shell_quote(part: &str) -> String {
    let safe = !part.is_empty()
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:@,+".contains(&b));
    if safe {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}
