//! MySQL client commands and output parsing.

use crate::config::DatabaseEntryConfig;
use crate::remote::RemoteCommand;
use std::collections::HashSet;

/// Names never dumped: the listing header, blank lines and system schemas.
pub const BUILTIN_EXCLUDES: [&str; 6] = [
    "",
    "Database",
    "mysql",
    "information_schema",
    "performance_schema",
    "sys",
];

fn with_credentials(program: &str, entry: &DatabaseEntryConfig) -> RemoteCommand {
    RemoteCommand::new(program)
        .opt_flag("host", entry.host.as_deref())
        .opt_flag("user", entry.user.as_deref())
        .opt_flag("password", entry.password.as_deref())
}

pub fn list_databases_command(entry: &DatabaseEntryConfig) -> RemoteCommand {
    with_credentials(&entry.mysql_path, entry)
        .arg("--execute=show databases;")
        .in_container(entry.docker_container.as_deref())
}

pub fn dump_command(entry: &DatabaseEntryConfig, database: &str) -> RemoteCommand {
    with_credentials(&entry.mysqldump_path, entry)
        .arg(database)
        .in_container(entry.docker_container.as_deref())
}

/// Parse `show databases` output into the names to dump, in listing order.
pub fn filter_databases(output: &str, exclude: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    output
        .lines()
        .map(str::trim)
        .filter(|name| !BUILTIN_EXCLUDES.contains(name))
        .filter(|name| !exclude.iter().any(|e| e == name))
        .filter(|name| seen.insert(*name))
        .map(String::from)
        .collect()
}
