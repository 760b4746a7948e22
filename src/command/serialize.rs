use std::fmt::{self, Write};

use super::types::Command;

/// Write a command with arguments directly to a formatter.
/// The last argument is treated as trailing and gets a `:` prefix if needed.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;

    let Some((trailing, middle_params)) = args.split_last() else {
        return Ok(());
    };

    for param in middle_params {
        f.write_char(' ')?;
        f.write_str(param)?;
    }

    f.write_char(' ')?;
    if trailing.is_empty() || trailing.contains(' ') || trailing.starts_with(':') {
        f.write_char(':')?;
    }
    f.write_str(trailing)
}

/// Write a command with a freeform (always colon-prefixed) trailing argument.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    match args.split_last() {
        Some((suffix, middle)) => {
            f.write_str(cmd)?;
            for arg in middle {
                f.write_char(' ')?;
                f.write_str(arg)?;
            }
            f.write_str(" :")?;
            f.write_str(suffix)
        }
        None => f.write_str(cmd),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, r) => write_cmd_freeform(f, "USER", &[u, "0", "*", r]),
            Command::JOIN(c) => write_cmd(f, "JOIN", &[&c.join(",")]),
            Command::PART(c, Some(m)) => write_cmd_freeform(f, "PART", &[&c.join(","), m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[&c.join(",")]),
            Command::KICK(c, n, Some(r)) => write_cmd_freeform(f, "KICK", &[c, n, r]),
            Command::KICK(c, n, None) => write_cmd(f, "KICK", &[c, n]),
            Command::PRIVMSG(t, m) => write_cmd_freeform(f, "PRIVMSG", &[t, m]),
            Command::NAMES(c) => write_cmd(f, "NAMES", &[c]),
            Command::QUIT(Some(m)) => write_cmd_freeform(f, "QUIT", &[m]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::PONG(t) => write_cmd_freeform(f, "PONG", &[t]),
            Command::Raw(line) => f.write_str(line),
        }
    }
}
