use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::datastore::KvStore;
use crate::filter::FilterMode;
use crate::render::{Renderer, printable};
use crate::state::{NoOp, Outcome, Session};
use crate::theme::ThemePreference;

const COMMANDS: [&str; 9] = [
    "add", "toggle", "delete", "move", "list", "theme", "shell", "help", "version",
];

const ALIASES: [(&str, &str); 3] = [("done", "toggle"), ("rm", "delete"), ("ls", "list")];

pub fn expand_command_abbrev<'k>(token: &str, known: &[&'k str]) -> Option<&'k str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Exact alias first, then a unique prefix of a command name.
pub fn resolve_command(token: &str) -> Option<&'static str> {
    if let Some((_, full)) = ALIASES.iter().find(|(alias, _)| *alias == token) {
        return Some(*full);
    }
    expand_command_abbrev(token, &COMMANDS)
}

/// Where a command reads interactive input from and writes its output to.
pub struct Console<R, W> {
    pub input: R,
    pub out: W,
    pub prompt: bool,
}

#[instrument(skip(session, renderer, inv, console), fields(command = %inv.command))]
pub fn dispatch<S, R, W>(
    session: &mut Session<S>,
    renderer: &Renderer,
    inv: &Invocation,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    S: KvStore,
    R: BufRead,
    W: Write,
{
    debug!(args = ?inv.command_args, filter = %session.filter(), "dispatching command");

    match inv.command.as_str() {
        "shell" => run_shell(session, renderer, console),
        "help" => cmd_help(&mut console.out),
        "version" => {
            writeln!(console.out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        command => {
            execute(session, renderer, command, &inv.command_args, &mut console.out)?;
            Ok(())
        }
    }
}

/// Runs one task intent. Returns whether the task list changed.
fn execute<S: KvStore, W: Write>(
    session: &mut Session<S>,
    renderer: &Renderer,
    command: &str,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<bool> {
    match command {
        "add" => cmd_add(session, &args.join(" "), out),
        "toggle" => cmd_toggle(session, args, out),
        "delete" => cmd_delete(session, args, out),
        "move" => cmd_move(session, args, out),
        "list" => cmd_list(session, renderer, args, out).map(|()| false),
        "theme" => cmd_theme(session, args, out).map(|()| false),
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// `text` is stored as given apart from trimming; callers must not
/// re-split it.
#[instrument(skip(session, text, out))]
fn cmd_add<S: KvStore, W: Write>(
    session: &mut Session<S>,
    text: &str,
    out: &mut W,
) -> anyhow::Result<bool> {
    info!("command add");

    let (outcome, id) = session.add(text);
    let Some(id) = id.filter(|_| outcome.is_applied()) else {
        return report_ignored(outcome, text, out);
    };

    let position = session.visible().iter().position(|task| task.id == id);
    match position {
        Some(idx) => writeln!(out, "Added task {}.", idx + 1)?,
        None => writeln!(out, "Added task {}.", &id.simple().to_string()[..8])?,
    }
    Ok(true)
}

#[instrument(skip(session, args, out))]
fn cmd_toggle<S: KvStore, W: Write>(
    session: &mut Session<S>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<bool> {
    info!("command toggle");

    let token = single_reference(args, "toggle")?;
    let Some(id) = session.resolve(token) else {
        return report_ignored(Outcome::Ignored(NoOp::UnknownTask), token, out);
    };

    let outcome = session.toggle(id);
    if !outcome.is_applied() {
        return report_ignored(outcome, token, out);
    }

    let state = session
        .tasks()
        .get(id)
        .map(|task| if task.completed { "done" } else { "open" })
        .unwrap_or("gone");
    writeln!(out, "Toggled task {token}: now {state}.")?;
    Ok(true)
}

#[instrument(skip(session, args, out))]
fn cmd_delete<S: KvStore, W: Write>(
    session: &mut Session<S>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<bool> {
    info!("command delete");

    let token = single_reference(args, "delete")?;
    let Some(id) = session.resolve(token) else {
        return report_ignored(Outcome::Ignored(NoOp::UnknownTask), token, out);
    };
    let text = session
        .tasks()
        .get(id)
        .map(|task| task.text.clone())
        .unwrap_or_default();

    let outcome = session.delete(id);
    if !outcome.is_applied() {
        return report_ignored(outcome, token, out);
    }

    writeln!(out, "Deleted task '{}'.", printable(&text))?;
    Ok(true)
}

/// `move <from> [<to>]`, 1-based positions in the current filtered view. A
/// missing destination is a cancelled move.
#[instrument(skip(session, args, out))]
fn cmd_move<S: KvStore, W: Write>(
    session: &mut Session<S>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<bool> {
    info!("command move");

    let (source, destination) = match args {
        [from] => (parse_position(from)?, None),
        [from, to] => (parse_position(from)?, Some(parse_position(to)?)),
        _ => return Err(anyhow!("move expects <from> [<to>]")),
    };

    let outcome = session.reorder(source - 1, destination.map(|to| to - 1));
    let label = args.join(" ");
    if !outcome.is_applied() {
        return report_ignored(outcome, &label, out);
    }

    if let Some(to) = destination {
        writeln!(out, "Moved task {source} to {to}.")?;
    }
    Ok(true)
}

#[instrument(skip(session, renderer, args, out))]
fn cmd_list<S: KvStore, W: Write>(
    session: &mut Session<S>,
    renderer: &Renderer,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    match args {
        [] => {}
        [mode] => session.set_filter(mode.parse::<FilterMode>()?),
        _ => return Err(anyhow!("list takes at most one filter mode")),
    }

    render_session(session, renderer, out)
}

#[instrument(skip(session, args, out))]
fn cmd_theme<S: KvStore, W: Write>(
    session: &mut Session<S>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    match args {
        [] => {
            writeln!(out, "Theme: {}.", session.theme())?;
        }
        [word] if word.eq_ignore_ascii_case("toggle") => {
            let theme = session.toggle_theme();
            writeln!(out, "Theme set to {theme}.")?;
        }
        [word] => {
            let theme = word.parse::<ThemePreference>()?;
            session.set_theme(theme);
            writeln!(out, "Theme set to {theme}.")?;
        }
        _ => return Err(anyhow!("theme expects light, dark or toggle")),
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: add <text>, toggle|done <ref>, delete|rm <ref>, move <from> [<to>], \
         list|ls [all|active|completed], theme [light|dark|toggle], shell, help, version"
    )?;
    writeln!(
        out,
        "A <ref> is a position in the visible list or an id prefix (at least 4 hex digits)."
    )?;
    Ok(())
}

fn shell_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    cmd_help(out)?;
    writeln!(
        out,
        "In the shell: filter <mode> switches the visible list, quit or exit leaves, \
         and any other line is added as a new task."
    )?;
    Ok(())
}

/// Interactive loop over one session. The filter mode lives as long as the
/// loop does.
#[instrument(skip_all)]
fn run_shell<S, R, W>(
    session: &mut Session<S>,
    renderer: &Renderer,
    console: &mut Console<R, W>,
) -> anyhow::Result<()>
where
    S: KvStore,
    R: BufRead,
    W: Write,
{
    info!("starting interactive session");
    render_session(session, renderer, &mut console.out)?;

    let mut line = String::new();
    loop {
        if console.prompt {
            write!(console.out, "todo> ")?;
            console.out.flush()?;
        }

        line.clear();
        let read = console
            .input
            .read_line(&mut line)
            .context("failed reading input")?;
        if read == 0 {
            debug!("end of input");
            break;
        }

        let words: Vec<String> = line.split_whitespace().map(ToString::to_string).collect();
        let Some((first, rest)) = words.split_first() else {
            render_session(session, renderer, &mut console.out)?;
            continue;
        };

        let result = match first.as_str() {
            "quit" | "exit" => break,
            "filter" => shell_filter(session, renderer, rest, &mut console.out),
            "help" => shell_help(&mut console.out),
            word => match shell_command(word) {
                Some("shell") => {
                    writeln!(console.out, "Already in a session.")?;
                    Ok(())
                }
                Some("version") => {
                    writeln!(console.out, "{}", env!("CARGO_PKG_VERSION"))?;
                    Ok(())
                }
                Some("add") => {
                    let trimmed = line.trim_start();
                    let text = trimmed.strip_prefix(first.as_str()).unwrap_or(trimmed);
                    shell_add(session, renderer, text, &mut console.out)
                }
                Some(command) => {
                    shell_intent(session, renderer, command, rest, &mut console.out)
                }
                None => shell_add(session, renderer, &line, &mut console.out),
            },
        };

        if let Err(err) = result {
            warn!(error = %format!("{err:#}"), "shell command failed");
            writeln!(console.out, "error: {err:#}")?;
        }
    }

    info!("interactive session finished");
    Ok(())
}

/// Only exact names and aliases count in the shell; anything else is text
/// for a new task.
fn shell_command(word: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .copied()
        .find(|name| *name == word)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == word)
                .map(|(_, full)| *full)
        })
}

fn shell_intent<S: KvStore, W: Write>(
    session: &mut Session<S>,
    renderer: &Renderer,
    command: &str,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let changed = execute(session, renderer, command, args, out)?;
    if changed {
        render_session(session, renderer, out)?;
    }
    Ok(())
}

/// Adds the raw remainder of a shell line so interior whitespace survives.
fn shell_add<S: KvStore, W: Write>(
    session: &mut Session<S>,
    renderer: &Renderer,
    text: &str,
    out: &mut W,
) -> anyhow::Result<()> {
    if cmd_add(session, text, out)? {
        render_session(session, renderer, out)?;
    }
    Ok(())
}

fn shell_filter<S: KvStore, W: Write>(
    session: &mut Session<S>,
    renderer: &Renderer,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let [mode] = args else {
        return Err(anyhow!("filter expects all, active or completed"));
    };
    session.set_filter(mode.parse::<FilterMode>()?);
    render_session(session, renderer, out)
}

fn render_session<S: KvStore, W: Write>(
    session: &Session<S>,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()> {
    renderer.print_view(
        out,
        &session.visible(),
        session.filter(),
        session.tasks().counts(),
        session.theme(),
    )
}

fn report_ignored<W: Write>(outcome: Outcome, subject: &str, out: &mut W) -> anyhow::Result<bool> {
    match outcome {
        Outcome::Applied => Ok(true),
        Outcome::Ignored(NoOp::UnknownTask) => {
            writeln!(out, "Nothing to do: no task matches '{subject}'.")?;
            Ok(false)
        }
        Outcome::Ignored(NoOp::NoDestination) => {
            writeln!(out, "Move cancelled.")?;
            Ok(false)
        }
        Outcome::Ignored(reason) => {
            writeln!(out, "Nothing to do: {reason}.")?;
            Ok(false)
        }
    }
}

fn single_reference<'a>(args: &'a [String], command: &str) -> anyhow::Result<&'a str> {
    match args {
        [token] => Ok(token.as_str()),
        _ => Err(anyhow!("{command} expects exactly one task reference")),
    }
}

fn parse_position(token: &str) -> anyhow::Result<usize> {
    match token.parse::<usize>() {
        Ok(position) if position >= 1 => Ok(position),
        _ => Err(anyhow!("expected a position starting at 1, got: {token}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{COMMANDS, expand_command_abbrev, resolve_command, shell_command};

    #[test]
    fn abbreviations_resolve_only_when_unique() {
        assert_eq!(expand_command_abbrev("mo", &COMMANDS), Some("move"));
        assert_eq!(expand_command_abbrev("t", &COMMANDS), None);
        assert_eq!(expand_command_abbrev("th", &COMMANDS), Some("theme"));
        assert_eq!(expand_command_abbrev("add", &COMMANDS), Some("add"));
        assert_eq!(resolve_command("done"), Some("toggle"));
        assert_eq!(resolve_command("ls"), Some("list"));
        assert_eq!(resolve_command("he"), Some("help"));
        assert_eq!(resolve_command(""), None);
    }

    #[test]
    fn shell_takes_exact_words_only() {
        assert_eq!(shell_command("add"), Some("add"));
        assert_eq!(shell_command("rm"), Some("delete"));
        assert_eq!(shell_command("buy"), None);
        assert_eq!(shell_command("mov"), None);
    }
}
