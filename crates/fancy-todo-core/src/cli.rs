use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::filter::FilterMode;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todo",
    version,
    about = "Fancy Todo: a small persistent task list",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "todorc")]
    pub todorc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Which tasks positions refer to: all, active or completed.
    #[arg(
        long = "filter",
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<FilterMode>())
    )]
    pub filter: FilterMode,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

/// Log lines go to stderr so command output on stdout stays clean.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` and `rc.KEY:VALUE` tokens out of the raw argument
/// list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let text = arg.to_string_lossy();
        let parsed = text
            .strip_prefix("rc.")
            .and_then(|rest| rest.split_once(['=', ':']))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (format!("rc.{key}"), value.to_string()));

        match parsed {
            Some((key, value)) => {
                debug!(key = %key, value = %value, "captured positional rc override");
                overrides.push((key, value));
            }
            None => cleaned.push(arg),
        }
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let Some((first, args)) = tokens.split_first() else {
            let cmd = cfg.default_command();
            debug!(command = %cmd, "no explicit command, using default");
            return Self::from_words(&cmd, vec![]);
        };

        Self::from_words(first, args.to_vec())
    }

    /// Resolves the command word (aliases and unique prefixes allowed).
    pub fn from_words(command: &str, command_args: Vec<String>) -> anyhow::Result<Self> {
        let command = crate::commands::resolve_command(command)
            .ok_or_else(|| anyhow!("unknown command: {command}"))?;
        debug!(command, args = ?command_args, "resolved command");
        Ok(Self {
            command: command.to_string(),
            command_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{GlobalCli, Invocation, preprocess_args};
    use crate::config::Config;
    use crate::filter::FilterMode;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_tokens_become_overrides() {
        let pre = preprocess_args(&os(&["todo", "rc.color=off", "list", "rc.default.command:add"]))
            .expect("preprocess");

        assert_eq!(pre.cleaned_args, os(&["todo", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.default.command".to_string(), "add".to_string()),
            ]
        );
    }

    #[test]
    fn global_filter_and_trailing_words() {
        let cli = GlobalCli::parse_from(os(&["todo", "--filter", "active", "add", "buy", "milk"]));
        assert_eq!(cli.filter, FilterMode::Active);

        let inv = Invocation::parse(&Config::default(), cli.rest).expect("invocation");
        assert_eq!(inv.command, "add");
        assert_eq!(inv.command_args, vec!["buy".to_string(), "milk".to_string()]);
    }

    #[test]
    fn empty_invocation_uses_default_command_and_prefixes_expand() {
        let inv = Invocation::parse(&Config::default(), vec![]).expect("default");
        assert_eq!(inv.command, "list");

        let inv = Invocation::from_words("tog", vec!["1".to_string()]).expect("prefix");
        assert_eq!(inv.command, "toggle");

        let inv = Invocation::from_words("rm", vec![]).expect("alias");
        assert_eq!(inv.command, "delete");

        assert!(Invocation::from_words("frobnicate", vec![]).is_err());
    }
}
