pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod filter;
pub mod render;
pub mod state;
pub mod task;
pub mod theme;

use std::ffi::OsString;
use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    filter = %cli.filter,
    "starting fancy-todo"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.todorc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open store at {}",
        data_dir.display()
      )
    })?;

  let mut session = state::Session::open(
    datastore::PersistenceGateway::new(
      store
    )
  );
  session.set_filter(cli.filter);

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let stdin = std::io::stdin();
  let mut console = commands::Console {
    prompt: stdin.is_terminal(),
    input:  stdin.lock(),
    out:    std::io::stdout().lock()
  };

  commands::dispatch(
    &mut session,
    &renderer,
    &inv,
    &mut console
  )?;

  info!("done");
  Ok(())
}
