use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum FilterMode {
  #[default]
  All,
  Active,
  Completed
}

impl FilterMode {
  pub const ALL_MODES: [FilterMode; 3] = [
    FilterMode::All,
    FilterMode::Active,
    FilterMode::Completed
  ];

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterMode::All => true,
      | FilterMode::Active => {
        !task.completed
      }
      | FilterMode::Completed => {
        task.completed
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | FilterMode::All => "all",
      | FilterMode::Active => "active",
      | FilterMode::Completed => {
        "completed"
      }
    }
  }

  /// Capitalised label shown in the
  /// filter bar.
  pub fn label(self) -> &'static str {
    match self {
      | FilterMode::All => "All",
      | FilterMode::Active => "Active",
      | FilterMode::Completed => {
        "Completed"
      }
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let lowered =
      s.trim().to_ascii_lowercase();
    let names = FilterMode::ALL_MODES
      .map(FilterMode::as_str);
    let full =
      crate::commands::expand_command_abbrev(
        &lowered, &names
      )
      .ok_or_else(|| {
        anyhow!(
          "unknown filter mode: {s} \
           (expected all, active or \
           completed)"
        )
      })?;

    FilterMode::ALL_MODES
      .into_iter()
      .find(|mode| mode.as_str() == full)
      .ok_or_else(|| {
        anyhow!(
          "unknown filter mode: {s}"
        )
      })
  }
}

/// Current filter mode of a session.
/// Never touches the task list or the
/// store.
#[derive(Debug, Clone, Default)]
pub struct FilterSelector {
  mode: FilterMode
}

impl FilterSelector {
  pub fn new(mode: FilterMode) -> Self {
    Self {
      mode
    }
  }

  pub fn mode(&self) -> FilterMode {
    self.mode
  }

  pub fn set_mode(
    &mut self,
    mode: FilterMode
  ) {
    if self.mode != mode {
      debug!(from = %self.mode, to = %mode, "switching filter mode");
    }
    self.mode = mode;
  }
}
