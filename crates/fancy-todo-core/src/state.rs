//! Task list state machine and the session that owns it.
//!
//! [`TaskList`] holds the backing sequence and applies the four mutations.
//! [`Session`] wraps it together with the filter selector, the theme and the
//! persistence gateway, and writes the whole list back after every applied
//! mutation.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::datastore::{KvStore, PersistenceGateway};
use crate::filter::{FilterMode, FilterSelector};
use crate::task::Task;
use crate::theme::ThemePreference;

/// Shortest id prefix accepted as a task reference.
pub const MIN_ID_PREFIX: usize = 4;

/// Result of a task list operation. Rejections are ordinary outcomes, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(NoOp),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOp {
    BlankText,
    UnknownTask,
    PositionOutOfRange,
    NoDestination,
    SamePosition,
}

impl fmt::Display for NoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoOp::BlankText => "task text is blank",
            NoOp::UnknownTask => "no such task",
            NoOp::PositionOutOfRange => "position is outside the visible list",
            NoOp::NoDestination => "no destination given",
            NoOp::SamePosition => "task is already at that position",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from stored tasks, keeping the first occurrence of any
    /// repeated id.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut seen = HashSet::with_capacity(tasks.len());
        let before = tasks.len();
        let tasks: Vec<Task> = tasks.into_iter().filter(|task| seen.insert(task.id)).collect();
        if tasks.len() != before {
            warn!(
                dropped = before - tasks.len(),
                "dropped tasks with duplicate ids"
            );
        }
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// `(total, active, completed)`
    pub fn counts(&self) -> (usize, usize, usize) {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        (self.tasks.len(), self.tasks.len() - completed, completed)
    }

    #[tracing::instrument(skip(self, text))]
    pub fn add(&mut self, text: &str) -> (Outcome, Option<Uuid>) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("rejecting blank task text");
            return (Outcome::Ignored(NoOp::BlankText), None);
        }

        let task = Task::new_active(trimmed.to_string());
        let id = task.id;
        self.tasks.push(task);
        debug!(%id, count = self.tasks.len(), "task added");
        (Outcome::Applied, Some(id))
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, id: Uuid) -> Outcome {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                debug!(completed = task.completed, "task toggled");
                Outcome::Applied
            }
            None => Outcome::Ignored(NoOp::UnknownTask),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: Uuid) -> Outcome {
        match self.tasks.iter().position(|task| task.id == id) {
            Some(idx) => {
                self.tasks.remove(idx);
                debug!(index = idx, "task deleted");
                Outcome::Applied
            }
            None => Outcome::Ignored(NoOp::UnknownTask),
        }
    }

    /// Moves the task shown at `source` in `filtered_view(mode)` to the slot
    /// shown at `destination`.
    ///
    /// Only the backing slots occupied by visible tasks are rewritten: the
    /// visible tasks are spliced among themselves and put back into those
    /// same slots, so tasks hidden by the filter never move. Under
    /// [`FilterMode::All`] this is a plain remove-then-insert on the backing
    /// sequence.
    #[tracing::instrument(skip(self))]
    pub fn reorder(
        &mut self,
        mode: FilterMode,
        source: usize,
        destination: Option<usize>,
    ) -> Outcome {
        let Some(destination) = destination else {
            debug!("reorder cancelled");
            return Outcome::Ignored(NoOp::NoDestination);
        };

        let visible: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| mode.matches(task))
            .map(|(idx, _)| idx)
            .collect();

        if source >= visible.len() || destination >= visible.len() {
            debug!(visible = visible.len(), "reorder position out of range");
            return Outcome::Ignored(NoOp::PositionOutOfRange);
        }
        if source == destination {
            return Outcome::Ignored(NoOp::SamePosition);
        }

        let mut order = visible.clone();
        let moved = order.remove(source);
        order.insert(destination, moved);

        let reordered: Vec<Task> = order.iter().map(|&idx| self.tasks[idx].clone()).collect();
        for (slot, task) in visible.into_iter().zip(reordered) {
            self.tasks[slot] = task;
        }

        debug!(source, destination, "task reordered");
        Outcome::Applied
    }

    pub fn filtered_view(&self, mode: FilterMode) -> Vec<&Task> {
        self.tasks.iter().filter(|task| mode.matches(task)).collect()
    }
}

/// Application context for one run: owns every piece of mutable state and
/// persists the task list after each applied mutation.
#[derive(Debug)]
pub struct Session<S> {
    tasks: TaskList,
    filter: FilterSelector,
    theme: ThemePreference,
    gateway: PersistenceGateway<S>,
}

impl<S: KvStore> Session<S> {
    #[tracing::instrument(skip_all)]
    pub fn open(gateway: PersistenceGateway<S>) -> Self {
        let tasks = TaskList::from_tasks(gateway.load());
        let theme = gateway.load_theme();
        info!(tasks = tasks.len(), %theme, "session opened");
        Self {
            tasks,
            filter: FilterSelector::default(),
            theme,
            gateway,
        }
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn filter(&self) -> FilterMode {
        self.filter.mode()
    }

    pub fn set_filter(&mut self, mode: FilterMode) {
        self.filter.set_mode(mode);
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    /// Tasks visible under the current filter mode, in backing order.
    pub fn visible(&self) -> Vec<&Task> {
        self.tasks.filtered_view(self.filter.mode())
    }

    pub fn add(&mut self, text: &str) -> (Outcome, Option<Uuid>) {
        let (outcome, id) = self.tasks.add(text);
        self.persist_if(outcome);
        (outcome, id)
    }

    pub fn toggle(&mut self, id: Uuid) -> Outcome {
        let outcome = self.tasks.toggle(id);
        self.persist_if(outcome);
        outcome
    }

    pub fn delete(&mut self, id: Uuid) -> Outcome {
        let outcome = self.tasks.delete(id);
        self.persist_if(outcome);
        outcome
    }

    /// Reorders using positions in the current filtered view.
    pub fn reorder(&mut self, source: usize, destination: Option<usize>) -> Outcome {
        let outcome = self.tasks.reorder(self.filter.mode(), source, destination);
        self.persist_if(outcome);
        outcome
    }

    pub fn toggle_theme(&mut self) -> ThemePreference {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemePreference) {
        self.theme = theme;
        if let Err(err) = self.gateway.save_theme(theme) {
            warn!(error = %format!("{err:#}"), "theme write failed");
        }
    }

    /// Resolves a user-typed reference: a 1-based position in the current
    /// filtered view, a full id, or a unique id prefix. A number past the end
    /// of the view is retried as an id prefix.
    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        let token = token.trim();
        if let Ok(position) = token.parse::<usize>()
            && let Some(task) = position
                .checked_sub(1)
                .and_then(|idx| self.visible().get(idx).copied())
        {
            return Some(task.id);
        }

        if let Ok(id) = Uuid::parse_str(token) {
            return self.tasks.get(id).map(|task| task.id);
        }

        let prefix = token.to_ascii_lowercase().replace('-', "");
        if prefix.len() < MIN_ID_PREFIX || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let mut matches = self
            .tasks
            .tasks()
            .iter()
            .filter(|task| task.id.simple().to_string().starts_with(&prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            debug!(%prefix, "ambiguous id prefix");
            None
        } else {
            Some(first.id)
        }
    }

    fn persist_if(&mut self, outcome: Outcome) {
        if !outcome.is_applied() {
            return;
        }
        if let Err(err) = self.gateway.save(self.tasks.tasks()) {
            warn!(error = %format!("{err:#}"), "task write failed");
        }
    }
}
