//! Property tests over arbitrary operation sequences on the task list.

use std::collections::HashSet;

use fancy_todo_core::datastore::{MemoryStore, PersistenceGateway};
use fancy_todo_core::filter::FilterMode;
use fancy_todo_core::state::TaskList;
use proptest::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Toggle(usize),
    Delete(usize),
    Reorder(FilterMode, usize, Option<usize>),
}

fn mode() -> impl Strategy<Value = FilterMode> {
    prop_oneof![
        Just(FilterMode::All),
        Just(FilterMode::Active),
        Just(FilterMode::Completed),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[ a-z]{0,8}".prop_map(Op::Add),
        (0usize..12).prop_map(Op::Toggle),
        (0usize..12).prop_map(Op::Delete),
        (mode(), 0usize..12, proptest::option::of(0usize..12))
            .prop_map(|(m, s, d)| Op::Reorder(m, s, d)),
    ]
}

fn apply(list: &mut TaskList, op: &Op) {
    // Positions past the end pick an id that is not in the list.
    let id_at = |list: &TaskList, idx: usize| {
        list.tasks().get(idx).map(|t| t.id).unwrap_or_else(Uuid::new_v4)
    };
    match op {
        Op::Add(text) => {
            list.add(text);
        }
        Op::Toggle(idx) => {
            let id = id_at(&*list, *idx);
            list.toggle(id);
        }
        Op::Delete(idx) => {
            let id = id_at(&*list, *idx);
            list.delete(id);
        }
        Op::Reorder(mode, source, destination) => {
            list.reorder(*mode, *source, *destination);
        }
    }
}

fn ids(tasks: &[&fancy_todo_core::task::Task]) -> HashSet<Uuid> {
    tasks.iter().map(|t| t.id).collect()
}

proptest! {
    /// The active and completed views always partition the full list.
    #[test]
    fn prop_filtered_views_partition(ops in prop::collection::vec(op(), 0..40)) {
        let mut list = TaskList::new();
        for op in &ops {
            apply(&mut list, op);
        }

        let all = list.filtered_view(FilterMode::All);
        let active = ids(&list.filtered_view(FilterMode::Active));
        let completed = ids(&list.filtered_view(FilterMode::Completed));

        prop_assert_eq!(all.len(), list.len());
        prop_assert!(active.is_disjoint(&completed));
        let union: HashSet<Uuid> = active.union(&completed).copied().collect();
        prop_assert_eq!(union, ids(&all));
    }

    /// Ids stay unique and every task keeps non-empty trimmed text.
    #[test]
    fn prop_ids_unique_and_text_trimmed(ops in prop::collection::vec(op(), 0..40)) {
        let mut list = TaskList::new();
        for op in &ops {
            apply(&mut list, op);
        }

        let unique: HashSet<Uuid> = list.tasks().iter().map(|t| t.id).collect();
        prop_assert_eq!(unique.len(), list.len());
        for task in list.tasks() {
            prop_assert!(!task.text.is_empty());
            prop_assert_eq!(task.text.trim(), task.text.as_str());
        }
    }

    /// Reordering permutes tasks without changing membership, and tasks
    /// hidden by the filter keep their backing positions.
    #[test]
    fn prop_reorder_is_a_permutation(
        ops in prop::collection::vec(op(), 0..30),
        mode in mode(),
        source in 0usize..12,
        destination in proptest::option::of(0usize..12),
    ) {
        let mut list = TaskList::new();
        for op in &ops {
            apply(&mut list, op);
        }
        let before = list.clone();

        list.reorder(mode, source, destination);

        prop_assert_eq!(list.len(), before.len());
        let before_ids: HashSet<Uuid> = before.tasks().iter().map(|t| t.id).collect();
        let after_ids: HashSet<Uuid> = list.tasks().iter().map(|t| t.id).collect();
        prop_assert_eq!(before_ids, after_ids);
        for (old, new) in before.tasks().iter().zip(list.tasks()) {
            if !mode.matches(old) {
                prop_assert_eq!(old, new);
            }
        }
    }

    /// Saving then loading reproduces the exact sequence.
    #[test]
    fn prop_save_load_roundtrip(ops in prop::collection::vec(op(), 0..40)) {
        let mut list = TaskList::new();
        for op in &ops {
            apply(&mut list, op);
        }

        let mut gateway = PersistenceGateway::new(MemoryStore::new());
        gateway.save(list.tasks()).expect("save");
        prop_assert_eq!(gateway.load(), list.tasks().to_vec());
    }
}
