use std::io::Cursor;

use fancy_todo_core::cli::Invocation;
use fancy_todo_core::commands::{Console, dispatch};
use fancy_todo_core::datastore::{MemoryStore, PersistenceGateway};
use fancy_todo_core::filter::FilterMode;
use fancy_todo_core::render::Renderer;
use fancy_todo_core::state::Session;
use fancy_todo_core::theme::ThemePreference;

fn session() -> Session<MemoryStore> {
    Session::open(PersistenceGateway::new(MemoryStore::new()))
}

fn run(session: &mut Session<MemoryStore>, words: &[&str]) -> String {
    run_with_input(session, words, "")
}

fn run_with_input(session: &mut Session<MemoryStore>, words: &[&str], input: &str) -> String {
    let (command, args) = words.split_first().expect("command word");
    let inv = Invocation::from_words(command, args.iter().map(|w| w.to_string()).collect())
        .expect("invocation");
    let mut console = Console {
        input: Cursor::new(input.as_bytes().to_vec()),
        out: Vec::new(),
        prompt: false,
    };
    dispatch(session, &Renderer::plain(), &inv, &mut console).expect("dispatch");
    String::from_utf8(console.out).expect("utf8 output")
}

fn texts(session: &Session<MemoryStore>) -> Vec<String> {
    session.tasks().tasks().iter().map(|t| t.text.clone()).collect()
}

#[test]
fn one_shot_commands_drive_the_session() {
    let mut s = session();

    assert_eq!(run(&mut s, &["add", "buy", "milk"]), "Added task 1.\n");
    assert_eq!(run(&mut s, &["add", "walk", "dog"]), "Added task 2.\n");
    assert_eq!(run(&mut s, &["add", "  "]), "Nothing to do: task text is blank.\n");

    assert_eq!(run(&mut s, &["done", "1"]), "Toggled task 1: now done.\n");
    assert_eq!(run(&mut s, &["toggle", "9"]), "Nothing to do: no task matches '9'.\n");

    assert_eq!(run(&mut s, &["move", "2", "1"]), "Moved task 2 to 1.\n");
    assert_eq!(texts(&s), vec!["walk dog", "buy milk"]);
    assert_eq!(run(&mut s, &["move", "1"]), "Move cancelled.\n");

    let listing = run(&mut s, &["list", "completed"]);
    assert!(listing.contains("[Completed]"));
    assert!(listing.contains("buy milk"));
    assert!(!listing.contains("walk dog"));
    assert_eq!(s.filter(), FilterMode::Completed);

    assert_eq!(run(&mut s, &["rm", "1"]), "Deleted task 'buy milk'.\n");
    assert_eq!(texts(&s), vec!["walk dog"]);
}

#[test]
fn positions_follow_the_active_filter() {
    let mut s = session();
    for text in ["a", "b", "c"] {
        run(&mut s, &["add", text]);
    }
    run(&mut s, &["toggle", "2"]);

    s.set_filter(FilterMode::Active);
    // active view is [a, c]; position 2 is c, not b
    assert_eq!(run(&mut s, &["toggle", "2"]), "Toggled task 2: now done.\n");
    assert!(s.tasks().tasks()[2].completed);
    assert!(s.tasks().tasks()[1].completed);
    assert!(!s.tasks().tasks()[0].completed);
}

#[test]
fn id_prefix_references_resolve() {
    let mut s = session();
    run(&mut s, &["add", "only", "task"]);
    let prefix = s.tasks().tasks()[0].short_id();

    assert_eq!(
        run(&mut s, &["toggle", &prefix]),
        format!("Toggled task {prefix}: now done.\n")
    );
    assert_eq!(run(&mut s, &["toggle", "abc"]), "Nothing to do: no task matches 'abc'.\n");
}

#[test]
fn theme_command_reads_sets_and_toggles() {
    let mut s = session();
    assert_eq!(run(&mut s, &["theme"]), "Theme: light.\n");
    assert_eq!(run(&mut s, &["theme", "toggle"]), "Theme set to dark.\n");
    assert_eq!(run(&mut s, &["theme", "light"]), "Theme set to light.\n");
    assert_eq!(s.theme(), ThemePreference::Light);
    assert_eq!(s.gateway().load_theme(), ThemePreference::Light);
}

#[test]
fn shell_session_keeps_filter_and_adds_bare_lines() {
    let mut s = session();
    let script = "buy milk\n\
                  add walk dog\n\
                  toggle 1\n\
                  filter active\n\
                  toggle 1\n\
                  filter all\n\
                  move 2 1\n\
                  bogus move 9\n\
                  filter sideways\n\
                  quit\n\
                  add never reached\n";
    let output = run_with_input(&mut s, &["shell"], script);

    assert_eq!(texts(&s), vec!["walk dog", "buy milk", "bogus move 9"]);
    assert!(s.tasks().tasks().iter().take(2).all(|t| t.completed));
    assert_eq!(s.filter(), FilterMode::All);
    assert!(output.contains("[Active]"));
    assert!(output.contains("error: unknown filter mode: sideways"));
    assert!(!output.contains("never reached"));
}

#[test]
fn shell_ends_on_eof() {
    let mut s = session();
    let output = run_with_input(&mut s, &["shell"], "add one\n");
    assert_eq!(texts(&s), vec!["one"]);
    assert!(output.contains("Added task 1."));
}

#[test]
fn shell_adds_keep_interior_whitespace() {
    let mut s = session();
    let output = run_with_input(
        &mut s,
        &["shell"],
        "buy   two\tmilks\nadd  walk\t the   dog  \n",
    );

    assert_eq!(texts(&s), vec!["buy   two\tmilks", "walk\t the   dog"]);
    assert!(output.contains("buy   two\\tmilks"));
}
