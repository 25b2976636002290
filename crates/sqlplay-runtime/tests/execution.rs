use sqlplay_engine::{EngineSession, Storage};
use sqlplay_runtime::{OutputSink, Playground, RunOutcome, Toolkit, run};
use sqlplay_types::{Dialect, FileName, OutputEvent, PlaygroundFileTree, Value};

const USERS: &str = "table users {\n  id serial pk\n  name text not null\n}\ntable audit {\n  id serial pk\n  note text\n}";

fn tree(files: &[(FileName, &str)]) -> PlaygroundFileTree {
    files
        .iter()
        .fold(PlaygroundFileTree::default().with(FileName::Schema, USERS), |tree, (name, source)| {
            tree.with(*name, *source)
        })
}

fn run_tree(files: &PlaygroundFileTree) -> (Vec<OutputEvent>, RunOutcome, EngineSession) {
    let mut session = EngineSession::from_source(
        Dialect::Sqlite,
        files.get(FileName::Schema).unwrap(),
        Storage::InMemory,
    )
    .unwrap();
    let mut events = Vec::new();
    let outcome = run(&mut session, files, &Toolkit::seeded(1), &mut events);
    (events, outcome, session)
}

fn console(events: &[OutputEvent]) -> Vec<(FileName, &str)> {
    events
        .iter()
        .filter_map(|e| match e {
            OutputEvent::Console { file, text } => Some((*file, text.as_str())),
            _ => None,
        })
        .collect()
}

fn statements(events: &[OutputEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            OutputEvent::Statement(entry) => Some(entry.sql.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_utils_exports_reach_seed_and_index() {
    let files = tree(&[
        (FileName::Utils, "export let who = 'Ada';"),
        (FileName::Seed, "insert into users (name) values (:who);"),
        (FileName::Index, "let n = query select count(*) from users where name = :who;\nlog who, n;"),
    ]);

    let (events, outcome, _) = run_tree(&files);
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(console(&events), vec![(FileName::Index, "Ada 1")]);
}

#[test]
fn test_missing_utils_fails_in_seed() {
    let files = tree(&[
        (FileName::Seed, "select 1;\ninsert into users (name) values (:who);"),
        (FileName::Index, "log 'never';"),
    ]);

    let (events, outcome, _) = run_tree(&files);
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(err.file, FileName::Seed);
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "`who` is not defined");

    // Error is the last event and index never ran.
    assert!(events.last().unwrap().is_error());
    assert!(console(&events).is_empty());
}

#[test]
fn test_local_bindings_do_not_leak_between_files() {
    let files = tree(&[
        (FileName::Seed, "let hidden = 1;"),
        (FileName::Index, "log hidden;"),
    ]);

    let (_, outcome, _) = run_tree(&files);
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(err.file, FileName::Index);
    assert_eq!(err.message, "`hidden` is not defined");
}

#[test]
fn test_one_insert_logs_one_statement() {
    let files = tree(&[(FileName::Index, "insert into users (name) values ($name());")]);

    let (events, outcome, _) = run_tree(&files);
    assert!(outcome.is_completed());
    assert_eq!(statements(&events), vec!["insert into users (name) values (?1)"]);
    assert!(!statements(&events).iter().any(|sql| sql.contains("audit")));

    let OutputEvent::Statement(entry) = &events[0] else {
        panic!("expected a statement event");
    };
    assert_eq!(entry.params.len(), 1);
    assert!(matches!(&entry.params[0], Value::Text(name) if name.contains(' ')));
}

#[test]
fn test_console_and_statements_interleave_in_order() {
    let files = tree(&[(
        FileName::Index,
        "log 'before';\ninsert into users (name) values ('a');\nlog 'after';",
    )]);

    let (events, _, _) = run_tree(&files);
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            OutputEvent::Console { .. } => "console",
            OutputEvent::Statement(_) => "statement",
            OutputEvent::Error(_) => "error",
        })
        .collect();
    assert_eq!(kinds, vec!["console", "statement", "console"]);
}

#[test]
fn test_failure_keeps_earlier_writes() {
    let files = tree(&[
        (FileName::Seed, "insert into users (name) values ('kept');"),
        (FileName::Index, "insert into users (name) values (null);"),
    ]);

    let (events, outcome, mut session) = run_tree(&files);
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(err.file, FileName::Index);
    assert_eq!(err.statement.as_deref(), Some("insert into users (name) values (null)"));
    assert!(err.message.contains("NOT NULL constraint failed"));

    // The failing statement is logged before the error.
    let n = events.len();
    assert!(matches!(&events[n - 2], OutputEvent::Statement(e) if e.sql.contains("(null)")));

    let count = session
        .execute("select count(*) from users", &[])
        .unwrap()
        .scalar();
    assert_eq!(count, Value::Integer(1));
}

#[test]
fn test_repeat_try_and_print() {
    let files = tree(&[(
        FileName::Index,
        r#"
repeat 3 {
  insert into users (name) values ($first_name());
}
try {
  insert into missing (x) values (1);
}
print select count(*) as n from users;
"#,
    )]);

    let (events, outcome, _) = run_tree(&files);
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        console(&events),
        vec![
            (FileName::Index, "caught: no such table: missing"),
            (FileName::Index, r#"[{"n":3}]"#),
        ]
    );
}

#[test]
fn test_identity_scope_in_scripts() {
    let schema = "table notes {\n id serial pk\n owner text\n}\npolicy ro on notes deny insert for reader";
    let files = PlaygroundFileTree::default()
        .with(FileName::Schema, schema)
        .with(
            FileName::Index,
            r#"
with identity ('u1', 'reader') {
  let seen = query select current_setting('request.jwt.claim.sub');
  log seen;
  try {
    insert into notes (owner) values ('u1');
  }
}
let role = query select current_setting('request.jwt.claim.role', true);
log role;
with identity ('u2', 'reader') {
  insert into notes (owner) values ('u2');
}
"#,
        );

    let mut session = EngineSession::from_source(Dialect::Postgresql, schema, Storage::InMemory).unwrap();
    let mut events = Vec::new();
    let outcome = run(&mut session, &files, &Toolkit::seeded(1), &mut events);

    assert_eq!(
        console(&events),
        vec![
            (FileName::Index, "u1"),
            (FileName::Index, "caught: permission denied for table notes"),
            (FileName::Index, "null"),
        ]
    );
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected the second scope to fail");
    };
    assert_eq!(err.line, 12);
    assert_eq!(err.message, "permission denied for table notes");
    assert_eq!(session.effective_role(), "admin");
    assert!(!session.in_transaction());
}

#[test]
fn test_parse_errors_name_the_file() {
    let files = tree(&[
        (FileName::Seed, "insert into users (name) values ('a');"),
        (FileName::Index, "log 'unterminated;"),
    ]);

    let (events, outcome, _) = run_tree(&files);
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(err.file, FileName::Index);
    assert_eq!(err.message, "unterminated string literal");
    // Seed still ran before index failed to parse.
    assert_eq!(statements(&events).len(), 1);
}

struct Closing {
    remaining: usize,
    seen: Vec<OutputEvent>,
}

impl OutputSink for Closing {
    fn emit(&mut self, event: OutputEvent) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.seen.push(event);
        true
    }
}

#[test]
fn test_closed_sink_abandons_run() {
    let files = tree(&[(
        FileName::Index,
        "insert into users (name) values ('a');\ninsert into users (name) values ('b');\ninsert into users (name) values ('c');",
    )]);
    let mut session =
        EngineSession::from_source(Dialect::Sqlite, USERS, Storage::InMemory).unwrap();
    let mut sink = Closing {
        remaining: 1,
        seen: Vec::new(),
    };

    let outcome = run(&mut session, &files, &Toolkit::seeded(1), &mut sink);
    assert_eq!(outcome, RunOutcome::Abandoned);
    assert_eq!(sink.seen.len(), 1);

    // Stopped at the next suspension point: the third insert never ran.
    let count = session
        .execute("select count(*) from users", &[])
        .unwrap()
        .scalar();
    assert_eq!(count, Value::Integer(2));
}

#[test]
fn test_spawned_run_streams_and_returns_session() {
    let playground = Playground::new(
        Dialect::Sqlite,
        tree(&[(FileName::Index, "insert into users (name) values ('a');\nlog 'done';")]),
    );

    let mut stream = playground.spawn(Toolkit::seeded(2)).unwrap();
    let first = stream.next().unwrap();
    assert!(matches!(first, OutputEvent::Statement(_)));
    let rest: Vec<OutputEvent> = stream.by_ref().collect();
    assert_eq!(
        rest,
        vec![OutputEvent::Console {
            file: FileName::Index,
            text: "done".to_string(),
        }]
    );

    let (mut session, outcome) = stream.finish().unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    let count = session
        .execute("select count(*) from users", &[])
        .unwrap()
        .scalar();
    assert_eq!(count, Value::Integer(1));
}

#[test]
fn test_infinite_real_bound_fails_the_file() {
    let files = tree(&[(
        FileName::Index,
        "let big = query select 9e999;\nlog $real(0, big);",
    )]);

    let (events, outcome, _) = run_tree(&files);
    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(err.file, FileName::Index);
    assert_eq!(err.line, 2);
    assert!(err.message.contains("finite"), "{}", err.message);
    assert!(events.last().unwrap().is_error());
}

/// Sink whose consumer crashes on the first console line.
struct Crashing {
    seen: Vec<OutputEvent>,
}

impl OutputSink for Crashing {
    fn emit(&mut self, event: OutputEvent) -> bool {
        if matches!(event, OutputEvent::Console { .. }) {
            panic!("display crashed");
        }
        self.seen.push(event);
        true
    }
}

#[test]
fn test_panic_during_file_ends_with_error_event() {
    let files = tree(&[
        (FileName::Seed, "insert into users (name) values ('a');\nlog 'seeded';"),
        (FileName::Index, "insert into users (name) values ('b');"),
    ]);
    let mut session =
        EngineSession::from_source(Dialect::Sqlite, USERS, Storage::InMemory).unwrap();
    let mut sink = Crashing { seen: Vec::new() };

    let outcome = run(&mut session, &files, &Toolkit::seeded(1), &mut sink);

    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(err.file, FileName::Seed);
    assert_eq!(err.message, "run panicked: display crashed");
    assert_eq!(sink.seen.len(), 2);
    assert_eq!(sink.seen.last(), Some(&OutputEvent::Error(err)));

    // Index never ran.
    let count = session
        .execute("select count(*) from users", &[])
        .unwrap()
        .scalar();
    assert_eq!(count, Value::Integer(1));
}

#[test]
fn test_utils_output_does_not_depend_on_seed() {
    let utils = "export let who = 'Ada';\nlog 'utils sees', who;";
    let index = "log who;";

    let without_seed = tree(&[(FileName::Utils, utils), (FileName::Index, index)]);
    let with_seed = tree(&[
        (FileName::Utils, utils),
        (FileName::Seed, "export let other = 'Grace';\ninsert into users (name) values (:other);"),
        (FileName::Index, index),
    ]);

    let (plain, outcome, _) = run_tree(&without_seed);
    assert!(outcome.is_completed());
    let (seeded, outcome, _) = run_tree(&with_seed);
    assert!(outcome.is_completed());

    let from_utils = |events: &[OutputEvent]| -> Vec<String> {
        console(events)
            .into_iter()
            .filter(|(file, _)| *file == FileName::Utils)
            .map(|(_, text)| text.to_string())
            .collect()
    };
    assert_eq!(from_utils(&plain), vec!["utils sees Ada".to_string()]);
    assert_eq!(from_utils(&plain), from_utils(&seeded));
}
