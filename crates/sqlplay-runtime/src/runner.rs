use sqlplay_engine::EngineSession;
use sqlplay_types::{ExecutionError, FileName, OutputEvent, PlaygroundFileTree};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use tracing::{debug, info};

use crate::context::ExecutionContext;
use crate::interpreter::{Interpreter, Interrupt};
use crate::script::Script;
use crate::toolkit::Toolkit;
use crate::{Error, Result};

/// Consumer of a run's output events.
pub trait OutputSink {
    /// Returns `false` once the consumer is gone; the run then stops at its
    /// next suspension point.
    fn emit(&mut self, event: OutputEvent) -> bool;
}

impl OutputSink for Vec<OutputEvent> {
    fn emit(&mut self, event: OutputEvent) -> bool {
        self.push(event);
        true
    }
}

impl OutputSink for Sender<OutputEvent> {
    fn emit(&mut self, event: OutputEvent) -> bool {
        self.send(event).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// `index` finished.
    Completed,
    /// A file failed; the error was also emitted as the last event.
    Failed(ExecutionError),
    /// The sink went away before the run finished.
    Abandoned,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Runs `utils`, `seed` and `index` in that order against a provisioned
/// session.
///
/// `schema` is not part of a run; it was applied when the session was
/// created. Exports of each file are visible to the files after it. The
/// first failure stops the run and is reported as a single `Error` event.
/// Nothing is rolled back: statements that succeeded before the failure
/// stay applied. A panic while a file runs is reported like any other
/// failure of that file.
pub fn run<S>(
    session: &mut EngineSession,
    tree: &PlaygroundFileTree,
    toolkit: &Toolkit,
    sink: &mut S,
) -> RunOutcome
where
    S: OutputSink + ?Sized,
{
    let log = session.subscribe();
    let mut context = ExecutionContext::new();

    if tree.get(FileName::Index).is_none() {
        return fail(
            sink,
            ExecutionError {
                file: FileName::Index,
                line: 1,
                message: "file is missing".to_string(),
                statement: None,
            },
        );
    }

    for file in FileName::RUN_ORDER {
        let Some(source) = tree.get(file) else {
            debug!(file = %file, "skipping absent file");
            continue;
        };

        let script = match Script::parse(source) {
            Ok(script) => script,
            Err(err) => {
                return fail(
                    sink,
                    ExecutionError {
                        file,
                        line: err.line,
                        message: err.message,
                        statement: None,
                    },
                );
            }
        };

        debug!(file = %file, statements = script.statements.len(), "running file");
        let interpreter = Interpreter::new(file, &context, toolkit, sink, &log);
        let result = catch_unwind(AssertUnwindSafe(|| interpreter.run(session, &script.statements)));
        match result {
            Err(payload) => return fail(sink, panicked(file, payload)),
            Ok(Ok(exports)) => context.merge(exports),
            Ok(Err(Interrupt::Failed(err))) => {
                return fail(
                    sink,
                    ExecutionError {
                        file,
                        line: err.line,
                        message: err.message,
                        statement: err.statement,
                    },
                );
            }
            Ok(Err(Interrupt::Abandoned)) => {
                info!(file = %file, "run abandoned by consumer");
                return RunOutcome::Abandoned;
            }
        }
    }

    debug!(exports = context.exports().len(), "run completed");
    RunOutcome::Completed
}

fn fail<S: OutputSink + ?Sized>(sink: &mut S, error: ExecutionError) -> RunOutcome {
    info!(file = %error.file, line = error.line, message = %error.message, "run failed");
    if sink.emit(OutputEvent::Error(error.clone())) {
        RunOutcome::Failed(error)
    } else {
        RunOutcome::Abandoned
    }
}

fn panicked(file: FileName, payload: Box<dyn Any + Send>) -> ExecutionError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    ExecutionError {
        file,
        line: 0,
        message: format!("run panicked: {}", message),
        statement: None,
    }
}

/// Runs `body`, turning a panic into a final `Error` event for `index`.
fn guarded<S, F>(sink: &mut S, body: F) -> RunOutcome
where
    S: OutputSink + ?Sized,
    F: FnOnce(&mut S) -> RunOutcome,
{
    match catch_unwind(AssertUnwindSafe(|| body(&mut *sink))) {
        Ok(outcome) => outcome,
        Err(payload) => fail(sink, panicked(FileName::Index, payload)),
    }
}

/// Runs a playground on a worker thread.
///
/// The session moves to the worker for the duration of the run and comes
/// back from [`RunStream::finish`]. A run always ends with either a
/// completed outcome or an `Error` event, even if the worker panics.
pub fn spawn(mut session: EngineSession, tree: PlaygroundFileTree, toolkit: Toolkit) -> Result<RunStream> {
    let (tx, rx) = channel();
    let handle = std::thread::Builder::new()
        .name("playground-run".to_string())
        .spawn(move || {
            let mut tx = tx;
            let outcome = guarded(&mut tx, |tx| run(&mut session, &tree, &toolkit, tx));
            (session, outcome)
        })?;

    Ok(RunStream { rx, handle })
}

/// Incremental view of a spawned run.
///
/// Iterating yields events as they are produced and ends when the run does.
/// Dropping the stream abandons the run.
pub struct RunStream {
    rx: Receiver<OutputEvent>,
    handle: JoinHandle<(EngineSession, RunOutcome)>,
}

impl RunStream {
    /// Waits for the run to end and hands back the session.
    ///
    /// Events not yet consumed are discarded.
    pub fn finish(self) -> Result<(EngineSession, RunOutcome)> {
        let RunStream { rx, handle } = self;
        let joined = handle
            .join()
            .map_err(|_| Error::Worker("playground run panicked".to_string()));
        drop(rx);
        joined
    }
}

impl Iterator for RunStream {
    type Item = OutputEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_reports_worker_panic_as_last_event() {
        let (mut tx, rx) = channel();

        let outcome = guarded(&mut tx, |tx: &mut Sender<OutputEvent>| {
            tx.emit(OutputEvent::Console {
                file: FileName::Seed,
                text: "before".to_string(),
            });
            panic!("worker gone")
        });
        drop(tx);

        let events: Vec<OutputEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        let OutputEvent::Error(err) = &events[1] else {
            panic!("expected an error event, got {:?}", events[1]);
        };
        assert_eq!(err.file, FileName::Index);
        assert_eq!(err.message, "run panicked: worker gone");
        assert_eq!(outcome, RunOutcome::Failed(err.clone()));
    }

    #[test]
    fn test_guarded_passes_outcome_through() {
        let mut events: Vec<OutputEvent> = Vec::new();
        let outcome = guarded(&mut events, |_: &mut Vec<OutputEvent>| RunOutcome::Completed);
        assert!(outcome.is_completed());
        assert!(events.is_empty());
    }
}
