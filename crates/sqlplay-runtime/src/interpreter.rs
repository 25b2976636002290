use sqlplay_engine::{EngineSession, Identity, with_identity};
use sqlplay_types::{FileName, OutputEvent, StatementLogEntry, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::Receiver;

use crate::context::ExecutionContext;
use crate::runner::OutputSink;
use crate::script::{Expr, SqlTemplate, Statement, StatementKind};
use crate::toolkit::Toolkit;

/// Why a file stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Failed(ScriptError),
    /// The sink stopped accepting events.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScriptError {
    pub line: usize,
    pub message: String,
    pub statement: Option<String>,
}

impl ScriptError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            statement: None,
        }
    }
}

impl Interrupt {
    fn failed(line: usize, message: impl Into<String>) -> Self {
        Interrupt::Failed(ScriptError::new(line, message))
    }

    /// Fills in the line for errors raised outside any statement, such as
    /// the `BEGIN` of an identity scope.
    fn at_line(self, line: usize) -> Self {
        match self {
            Interrupt::Failed(mut err) if err.line == 0 => {
                err.line = line;
                Interrupt::Failed(err)
            }
            other => other,
        }
    }
}

impl From<sqlplay_engine::Error> for Interrupt {
    fn from(err: sqlplay_engine::Error) -> Self {
        Interrupt::failed(0, err.to_string())
    }
}

/// Executes one file's statements against a session.
pub(crate) struct Interpreter<'a, S: OutputSink + ?Sized> {
    file: FileName,
    context: &'a ExecutionContext,
    toolkit: &'a Toolkit,
    sink: &'a mut S,
    log: &'a Receiver<StatementLogEntry>,
    locals: HashMap<String, Value>,
    exports: BTreeMap<String, Value>,
}

impl<'a, S: OutputSink + ?Sized> Interpreter<'a, S> {
    pub fn new(
        file: FileName,
        context: &'a ExecutionContext,
        toolkit: &'a Toolkit,
        sink: &'a mut S,
        log: &'a Receiver<StatementLogEntry>,
    ) -> Self {
        Self {
            file,
            context,
            toolkit,
            sink,
            log,
            locals: HashMap::new(),
            exports: BTreeMap::new(),
        }
    }

    /// Runs the file and returns what it exported.
    pub fn run(
        mut self,
        session: &mut EngineSession,
        statements: &[Statement],
    ) -> Result<BTreeMap<String, Value>, Interrupt> {
        let outcome = self.block(session, statements);
        self.flush()?;
        outcome.map(|()| self.exports)
    }

    fn block(&mut self, session: &mut EngineSession, statements: &[Statement]) -> Result<(), Interrupt> {
        for statement in statements {
            self.statement(session, statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, session: &mut EngineSession, statement: &Statement) -> Result<(), Interrupt> {
        let line = statement.line;

        match &statement.kind {
            StatementKind::Let {
                name,
                exported,
                value,
            } => {
                let value = self.eval(session, value, line)?;
                if *exported {
                    self.exports.insert(name.clone(), value.clone());
                }
                self.locals.insert(name.clone(), value);
            }
            StatementKind::Log(exprs) => {
                let mut parts = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    parts.push(self.eval(session, expr, line)?.to_string());
                }
                self.console(parts.join(" "))?;
            }
            StatementKind::Print(sql) => {
                let result = self.execute(session, sql, line)?;
                self.console(result.to_json_rows().to_string())?;
            }
            StatementKind::Sleep(expr) => {
                let value = self.eval(session, expr, line)?;
                let ms = value.as_i64().ok_or_else(|| {
                    Interrupt::failed(line, format!("sleep expects milliseconds, got {}", value.type_name()))
                })?;
                self.flush()?;
                self.toolkit.delay(ms.max(0) as u64);
            }
            StatementKind::Repeat { count, body } => {
                let value = self.eval(session, count, line)?;
                let times = value.as_i64().ok_or_else(|| {
                    Interrupt::failed(line, format!("repeat count must be an integer, got {}", value.type_name()))
                })?;
                for _ in 0..times.max(0) {
                    self.block(session, body)?;
                }
            }
            StatementKind::WithIdentity { subject, role, body } => {
                let subject = self.eval(session, subject, line)?.to_string();
                let role = self.eval(session, role, line)?.to_string();
                with_identity(Identity::new(subject, role), session)
                    .run(|scoped| self.block(scoped, body))
                    .map_err(|interrupt| interrupt.at_line(line))?;
            }
            StatementKind::Try(body) => match self.block(session, body) {
                Ok(()) => {}
                Err(Interrupt::Failed(err)) => {
                    self.console(format!("caught: {}", err.message))?;
                }
                Err(abandoned) => return Err(abandoned),
            },
            StatementKind::Sql(sql) => {
                self.execute(session, sql, line)?;
                self.flush()?;
            }
        }

        Ok(())
    }

    fn eval(&mut self, session: &mut EngineSession, expr: &Expr, line: usize) -> Result<Value, Interrupt> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Binding(name) => self
                .locals
                .get(name)
                .or_else(|| self.context.get(name))
                .cloned()
                .ok_or_else(|| Interrupt::failed(line, format!("`{}` is not defined", name))),
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(session, arg, line)?);
                }
                self.toolkit
                    .call(name, &values)
                    .map_err(|message| Interrupt::failed(line, message))
            }
            Expr::Query(sql) => Ok(self.execute(session, sql, line)?.scalar()),
        }
    }

    fn execute(
        &mut self,
        session: &mut EngineSession,
        sql: &SqlTemplate,
        line: usize,
    ) -> Result<sqlplay_types::QueryResult, Interrupt> {
        let mut params = Vec::with_capacity(sql.params.len());
        for param in &sql.params {
            params.push(self.eval(session, param, line)?);
        }

        session.execute(&sql.sql, &params).map_err(|err| {
            Interrupt::Failed(ScriptError {
                line,
                message: err.to_string(),
                statement: Some(sql.sql.clone()),
            })
        })
    }

    fn console(&mut self, text: String) -> Result<(), Interrupt> {
        self.flush()?;
        self.emit(OutputEvent::Console {
            file: self.file,
            text,
        })
    }

    /// Forwards statements logged since the last flush, in execution order.
    fn flush(&mut self) -> Result<(), Interrupt> {
        let log = self.log;
        for entry in log.try_iter() {
            self.emit(OutputEvent::Statement(entry))?;
        }
        Ok(())
    }

    fn emit(&mut self, event: OutputEvent) -> Result<(), Interrupt> {
        if self.sink.emit(event) {
            Ok(())
        } else {
            Err(Interrupt::Abandoned)
        }
    }
}
