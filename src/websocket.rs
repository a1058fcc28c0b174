/// WebSocket grid sessions
///
/// Each connection owns one `GridStore`. A client opens a session over one of
/// the shared datasets, then sends `GridCommand`s; every command is answered
/// with the rendered window of the session's grid.
use actix::prelude::*;
use actix_web_actors::ws;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::column::{ColumnDefinition, ColumnType};
use crate::config::GridConfig;
use crate::messages::{ClientMessage, GridEvent, SessionMessage};
use crate::store::GridStore;
use crate::value::{CellValue, Record};

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Columns and rows a session can open
#[derive(Debug, Clone)]
pub struct Dataset {
    pub columns: Vec<ColumnDefinition>,
    pub rows: Vec<Record>,
}

/// Shared state for all WebSocket connections
pub struct AppState {
    pub datasets: Arc<Mutex<HashMap<String, Dataset>>>,
    pub config: GridConfig,
}

impl AppState {
    /// State seeded with a small `demo` dataset.
    pub fn new(config: GridConfig) -> Self {
        let mut datasets = HashMap::new();
        datasets.insert("demo".to_string(), demo_dataset());
        Self {
            datasets: Arc::new(Mutex::new(datasets)),
            config,
        }
    }

    fn datasets(&self) -> MutexGuard<'_, HashMap<String, Dataset>> {
        self.datasets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_dataset(&self, name: &str, dataset: Dataset) {
        self.datasets().insert(name.to_string(), dataset);
    }

    pub fn dataset(&self, name: &str) -> Option<Dataset> {
        self.datasets().get(name).cloned()
    }

    /// Build a store over a named dataset.
    pub fn open(&self, name: &str) -> Option<GridStore> {
        let dataset = self.dataset(name)?;
        let mut store = GridStore::with_columns(dataset.columns, self.config.clone());
        store.set_data(dataset.rows);
        Some(store)
    }
}

fn demo_dataset() -> Dataset {
    let columns = vec![
        ColumnDefinition::new("id", ColumnType::Number).with_width(80.0),
        ColumnDefinition::new("name", ColumnType::String).with_header("Name"),
        ColumnDefinition::new("department", ColumnType::String).with_header("Department"),
        ColumnDefinition::new("salary", ColumnType::Number).with_header("Salary"),
        ColumnDefinition::new("hired", ColumnType::Date).with_header("Hired"),
        ColumnDefinition::new("remote", ColumnType::Boolean).with_header("Remote"),
    ];
    let names = ["Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi"];
    let departments = ["Engineering", "Sales", "Support"];
    let rows = (0..200)
        .map(|i: usize| {
            let mut row = Record::new();
            row.insert("id".to_string(), CellValue::from(i as i64 + 1));
            row.insert("name".to_string(), CellValue::from(format!("{} {}", names[i % names.len()], i / names.len())));
            row.insert("department".to_string(), CellValue::from(departments[i % departments.len()]));
            row.insert("salary".to_string(), CellValue::from(40_000.0 + ((i * 7919) % 60_000) as f64));
            row.insert(
                "hired".to_string(),
                CellValue::from(format!("20{:02}-{:02}-{:02}", 10 + i % 14, 1 + i % 12, 1 + i % 28)),
            );
            row.insert("remote".to_string(), CellValue::from(i % 4 == 0));
            row
        })
        .collect();
    Dataset { columns, rows }
}

/// WebSocket connection actor
pub struct GridSession {
    hb: Instant,
    state: actix_web::web::Data<AppState>,
    store: Option<GridStore>,
}

impl GridSession {
    pub fn new(state: actix_web::web::Data<AppState>) -> Self {
        Self {
            hb: Instant::now(),
            state,
            store: None,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                log::warn!("WebSocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(ctx: &mut ws::WebsocketContext<Self>, event: &GridEvent) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(e) => log::error!("failed to serialize grid event: {}", e),
        }
    }

    /// Handle one client message and produce the reply.
    pub fn handle_client_message(&mut self, msg: ClientMessage) -> GridEvent {
        match msg {
            ClientMessage::Session(SessionMessage::Open { dataset }) => match self.state.open(&dataset) {
                Some(store) => {
                    log::info!("opened grid session over {} ({} rows)", dataset, store.rows().len());
                    let event = GridEvent::snapshot(&store);
                    self.store = Some(store);
                    event
                }
                None => GridEvent::error(format!("Dataset '{}' not found", dataset)),
            },
            ClientMessage::Session(SessionMessage::Refresh) => match &self.store {
                Some(store) => GridEvent::snapshot(store),
                None => GridEvent::error("No dataset open"),
            },
            ClientMessage::Command(command) => match self.store.as_mut() {
                Some(store) => match command.apply(store) {
                    Ok(_) => GridEvent::snapshot(store),
                    Err(e) => GridEvent::error(e.to_string()),
                },
                None => GridEvent::error("No dataset open"),
            },
        }
    }
}

impl Actor for GridSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GridSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                let event = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => self.handle_client_message(client_msg),
                    Err(e) => GridEvent::error(format!("Invalid message format: {}", e)),
                };
                Self::send(ctx, &event);
            }
            Ok(ws::Message::Binary(_)) => {
                log::debug!("Unexpected binary message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::GridCommand;

    fn session() -> GridSession {
        GridSession::new(actix_web::web::Data::new(AppState::new(GridConfig::default())))
    }

    #[test]
    fn test_commands_require_open_session() {
        let mut session = session();
        let event = session.handle_client_message(ClientMessage::Command(GridCommand::SelectAll));
        assert_eq!(event, GridEvent::error("No dataset open"));
    }

    #[test]
    fn test_open_and_command() {
        let mut session = session();
        let opened = session.handle_client_message(ClientMessage::Session(SessionMessage::Open {
            dataset: "demo".to_string(),
        }));
        let GridEvent::Snapshot(view) = opened else {
            panic!("expected snapshot");
        };
        assert_eq!(view.total_rows, 200);

        let event = session.handle_client_message(ClientMessage::Command(GridCommand::UpdateFilter {
            column_id: "department".to_string(),
            value: "sales".to_string(),
        }));
        let GridEvent::Snapshot(view) = event else {
            panic!("expected snapshot");
        };
        assert_eq!(view.total_rows, 67);
    }

    #[test]
    fn test_unknown_dataset() {
        let mut session = session();
        let event = session.handle_client_message(ClientMessage::Session(SessionMessage::Open {
            dataset: "nope".to_string(),
        }));
        assert!(matches!(event, GridEvent::Error { .. }));
    }
}
