use tokio::sync::mpsc;

/// Best-effort status messages. Sending never blocks or fails the caller.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl Progress {
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(progress = %message);
        if let Some(tx) = &self.tx {
            let _ = tx.send(message);
        }
    }

    pub fn loading_schema(&self, instance: &str) {
        self.notify(format!("loading schema: {instance}"));
    }

    pub fn loading_routines(&self, instance: &str) {
        self.notify(format!("loading routines: {instance}"));
    }

    pub fn getting_ddl(&self, routine: &str) {
        self.notify(format!("getting ddl for: {routine}"));
    }

    pub fn comparing_table(&self, table: &str) {
        self.notify(format!("comparing table: {table}"));
    }
}
