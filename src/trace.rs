use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded handler outcome in the decision loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub cycle:     usize,
    pub state:     String,
    pub event:     String,
    pub data:      String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self { Self { entries: Vec::new() } }

    /// Records an entry and mirrors it to `tracing` at debug level.
    pub fn log(&mut self, cycle: usize, state: &str, event: &str, data: &str) {
        tracing::debug!(state, event, data, cycle, "agent trace");
        self.entries.push(TraceEntry {
            cycle,
            state:     state.to_string(),
            event:     event.to_string(),
            data:      data.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries for a given state name
    pub fn for_state(&self, state: &str) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.state == state).collect()
    }

    /// Returns all entries with a given event label
    pub fn for_event(&self, event: &str) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.event == event).collect()
    }

    /// Serializes the trace to a pretty-printed JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.entries)
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Prints a human-readable trace table to stdout
    pub fn print(&self) {
        println!("\n{:<6} {:<10} {:<22} {}", "cycle", "state", "event", "data");
        println!("{}", "─".repeat(80));
        for e in &self.entries {
            println!("{:<6} {:<10} {:<22} {}", e.cycle, e.state, e.event, &e.data.chars().take(40).collect::<String>());
        }
    }
}
