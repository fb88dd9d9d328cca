#![warn(missing_docs)]
//! Deterministic testing surfaces: JSONL event capture for machine tests.

use anyhow::Result;
use serde::Serialize;
use smartvend_core::SimTick;
use smartvend_machine::Effect;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Primary event record captured by headless machine tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload for smoke tests.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }

    /// Append every drained machine effect as one event per line.
    pub fn write_effects(&mut self, tick: SimTick, effects: &[Effect]) -> Result<()> {
        for effect in effects {
            let payload = serde_json::to_string(effect)?;
            self.write(&EventRecord {
                tick,
                kind: effect_label(effect),
                payload: &payload,
            })?;
        }
        Ok(())
    }
}

/// Stable label for an effect variant, used as the event kind.
pub fn effect_label(effect: &Effect) -> &'static str {
    match effect {
        Effect::Sound(_) => "Sound",
        Effect::Notice(_) => "Notice",
        Effect::Visual(_) => "Visual",
        Effect::Release { .. } => "Release",
        Effect::StockChanged => "StockChanged",
        Effect::RestockComplete { .. } => "RestockComplete",
    }
}
