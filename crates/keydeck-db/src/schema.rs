//! Database schema definition.

/// Initial schema (version 1).
pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Binding table: one row per (layer, slot), always present after load
CREATE TABLE IF NOT EXISTS bindings (
    layer INTEGER NOT NULL,
    slot INTEGER NOT NULL,
    trigger TEXT,
    action TEXT NOT NULL DEFAULT '{"type":"none"}',
    display_name TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (layer, slot)
);

-- Key/value settings (active layer, schema-independent flags)
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Event log for diagnostics
CREATE TABLE IF NOT EXISTS event_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL DEFAULT (datetime('now')),
    level TEXT NOT NULL,
    source TEXT NOT NULL,
    message TEXT NOT NULL,
    data TEXT
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_bindings_trigger ON bindings(trigger);
CREATE INDEX IF NOT EXISTS idx_event_log_timestamp ON event_log(timestamp);
"#;
