//! Database query functions.

use rusqlite::params;
use tracing::warn;

use keydeck_core::action::Action;
use keydeck_core::signature::Signature;
use keydeck_core::table::{Binding, BindingTable, Layer, Slot};

use crate::error::DbError;
use crate::{Database, DbResult};

/// Settings key for the last-used layer.
const ACTIVE_LAYER_KEY: &str = "active_layer";

impl Database {
    /// Load the full binding table.
    ///
    /// The result is always total: rows missing from storage come back as
    /// unbound defaults, and rows with out-of-range coordinates or
    /// unreadable actions are skipped with a warning rather than failing
    /// the load.
    pub fn load_table(&self) -> DbResult<BindingTable> {
        let mut table = BindingTable::new();

        let mut stmt = self
            .conn()
            .prepare("SELECT layer, slot, trigger, action, display_name FROM bindings")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        for row in rows {
            let (layer_raw, slot_raw, trigger, action_json, display_name) = row?;

            let coords = u8::try_from(layer_raw)
                .ok()
                .and_then(Layer::new)
                .zip(u8::try_from(slot_raw).ok().and_then(Slot::new));
            let Some((layer, slot)) = coords else {
                warn!(layer = layer_raw, slot = slot_raw, "Skipping out-of-range binding row");
                continue;
            };

            let action = match serde_json::from_str::<Action>(&action_json) {
                Ok(action) => action,
                Err(e) => {
                    warn!(%layer, %slot, error = %e, "Unreadable action; resetting to none");
                    Action::None
                }
            };

            *table.get_mut(layer, slot) = Binding {
                trigger: trigger.map(Signature::from_string),
                action,
                display_name,
            };
        }

        Ok(table)
    }

    /// Save the full binding table in one transaction.
    pub fn save_table(&mut self, table: &BindingTable) -> DbResult<()> {
        let tx = self.conn_mut().transaction()?;

        tx.execute("DELETE FROM bindings", [])?;
        {
            let mut stmt = tx.prepare(
                r"INSERT INTO bindings (layer, slot, trigger, action, display_name)
                  VALUES (?, ?, ?, ?, ?)",
            )?;

            for (layer, slot, binding) in table.entries() {
                let action = serde_json::to_string(&binding.action)
                    .map_err(|e| DbError::Serialization(e.to_string()))?;
                stmt.execute(params![
                    i64::from(layer.value()),
                    i64::from(slot.value()),
                    binding.trigger.as_ref().map(Signature::as_str),
                    action,
                    binding.display_name,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load the last-used layer. Missing or invalid values fall back to
    /// layer 0.
    pub fn load_active_layer(&self) -> DbResult<Layer> {
        let stored: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![ACTIVE_LAYER_KEY],
                |row| row.get(0),
            )
            .ok();

        let Some(value) = stored else {
            return Ok(Layer::default());
        };

        match value.parse::<u8>().ok().and_then(Layer::new) {
            Some(layer) => Ok(layer),
            None => {
                warn!(value = %value, "Stored active layer invalid; falling back to 0");
                Ok(Layer::default())
            }
        }
    }

    /// Save the active layer as "last used".
    pub fn save_active_layer(&self, layer: Layer) -> DbResult<()> {
        self.conn().execute(
            r"INSERT INTO settings (key, value, updated_at)
              VALUES (?, ?, datetime('now'))
              ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')",
            params![ACTIVE_LAYER_KEY, layer.value().to_string()],
        )?;
        Ok(())
    }

    /// Log an event to the database.
    pub fn log_event(
        &self,
        level: &str,
        source: &str,
        message: &str,
        data: Option<&str>,
    ) -> DbResult<()> {
        self.conn().execute(
            "INSERT INTO event_log (level, source, message, data) VALUES (?, ?, ?, ?)",
            params![level, source, message, data],
        )?;
        Ok(())
    }
}
