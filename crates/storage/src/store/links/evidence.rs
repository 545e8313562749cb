#![forbid(unsafe_code)]

use super::super::*;
use pf_core::{EventKind, EvidenceLink, FormRef, PostId};
use rusqlite::{OptionalExtension, params};
use serde_json::json;

impl SqliteStore {
    /// Sets or clears the evidence toggle of a form. Clearing removes the row outright.
    pub fn set_evidence_link(
        &mut self,
        request: SetEvidenceLinkRequest,
    ) -> Result<EvidenceWrite, StoreError> {
        let SetEvidenceLinkRequest {
            form,
            post_id,
            actor,
            at_ms,
        } = request;
        if form.form_type.trim().is_empty() || form.form_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("form_type and form_id are required"));
        }

        let Some(post_id) = post_id else {
            let tx = self.write_tx()?;
            let previous: Option<String> = tx
                .query_row(
                    "SELECT post_id FROM evidence_links WHERE form_type = ?1 AND form_id = ?2",
                    params![form.form_type, form.form_id],
                    |row| row.get(0),
                )
                .optional()?;
            let mut events = Vec::new();
            if let Some(previous) = previous {
                tx.execute(
                    "DELETE FROM evidence_links WHERE form_type = ?1 AND form_id = ?2",
                    params![form.form_type, form.form_id],
                )?;
                events.push(insert_event_tx(
                    &tx,
                    EventInsert {
                        ts_ms: at_ms,
                        post_id: Some(previous.as_str()),
                        task_id: None,
                        kind: EventKind::EvidenceUnlinked,
                        payload: json!({
                            "form_type": form.form_type,
                            "form_id": form.form_id,
                            "actor": actor.id,
                        }),
                    },
                )?);
            }
            tx.commit()?;
            return Ok(EvidenceWrite {
                link: EvidenceLink::Disabled,
                events,
            });
        };

        // Legacy incidents are valid evidence targets too.
        let Some(detail) = self.get_detail(post_id.as_str())? else {
            return Err(StoreError::UnknownId);
        };
        let post_number = detail.post.post_number;

        let tx = self.write_tx()?;
        tx.execute(
            r#"
            INSERT INTO evidence_links(
              form_type, form_id, post_id, post_number, linked_by_id, linked_by_name, linked_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(form_type, form_id) DO UPDATE SET
              post_id = excluded.post_id,
              post_number = excluded.post_number,
              linked_by_id = excluded.linked_by_id,
              linked_by_name = excluded.linked_by_name,
              linked_at_ms = excluded.linked_at_ms
            "#,
            params![
                form.form_type,
                form.form_id,
                post_id.as_str(),
                post_number,
                actor.id,
                actor.display_name,
                at_ms
            ],
        )?;
        let event = insert_event_tx(
            &tx,
            EventInsert {
                ts_ms: at_ms,
                post_id: Some(post_id.as_str()),
                task_id: None,
                kind: EventKind::EvidenceLinked,
                payload: json!({
                    "form_type": form.form_type,
                    "form_id": form.form_id,
                    "post_number": post_number,
                    "actor": actor.id,
                }),
            },
        )?;
        tx.commit()?;

        Ok(EvidenceWrite {
            link: EvidenceLink::Enabled {
                post_id,
                post_number,
            },
            events: vec![event],
        })
    }

    pub fn get_evidence_link(&self, form: &FormRef) -> Result<EvidenceLink, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT post_id, post_number FROM evidence_links WHERE form_type = ?1 AND form_id = ?2",
                params![form.form_type, form.form_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((post_id, post_number)) = row else {
            return Ok(EvidenceLink::Disabled);
        };
        // Links may point at legacy verification ids, which are not validated.
        let post_id = PostId::from_foreign(post_id);
        Ok(EvidenceLink::Enabled {
            post_id,
            post_number,
        })
    }
}
