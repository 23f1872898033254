//! Card authorization gate

use std::sync::Arc;

use super::validate_id;
use crate::{
    clock::Clock,
    error::{AppResult, LedgerError},
    models::LibraryCard,
    repository::LedgerStore,
};

#[derive(Clone)]
pub struct CardService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl CardService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Whether the student may currently borrow
    pub async fn is_active(&self, student_id: i32) -> AppResult<bool> {
        validate_id("student_id", student_id)?;
        self.store
            .card(student_id)
            .await?
            .map(|card| card.is_active)
            .ok_or_else(|| LedgerError::CardNotFound(student_id).into())
    }

    pub async fn activate(&self, student_id: i32) -> AppResult<LibraryCard> {
        self.set_active(student_id, true).await
    }

    pub async fn deactivate(&self, student_id: i32) -> AppResult<LibraryCard> {
        self.set_active(student_id, false).await
    }

    /// Move the card to `desired`. Asking for the state it is already in is a
    /// no-op; re-activation stamps a fresh activation date.
    pub async fn set_active(&self, student_id: i32, desired: bool) -> AppResult<LibraryCard> {
        validate_id("student_id", student_id)?;

        let mut tx = self.store.begin().await?;

        let card = tx
            .lock_card(student_id)
            .await?
            .ok_or(LedgerError::CardNotFound(student_id))?;

        if card.is_active == desired {
            return Ok(card);
        }

        let activation_date = if desired {
            self.clock.now()
        } else {
            card.activation_date
        };
        let card = tx.update_card(student_id, desired, activation_date).await?;

        tx.commit().await?;

        tracing::info!(student_id, is_active = desired, "Library card updated");
        Ok(card)
    }
}
