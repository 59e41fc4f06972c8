//! Active meal event and RSVP transitions.
//!
//! The product model is "one thing happening at a time": the store holds at
//! most one event, and starting a new one replaces the old one outright.
//! There is no expiry and no explicit close; an event stays active until the
//! next one supersedes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct MealEvent {
    pub meal_type: String,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    pub joining: Vec<String>,
    pub not_coming: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Join,
    NotComing,
}

impl Decision {
    /// Wire literals are `"join"` and `"not_coming"`; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "join" => Some(Self::Join),
            "not_coming" => Some(Self::NotComing),
            _ => None,
        }
    }
}

/// Single-slot store for the active event.
///
/// All mutation happens under the write lock, so a replacement and a
/// concurrent RSVP are linearized: the RSVP lands entirely in whichever
/// event holds the slot when its turn comes.
#[derive(Default)]
pub struct EventStore {
    active: RwLock<Option<MealEvent>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh event, atomically replacing any previous one.
    pub async fn start(&self, meal_type: &str, creator_name: &str) -> MealEvent {
        let event = MealEvent {
            meal_type: meal_type.to_string(),
            creator_name: creator_name.to_string(),
            created_at: Utc::now(),
            joining: Vec::new(),
            not_coming: Vec::new(),
            active: true,
        };

        *self.active.write().await = Some(event.clone());
        event
    }

    pub async fn current(&self) -> Option<MealEvent> {
        self.active.read().await.clone()
    }

    /// Moves `name` into the list matching `decision`.
    ///
    /// The name is removed from the opposite list first, so it can never end
    /// up in both. Re-submitting the same decision is a no-op on the lists.
    /// Members not being moved keep their insertion order.
    pub async fn rsvp(&self, name: &str, decision: Decision) -> Result<(), AppError> {
        if name.is_empty() {
            return Err(AppError::Validation("Name is required"));
        }

        let mut slot = self.active.write().await;
        let event = slot.as_mut().ok_or(AppError::NoActiveMeal)?;

        let (target, other) = match decision {
            Decision::Join => (&mut event.joining, &mut event.not_coming),
            Decision::NotComing => (&mut event.not_coming, &mut event.joining),
        };

        other.retain(|n| n != name);
        if !target.iter().any(|n| n == name) {
            target.push(name.to_string());
        }

        Ok(())
    }
}
