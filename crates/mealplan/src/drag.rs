use std::time::{Duration, Instant};

use imkitchen_shared::mealplan::{RecipeSummary, SlotKey};
use serde::Deserialize;
use strum::{AsRefStr, Display};

/// Activation thresholds that tell a drag apart from a click or a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Mouse/pen: pixels travelled before the drag starts.
    pub pointer_activation_distance: f64,
    /// Touch: how long the finger must rest before the drag starts.
    #[serde(rename = "touch_activation_delay_ms", with = "millis")]
    pub touch_activation_delay: Duration,
    /// Touch: movement allowed during the delay; more is a scroll.
    pub touch_activation_tolerance: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            pointer_activation_distance: 10.0,
            touch_activation_delay: Duration::from_millis(250),
            touch_activation_tolerance: 5.0,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DragPhase {
    Idle,
    /// Pressed on a card, activation threshold not met yet.
    Armed,
    Dragging,
}

/// Emitted once per successful drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropCommit {
    pub slot: SlotKey,
    pub recipe: RecipeSummary,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Armed {
        recipe: RecipeSummary,
        kind: PointerKind,
        origin: Point,
        pressed_at: Instant,
        over: Option<SlotKey>,
    },
    Dragging {
        recipe: RecipeSummary,
        over: Option<SlotKey>,
    },
}

/// Tracks the single drag gesture on the board.
#[derive(Debug, Default)]
pub struct DragEngine {
    config: DragConfig,
    state: State,
}

impl DragEngine {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            State::Idle => DragPhase::Idle,
            State::Armed { .. } => DragPhase::Armed,
            State::Dragging { .. } => DragPhase::Dragging,
        }
    }

    /// The card being dragged, once the drag is active.
    pub fn active(&self) -> Option<&RecipeSummary> {
        match &self.state {
            State::Dragging { recipe, .. } => Some(recipe),
            _ => None,
        }
    }

    pub fn hover_target(&self) -> Option<SlotKey> {
        match &self.state {
            State::Dragging { over, .. } => *over,
            _ => None,
        }
    }

    /// Pointer went down on a saved recipe card. Ignored while another
    /// gesture is in progress.
    pub fn press(&mut self, recipe: RecipeSummary, kind: PointerKind, at: Point, now: Instant) {
        if !matches!(self.state, State::Idle) {
            tracing::debug!(phase = %self.phase(), "press ignored, gesture in progress");
            return;
        }

        self.state = State::Armed {
            recipe,
            kind,
            origin: at,
            pressed_at: now,
            over: None,
        };
    }

    /// Pointer moved to `at`, above `over` (a slot, or nothing).
    pub fn move_to(&mut self, at: Point, now: Instant, over: Option<SlotKey>) {
        match &mut self.state {
            State::Idle => {}
            State::Dragging { over: current, .. } => *current = over,
            State::Armed {
                kind: PointerKind::Mouse,
                origin,
                over: current,
                ..
            } => {
                *current = over;
                if origin.distance(&at) >= self.config.pointer_activation_distance {
                    self.activate();
                }
            }
            State::Armed {
                kind: PointerKind::Touch,
                origin,
                pressed_at,
                over: current,
                ..
            } => {
                if origin.distance(&at) > self.config.touch_activation_tolerance {
                    tracing::debug!("touch moved before activation, treating as scroll");
                    self.state = State::Idle;
                    return;
                }

                *current = over;
                if now.saturating_duration_since(*pressed_at) >= self.config.touch_activation_delay
                {
                    self.activate();
                }
            }
        }
    }

    /// Lets a resting touch activate once its delay has elapsed.
    pub fn tick(&mut self, now: Instant) {
        let ready = match &self.state {
            State::Armed {
                kind: PointerKind::Touch,
                pressed_at,
                ..
            } => now.saturating_duration_since(*pressed_at) >= self.config.touch_activation_delay,
            _ => false,
        };

        if ready {
            self.activate();
        }
    }

    /// Pointer released. Commits when a drag is active and a slot is under
    /// the pointer; always returns to idle.
    pub fn release(&mut self) -> Option<DropCommit> {
        match std::mem::take(&mut self.state) {
            State::Dragging {
                recipe,
                over: Some(slot),
            } => {
                tracing::debug!(%slot, recipe_id = %recipe.recipe_id, "drop committed");
                Some(DropCommit { slot, recipe })
            }
            State::Dragging { over: None, .. } => {
                tracing::debug!("dropped outside any slot");
                None
            }
            _ => None,
        }
    }

    /// Gesture aborted (escape, pointer lost).
    pub fn cancel(&mut self) {
        if !matches!(self.state, State::Idle) {
            tracing::debug!(phase = %self.phase(), "drag cancelled");
        }
        self.state = State::Idle;
    }

    fn activate(&mut self) {
        if let State::Armed { recipe, over, .. } = std::mem::take(&mut self.state) {
            tracing::debug!(recipe_id = %recipe.recipe_id, "drag started");
            self.state = State::Dragging { recipe, over };
        }
    }
}
