use std::sync::Arc;

use imkitchen_shared::mealplan::{DateRange, MealPlanEntry, RecipeSummary, SlotKey};
use time::Date;

use crate::{
    BoardView, DragConfig, DragEngine, MealPlanRemote, MealPlanStore, PendingAssign,
    RangeFetchCoordinator, RangeLoad, Result,
};

/// Planning board for one signed-in user: the slot store, the window
/// loader and the drag gesture, wired together.
pub struct Board {
    remote: Arc<dyn MealPlanRemote>,
    store: MealPlanStore,
    ranges: RangeFetchCoordinator,
    drag: DragEngine,
    view: BoardView,
    visible: DateRange,
}

impl Board {
    pub fn new(
        user_id: impl Into<String>,
        remote: Arc<dyn MealPlanRemote>,
        drag: DragConfig,
        anchor: Date,
    ) -> Self {
        let store = MealPlanStore::new(user_id, remote.clone());
        let view = BoardView::default();
        // The last week of the calendar cannot be shown whole.
        let visible = crate::window(view, anchor).unwrap_or(DateRange::day(anchor));

        Self {
            ranges: RangeFetchCoordinator::new(store.clone()),
            store,
            remote,
            drag: DragEngine::new(drag),
            view,
            visible,
        }
    }

    pub fn user_id(&self) -> &str {
        self.store.user_id()
    }

    pub fn store(&self) -> &MealPlanStore {
        &self.store
    }

    pub fn ranges(&self) -> &RangeFetchCoordinator {
        &self.ranges
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragEngine {
        &mut self.drag
    }

    pub fn view(&self) -> BoardView {
        self.view
    }

    pub fn visible(&self) -> DateRange {
        self.visible
    }

    /// Moves the board to `view` around `anchor` and loads that window. The
    /// board stays where it was when the window is out of range.
    pub async fn show(&mut self, view: BoardView, anchor: Date) -> Result<RangeLoad> {
        let range = crate::window(view, anchor)?;
        self.view = view;
        self.visible = range;

        self.ranges
            .ensure_range_loaded(self.store.user_id(), range.start, range.end)
            .await
    }

    /// Reloads the visible window even if it was loaded already.
    pub async fn refresh(&self) -> Result<RangeLoad> {
        let range = self.visible();

        self.ranges
            .refresh(self.store.user_id(), range.start, range.end)
            .await
    }

    /// Ends the drag gesture, assigning the card when it landed on a slot.
    pub fn release(&mut self) -> Result<Option<PendingAssign>> {
        let Some(commit) = self.drag.release() else {
            return Ok(None);
        };

        self.store.assign(commit.slot, commit.recipe).map(Some)
    }

    pub fn add(&self, slot: SlotKey, recipe: RecipeSummary) -> Result<PendingAssign> {
        self.store.assign(slot, recipe)
    }

    pub fn remove(&self, slot: &SlotKey) -> Option<MealPlanEntry> {
        self.store.remove(slot)
    }

    /// Drops every piece of session state, as on logout.
    pub fn reset(&mut self) {
        self.ranges.reset();
        self.store.clear();
        self.drag.cancel();
    }

    /// Starts a fresh board for another user.
    pub fn switch_user(&mut self, user_id: impl Into<String>) {
        self.reset();
        self.store = MealPlanStore::new(user_id, self.remote.clone());
        self.ranges = RangeFetchCoordinator::new(self.store.clone());
    }
}
