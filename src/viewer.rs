//! Flipbook layout and navigation.
//!
//! A book is a run of leaves (cover, contents, content pages). The viewer
//! shows them a view at a time: either one leaf, or a spread of two facing
//! leaves like an open book. In spread mode the cover sits alone on the
//! right, so every later spread pairs an odd leaf on the left with the even
//! leaf after it. A missing right leaf becomes a blank filler.
//!
//! ```text
//! leaves:  0     1 2     3 4     5
//! views:  [_ 0] [1 2]   [3 4]   [5 _]
//! ```
//!
//! Navigation is a small state machine. [`ViewerState`] is a value: the
//! [`Navigator`] takes a state and an event and returns the next state.
//! While a flip animation runs, navigation events are ignored until
//! [`NavEvent::FlipFinished`] lands on the target view.
//!
//! The generated site runs these transitions in the browser: `static/nav.js`
//! holds a flipping flag that drops key, click and swipe events until the
//! next view has loaded. Its prev and next targets come from
//! [`Navigator::neighbors`], baked into each view by the generate stage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Two facing leaves per view.
    #[default]
    Spread,
    /// One leaf per view.
    Single,
}

impl ViewMode {
    pub fn from_spreads(spreads: bool) -> Self {
        if spreads { Self::Spread } else { Self::Single }
    }
}

/// One side of a spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Leaf(usize),
    /// Filler keeping the spread symmetric.
    Blank,
}

impl Slot {
    fn within(leaf: usize, leaf_count: usize) -> Self {
        if leaf < leaf_count {
            Self::Leaf(leaf)
        } else {
            Self::Blank
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Single(usize),
    Spread { left: Slot, right: Slot },
}

impl View {
    /// Slots left to right.
    pub fn slots(&self) -> Vec<Slot> {
        match *self {
            View::Single(leaf) => vec![Slot::Leaf(leaf)],
            View::Spread { left, right } => vec![left, right],
        }
    }

    /// Leaves shown, blanks skipped.
    pub fn leaves(&self) -> Vec<usize> {
        self.slots()
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Leaf(leaf) => Some(leaf),
                Slot::Blank => None,
            })
            .collect()
    }
}

/// Every view of a book with `leaf_count` leaves, in order.
pub fn layout(leaf_count: usize, mode: ViewMode) -> Vec<View> {
    match mode {
        ViewMode::Single => (0..leaf_count).map(View::Single).collect(),
        ViewMode::Spread => (0..total_views(leaf_count, mode))
            .map(|view| match view {
                0 => View::Spread {
                    left: Slot::Blank,
                    right: Slot::Leaf(0),
                },
                k => View::Spread {
                    left: Slot::within(2 * k - 1, leaf_count),
                    right: Slot::within(2 * k, leaf_count),
                },
            })
            .collect(),
    }
}

pub fn total_views(leaf_count: usize, mode: ViewMode) -> usize {
    match mode {
        ViewMode::Single => leaf_count,
        ViewMode::Spread if leaf_count == 0 => 0,
        ViewMode::Spread => 1 + leaf_count / 2,
    }
}

/// The view that shows `leaf`.
pub fn view_of_leaf(leaf: usize, mode: ViewMode) -> usize {
    match mode {
        ViewMode::Single => leaf,
        ViewMode::Spread => leaf.div_ceil(2),
    }
}

/// Page number shown in the counter for `view`: its leftmost leaf, counted from 1.
pub fn display_page(view: usize, mode: ViewMode) -> usize {
    match mode {
        ViewMode::Single => view + 1,
        ViewMode::Spread if view == 0 => 1,
        ViewMode::Spread => 2 * view,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Idle { view: usize },
    Flipping { from: usize, to: usize },
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::Idle { view: 0 }
    }
}

impl ViewerState {
    /// The view on screen. During a flip that is still the one being left.
    pub fn current(&self) -> usize {
        match *self {
            Self::Idle { view } => view,
            Self::Flipping { from, .. } => from,
        }
    }

    pub fn is_flipping(&self) -> bool {
        matches!(self, Self::Flipping { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Next,
    Prev,
    First,
    Last,
    GoTo(usize),
    FlipFinished,
}

/// Transition function over a fixed number of views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    views: usize,
}

impl Navigator {
    pub fn new(views: usize) -> Self {
        Self { views }
    }

    pub fn for_leaves(leaf_count: usize, mode: ViewMode) -> Self {
        Self::new(total_views(leaf_count, mode))
    }

    pub fn views(&self) -> usize {
        self.views
    }

    /// Where `event` leads from `view`, clamped to the book.
    pub fn target(&self, view: usize, event: NavEvent) -> usize {
        let last = self.views.saturating_sub(1);
        match event {
            NavEvent::Next => (view + 1).min(last),
            NavEvent::Prev => view.saturating_sub(1),
            NavEvent::First => 0,
            NavEvent::Last => last,
            NavEvent::GoTo(target) => target.min(last),
            NavEvent::FlipFinished => view,
        }
    }

    pub fn apply(&self, state: ViewerState, event: NavEvent) -> ViewerState {
        match (state, event) {
            (ViewerState::Flipping { to, .. }, NavEvent::FlipFinished) => {
                ViewerState::Idle { view: to }
            }
            (ViewerState::Flipping { .. }, _) => state,
            (ViewerState::Idle { view }, event) => {
                let to = self.target(view, event);
                if to == view {
                    state
                } else {
                    ViewerState::Flipping { from: view, to }
                }
            }
        }
    }

    /// Previous and next views of `view`, if any.
    pub fn neighbors(&self, view: usize) -> (Option<usize>, Option<usize>) {
        let prev = self.target(view, NavEvent::Prev);
        let next = self.target(view, NavEvent::Next);
        (
            (prev != view).then_some(prev),
            (next != view).then_some(next),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Slot::{Blank, Leaf};

    fn spread(left: Slot, right: Slot) -> View {
        View::Spread { left, right }
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[test]
    fn cover_sits_alone_on_the_right() {
        let views = layout(5, ViewMode::Spread);
        assert_eq!(views[0], spread(Blank, Leaf(0)));
    }

    #[test]
    fn later_spreads_pair_odd_with_even() {
        let views = layout(5, ViewMode::Spread);
        assert_eq!(
            views,
            vec![
                spread(Blank, Leaf(0)),
                spread(Leaf(1), Leaf(2)),
                spread(Leaf(3), Leaf(4)),
            ]
        );
    }

    #[test]
    fn missing_right_leaf_is_blank() {
        let views = layout(4, ViewMode::Spread);
        assert_eq!(views.last(), Some(&spread(Leaf(3), Blank)));
    }

    #[test]
    fn single_mode_has_one_leaf_per_view() {
        let views = layout(3, ViewMode::Single);
        assert_eq!(views, vec![View::Single(0), View::Single(1), View::Single(2)]);
    }

    #[test]
    fn empty_book_has_no_views() {
        assert!(layout(0, ViewMode::Spread).is_empty());
        assert!(layout(0, ViewMode::Single).is_empty());
    }

    #[test]
    fn every_leaf_appears_exactly_once() {
        for n in 1..12 {
            for mode in [ViewMode::Spread, ViewMode::Single] {
                let shown: Vec<usize> = layout(n, mode).iter().flat_map(View::leaves).collect();
                assert_eq!(shown, (0..n).collect::<Vec<_>>(), "n={n} mode={mode:?}");
            }
        }
    }

    #[test]
    fn view_of_leaf_matches_layout() {
        for n in 1..12 {
            for mode in [ViewMode::Spread, ViewMode::Single] {
                for (view, v) in layout(n, mode).iter().enumerate() {
                    for leaf in v.leaves() {
                        assert_eq!(view_of_leaf(leaf, mode), view);
                    }
                }
            }
        }
    }

    #[test]
    fn total_views_matches_layout_length() {
        for n in 0..12 {
            assert_eq!(total_views(n, ViewMode::Spread), layout(n, ViewMode::Spread).len());
        }
        assert_eq!(total_views(6, ViewMode::Spread), 4);
    }

    #[test]
    fn display_page_counts_left_leaf() {
        assert_eq!(display_page(0, ViewMode::Spread), 1);
        assert_eq!(display_page(1, ViewMode::Spread), 2);
        assert_eq!(display_page(3, ViewMode::Spread), 6);
        assert_eq!(display_page(0, ViewMode::Single), 1);
        assert_eq!(display_page(4, ViewMode::Single), 5);
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    #[test]
    fn next_starts_a_flip() {
        let nav = Navigator::new(3);
        let state = nav.apply(ViewerState::default(), NavEvent::Next);
        assert_eq!(state, ViewerState::Flipping { from: 0, to: 1 });
        assert_eq!(state.current(), 0);
    }

    #[test]
    fn flip_finished_lands_on_target() {
        let nav = Navigator::new(3);
        let state = ViewerState::Flipping { from: 0, to: 2 };
        assert_eq!(
            nav.apply(state, NavEvent::FlipFinished),
            ViewerState::Idle { view: 2 }
        );
    }

    #[test]
    fn events_are_ignored_while_flipping() {
        let nav = Navigator::new(5);
        let state = ViewerState::Flipping { from: 1, to: 2 };
        for event in [NavEvent::Next, NavEvent::Prev, NavEvent::Last, NavEvent::GoTo(0)] {
            assert_eq!(nav.apply(state, event), state);
        }
    }

    #[test]
    fn navigation_clamps_at_the_ends() {
        let nav = Navigator::new(3);
        let first = ViewerState::Idle { view: 0 };
        let last = ViewerState::Idle { view: 2 };
        assert_eq!(nav.apply(first, NavEvent::Prev), first);
        assert_eq!(nav.apply(first, NavEvent::First), first);
        assert_eq!(nav.apply(last, NavEvent::Next), last);
        assert_eq!(
            nav.apply(first, NavEvent::GoTo(99)),
            ViewerState::Flipping { from: 0, to: 2 }
        );
    }

    #[test]
    fn finish_while_idle_is_a_no_op() {
        let nav = Navigator::new(3);
        let state = ViewerState::Idle { view: 1 };
        assert_eq!(nav.apply(state, NavEvent::FlipFinished), state);
    }

    #[test]
    fn walk_to_the_end_and_back() {
        let nav = Navigator::for_leaves(6, ViewMode::Spread);
        assert_eq!(nav.views(), 4);
        let mut state = ViewerState::default();
        for _ in 0..10 {
            state = nav.apply(state, NavEvent::Next);
            state = nav.apply(state, NavEvent::FlipFinished);
        }
        assert_eq!(state, ViewerState::Idle { view: 3 });
        state = nav.apply(state, NavEvent::First);
        assert!(state.is_flipping());
        state = nav.apply(state, NavEvent::FlipFinished);
        assert_eq!(state, ViewerState::Idle { view: 0 });
    }

    #[test]
    fn neighbors_stop_at_the_ends() {
        let nav = Navigator::new(3);
        assert_eq!(nav.neighbors(0), (None, Some(1)));
        assert_eq!(nav.neighbors(1), (Some(0), Some(2)));
        assert_eq!(nav.neighbors(2), (Some(1), None));
        assert_eq!(Navigator::new(1).neighbors(0), (None, None));
    }
}
