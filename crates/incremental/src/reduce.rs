//! Event classification and application.
//!
//! `calculate_action` decides, for one change event, how a query's result
//! window changes. It only answers with a mutating action when the new window
//! is fully determined by the old window, the event and the query parameters;
//! every other case is `RunFullQueryAgain`.
//!
//! The window is the slice `[skip, skip + limit)` of the sorted matching set.
//! Two facts about the unseen parts of that set are used:
//!
//! - a bounded window shorter than its limit reached the end of the set, so
//!   nothing sorts after its tail;
//! - with `skip > 0`, exactly `skip` matching documents sort before the head.

use crate::action::Action;
use crate::window::ResultWindow;
use alloc::rc::Rc;
use core::cmp::Ordering;
use reflux_core::{ChangeEvent, ChangeOperation, Document};
use reflux_query::QueryParams;
use tracing::debug;

/// Result of running a batch of events through the engine.
#[derive(Clone, Debug)]
pub enum ReduceOutcome {
    /// No event changed the window.
    Unchanged,
    /// The window changed; this is the new window.
    Updated(ResultWindow),
    /// At least one event could not be applied; the query must run again.
    RunFullQueryAgain,
}

impl ReduceOutcome {
    pub fn is_run_full_query_again(&self) -> bool {
        matches!(self, ReduceOutcome::RunFullQueryAgain)
    }
}

/// Classifies one change event against the current window.
pub fn calculate_action(
    params: &QueryParams,
    event: &ChangeEvent,
    window: &ResultWindow,
) -> Action {
    if params.limit == Some(0) {
        return Action::DoNothing;
    }

    let next = match event.operation() {
        ChangeOperation::Delete => None,
        ChangeOperation::Insert | ChangeOperation::Update => event.document(),
    };
    let next = next.filter(|doc| params.matches(doc));

    match window.position_of(event.document_id(), params) {
        // An insert of a document the window already holds: the window is stale
        Some(_) if event.operation() == ChangeOperation::Insert => Action::RunFullQueryAgain,
        Some(pos) => match next {
            Some(next) => reposition(params, window, pos, next),
            None => remove_known(params, window, pos),
        },
        None => {
            let previous = match event.operation() {
                ChangeOperation::Insert => None,
                ChangeOperation::Update | ChangeOperation::Delete => event.previous(),
            };
            let previous = previous.filter(|doc| params.matches(doc));
            match (previous, next) {
                (None, None) => Action::DoNothing,
                (None, Some(next)) => insert_new(params, window, next),
                (Some(previous), None) => remove_outside(params, window, previous),
                (Some(previous), Some(next)) => move_outside(params, window, previous, next),
            }
        }
    }
}

/// Applies a mutating action to the window.
pub fn run_action(action: &Action, event: &ChangeEvent, window: &mut ResultWindow) {
    match *action {
        Action::DoNothing | Action::RunFullQueryAgain => {}
        Action::Insert { at, drop_last } => {
            if let Some(doc) = event.document() {
                window.insert_at(at, doc.clone());
                if drop_last {
                    window.pop_last();
                }
            }
        }
        Action::Remove { at } => {
            window.remove_at(at);
        }
        Action::Replace { from, to } => {
            if let Some(doc) = event.document() {
                window.remove_at(from);
                window.insert_at(to, doc.clone());
            }
        }
    }
}

/// Runs a batch of events through the engine, in order.
///
/// Each mutating action is applied to a working copy before the next event
/// is classified. The first `RunFullQueryAgain` discards the working copy.
/// The input window is never modified.
pub fn calculate_new_results(
    params: &QueryParams,
    events: &[ChangeEvent],
    window: &ResultWindow,
) -> ReduceOutcome {
    let mut working: Option<ResultWindow> = None;

    for event in events {
        let current = working.as_ref().unwrap_or(window);
        let action = calculate_action(params, event, current);
        debug!(
            action = action.name().as_str(),
            document_id = event.document_id(),
            sequence = event.sequence(),
            "classified change event"
        );

        match action {
            Action::DoNothing => {}
            Action::RunFullQueryAgain => return ReduceOutcome::RunFullQueryAgain,
            _ => {
                let target = working.get_or_insert_with(|| window.clone());
                run_action(&action, event, target);
            }
        }
    }

    match working {
        Some(window) => ReduceOutcome::Updated(window),
        None => ReduceOutcome::Unchanged,
    }
}

#[inline]
fn is_full(params: &QueryParams, window: &ResultWindow) -> bool {
    params.limit.is_some_and(|limit| window.len() >= limit)
}

/// Index at which `doc` sorts into the window, ignoring the entry at
/// `exclude`. `None` when the comparator ties `doc` with another document.
fn sort_position(
    params: &QueryParams,
    window: &ResultWindow,
    doc: &Document,
    exclude: Option<usize>,
) -> Option<usize> {
    let docs = window.documents();
    let pos = docs.partition_point(|candidate| params.compare(candidate, doc) == Ordering::Less);

    let mut i = pos;
    while i < docs.len() && params.compare(&docs[i], doc) == Ordering::Equal {
        if docs[i].id() != doc.id() {
            return None;
        }
        i += 1;
    }

    Some(match exclude {
        Some(ex) if ex < pos => pos - 1,
        _ => pos,
    })
}

/// The document stays in the window and still matches.
fn reposition(
    params: &QueryParams,
    window: &ResultWindow,
    pos: usize,
    next: &Rc<Document>,
) -> Action {
    let Some(to) = sort_position(params, window, next, Some(pos)) else {
        return Action::RunFullQueryAgain;
    };
    let current = &window.documents()[pos];
    let moved = params.compare(next, current);

    // Moving to the head past an unseen skipped document
    if params.skip_count() > 0 && to == 0 && moved == Ordering::Less {
        return Action::RunFullQueryAgain;
    }
    // Moving to the tail past an unseen document after the page
    if is_full(params, window) && to == window.len() - 1 && moved == Ordering::Greater {
        return Action::RunFullQueryAgain;
    }
    Action::Replace { from: pos, to }
}

/// The document was in the window and leaves the matching set.
fn remove_known(params: &QueryParams, window: &ResultWindow, pos: usize) -> Action {
    if is_full(params, window) {
        // The replacement for the vacated slot is not known
        Action::RunFullQueryAgain
    } else {
        Action::Remove { at: pos }
    }
}

/// A document enters the matching set.
fn insert_new(params: &QueryParams, window: &ResultWindow, next: &Rc<Document>) -> Action {
    let skip = params.skip_count();
    if window.is_empty() {
        // With skip == 0 an empty window means an empty matching set
        return if skip == 0 {
            Action::Insert { at: 0, drop_last: false }
        } else {
            Action::RunFullQueryAgain
        };
    }

    let Some(at) = sort_position(params, window, next, None) else {
        return Action::RunFullQueryAgain;
    };
    if skip > 0 && at == 0 {
        return Action::RunFullQueryAgain;
    }
    if is_full(params, window) {
        if at == window.len() {
            Action::DoNothing
        } else {
            Action::Insert { at, drop_last: true }
        }
    } else {
        Action::Insert { at, drop_last: false }
    }
}

/// A matching document that was not in the window leaves the matching set.
fn remove_outside(params: &QueryParams, window: &ResultWindow, previous: &Rc<Document>) -> Action {
    let skip = params.skip_count();
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        // The whole matching set fits in the skipped prefix and shrinks by one
        return if skip > 0 {
            Action::DoNothing
        } else {
            Action::RunFullQueryAgain
        };
    };

    if params.compare(previous, last) == Ordering::Greater {
        return if is_full(params, window) {
            Action::DoNothing
        } else {
            Action::RunFullQueryAgain
        };
    }
    if skip > 0 && params.compare(previous, first) == Ordering::Less {
        // The skipped prefix loses one document, so the window shifts left
        return if is_full(params, window) {
            Action::RunFullQueryAgain
        } else {
            Action::Remove { at: 0 }
        };
    }
    Action::RunFullQueryAgain
}

/// A matching document outside the window changes but keeps matching.
fn move_outside(
    params: &QueryParams,
    window: &ResultWindow,
    previous: &Rc<Document>,
    next: &Rc<Document>,
) -> Action {
    let skip = params.skip_count();
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return if skip > 0 {
            Action::DoNothing
        } else {
            Action::RunFullQueryAgain
        };
    };

    if is_full(params, window) && params.compare(previous, last) == Ordering::Greater {
        // Leaving the region after the page does not affect the window
        return insert_new(params, window, next);
    }
    if skip > 0 && params.compare(previous, first) == Ordering::Less {
        return if params.compare(next, first) == Ordering::Less {
            Action::DoNothing
        } else {
            Action::RunFullQueryAgain
        };
    }
    Action::RunFullQueryAgain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionName;
    use alloc::vec;
    use alloc::vec::Vec;
    use reflux_query::{
        DefaultQueryFunctions, HookRegistry, Query, QueryParamsResolver, QueryShape, Selector, SortField,
    };

    fn params(shape: QueryShape) -> Rc<QueryParams> {
        let resolver = QueryParamsResolver::new("id", Rc::new(HookRegistry::new()));
        resolver.resolve(&Query::new(shape).unwrap(), &DefaultQueryFunctions)
    }

    fn doc(id: &str, value: i64) -> Rc<Document> {
        Rc::new(Document::new(id).field("value", value))
    }

    fn by_value() -> QueryShape {
        QueryShape::new().sort_by(SortField::asc("value"))
    }

    fn ids(window: &ResultWindow) -> Vec<&str> {
        window.ids().collect()
    }

    #[test]
    fn test_insert_ahead_of_full_bounded_window() {
        let params = params(by_value().limit(2));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let event = ChangeEvent::insert(1, doc("D", 0));

        let action = calculate_action(&params, &event, &window);
        assert_eq!(action, Action::Insert { at: 0, drop_last: true });

        match calculate_new_results(&params, &[event], &window) {
            ReduceOutcome::Updated(next) => {
                assert_eq!(ids(&next), vec!["D", "A"]);
                assert!(next.is_consistent(&params));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_delete_requiring_unknown_replacement() {
        let params = params(by_value().limit(2));
        let b = doc("B", 2);
        let window = ResultWindow::from_sorted(vec![doc("A", 1), b.clone()]);
        let event = ChangeEvent::delete(1, b);

        assert_eq!(calculate_action(&params, &event, &window), Action::RunFullQueryAgain);
        assert!(calculate_new_results(&params, &[event], &window).is_run_full_query_again());
    }

    #[test]
    fn test_delete_without_pagination() {
        let params = params(by_value());
        let b = doc("B", 2);
        let window = ResultWindow::from_sorted(vec![doc("A", 1), b.clone(), doc("C", 3)]);
        let event = ChangeEvent::delete(1, b);

        assert_eq!(calculate_action(&params, &event, &window), Action::Remove { at: 1 });
        match calculate_new_results(&params, &[event], &window) {
            ReduceOutcome::Updated(next) => assert_eq!(ids(&next), vec!["A", "C"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_in_place_update_without_reorder() {
        let params = params(by_value());
        let a = doc("A", 1);
        let window = ResultWindow::from_sorted(vec![a.clone(), doc("B", 2)]);
        let updated = Rc::new(a.next_revision().field("note", "hello"));
        let event = ChangeEvent::update(1, a, updated.clone());

        assert_eq!(calculate_action(&params, &event, &window), Action::Replace { from: 0, to: 0 });
        match calculate_new_results(&params, &[event], &window) {
            ReduceOutcome::Updated(next) => {
                assert_eq!(ids(&next), vec!["A", "B"]);
                assert!(Rc::ptr_eq(next.get("A").unwrap(), &updated));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_non_matching_update_does_nothing() {
        let params = params(by_value().selector(Selector::lt("value", 10i64)));
        let window = ResultWindow::from_sorted(vec![doc("A", 1)]);
        let before = doc("X", 50);
        let after = Rc::new(before.next_revision().field("value", 60i64));
        let event = ChangeEvent::update(1, before, after);

        assert_eq!(calculate_action(&params, &event, &window), Action::DoNothing);
        assert!(matches!(
            calculate_new_results(&params, &[event], &window),
            ReduceOutcome::Unchanged
        ));
    }

    #[test]
    fn test_reorder_inside_unbounded_window() {
        let params = params(by_value());
        let a = doc("A", 1);
        let window = ResultWindow::from_sorted(vec![a.clone(), doc("B", 2), doc("C", 3)]);
        let moved = Rc::new(a.next_revision().field("value", 5i64));
        let event = ChangeEvent::update(1, a, moved);

        assert_eq!(calculate_action(&params, &event, &window), Action::Replace { from: 0, to: 2 });
        match calculate_new_results(&params, &[event], &window) {
            ReduceOutcome::Updated(next) => assert_eq!(ids(&next), vec!["B", "C", "A"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_tail_moving_past_bounded_window_requeries() {
        let params = params(by_value().limit(2));
        let b = doc("B", 2);
        let window = ResultWindow::from_sorted(vec![doc("A", 1), b.clone()]);
        let moved = Rc::new(b.next_revision().field("value", 9i64));
        let event = ChangeEvent::update(1, b, moved);

        assert_eq!(calculate_action(&params, &event, &window), Action::RunFullQueryAgain);
    }

    #[test]
    fn test_insert_after_full_window_is_outside_page() {
        let params = params(by_value().limit(2));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let event = ChangeEvent::insert(1, doc("Z", 100));
        assert_eq!(calculate_action(&params, &event, &window), Action::DoNothing);
    }

    #[test]
    fn test_insert_into_window_with_spare_capacity() {
        let params = params(by_value().limit(5));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let event = ChangeEvent::insert(1, doc("Z", 100));
        assert_eq!(
            calculate_action(&params, &event, &window),
            Action::Insert { at: 2, drop_last: false }
        );
    }

    #[test]
    fn test_remove_from_window_that_reached_the_end() {
        let params = params(by_value().limit(5));
        let b = doc("B", 2);
        let window = ResultWindow::from_sorted(vec![doc("A", 1), b.clone()]);
        let event = ChangeEvent::delete(1, b);
        assert_eq!(calculate_action(&params, &event, &window), Action::Remove { at: 1 });
    }

    #[test]
    fn test_skip_shifts_window_left_on_prefix_delete() {
        let params = params(by_value().skip(1));
        // Matching set is [P(0), A(1), B(2)]; skip 1 hides P
        let prefix = doc("P", 0);
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let event = ChangeEvent::delete(1, prefix);

        assert_eq!(calculate_action(&params, &event, &window), Action::Remove { at: 0 });
        match calculate_new_results(&params, &[event], &window) {
            ReduceOutcome::Updated(next) => assert_eq!(ids(&next), vec!["B"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_skip_insert_at_head_requeries() {
        let params = params(by_value().skip(1));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let event = ChangeEvent::insert(1, doc("N", -5));
        assert_eq!(calculate_action(&params, &event, &window), Action::RunFullQueryAgain);
    }

    #[test]
    fn test_limit_zero_never_changes() {
        let params = params(by_value().limit(0));
        let window = ResultWindow::new();
        let event = ChangeEvent::insert(1, doc("A", 1));
        assert_eq!(calculate_action(&params, &event, &window), Action::DoNothing);
    }

    #[test]
    fn test_insert_of_known_document_requeries() {
        let params = params(by_value());
        let a = doc("A", 1);
        let window = ResultWindow::from_sorted(vec![a.clone()]);
        let event = ChangeEvent::insert(1, a);
        assert_eq!(calculate_action(&params, &event, &window), Action::RunFullQueryAgain);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let params = params(by_value().limit(3));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let c = doc("C", 3);
        let events = vec![
            ChangeEvent::insert(1, c.clone()),
            ChangeEvent::insert(2, doc("D", 0)),
            ChangeEvent::update(3, c.clone(), Rc::new(c.next_revision().field("value", 1i64))),
        ];
        match calculate_new_results(&params, &events, &window) {
            ReduceOutcome::Updated(next) => {
                // C is pushed out by D, then sorts back in ahead of B
                assert_eq!(ids(&next), vec!["D", "A", "C"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_batch_aborts_on_first_full_requery() {
        let params = params(by_value().limit(2));
        let a = doc("A", 1);
        let window = ResultWindow::from_sorted(vec![a.clone(), doc("B", 2)]);
        let events = vec![
            ChangeEvent::insert(1, doc("D", 0)),
            ChangeEvent::delete(2, a),
            ChangeEvent::insert(3, doc("E", -1)),
        ];
        assert!(calculate_new_results(&params, &events, &window).is_run_full_query_again());
        // The input window is untouched
        assert_eq!(ids(&window), vec!["A", "B"]);
    }

    #[test]
    fn test_do_nothing_keeps_window_identity() {
        let params = params(by_value().limit(2));
        let window = ResultWindow::from_sorted(vec![doc("A", 1), doc("B", 2)]);
        let snapshot = window.clone();
        let event = ChangeEvent::insert(1, doc("Z", 99));
        let action = calculate_action(&params, &event, &window);
        assert_eq!(action.name(), ActionName::DoNothing);

        let mut applied = window.clone();
        run_action(&action, &event, &mut applied);
        assert!(applied.ptr_eq(&snapshot));
    }
}
