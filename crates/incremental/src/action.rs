//! Actions chosen by the incremental engine for a single change event.

/// Name of an action, without its positional payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionName {
    DoNothing,
    Insert,
    Remove,
    Replace,
    RunFullQueryAgain,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::DoNothing => "doNothing",
            ActionName::Insert => "insert",
            ActionName::Remove => "remove",
            ActionName::Replace => "replace",
            ActionName::RunFullQueryAgain => "runFullQueryAgain",
        }
    }
}

/// What to do with a result window for one change event.
///
/// Positions refer to the window as it is before the action is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The event does not affect the window.
    DoNothing,
    /// Insert the event's document at `at`. When `drop_last` is set the
    /// window was full and its current tail leaves the page.
    Insert { at: usize, drop_last: bool },
    /// Drop the document at `at`; nothing takes its place.
    Remove { at: usize },
    /// Take the document at `from` out and put the event's document at `to`,
    /// where `to` is an index into the window without `from`.
    Replace { from: usize, to: usize },
    /// The new window cannot be derived from what the window knows.
    RunFullQueryAgain,
}

impl Action {
    pub fn name(&self) -> ActionName {
        match self {
            Action::DoNothing => ActionName::DoNothing,
            Action::Insert { .. } => ActionName::Insert,
            Action::Remove { .. } => ActionName::Remove,
            Action::Replace { .. } => ActionName::Replace,
            Action::RunFullQueryAgain => ActionName::RunFullQueryAgain,
        }
    }
}
