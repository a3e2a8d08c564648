//! Match driver: applies a compiled [`Pattern`] to a token sequence.
//!
//! A [`Matcher`] owns every piece of mutable match state — capture slots,
//! string captures, the find cursor, the live root iterator, the
//! already-returned span set, and the wall-clock deadline — so any number
//! of matchers can share one compiled pattern, including across threads.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::MatchError;
use crate::iter::EndIter;
use crate::pattern::{Capture, Pattern};
use crate::token::Token;

/// Time limit used by [`Matcher::matches`] and [`Matcher::find`] when no
/// explicit limit is given.
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// A matched capture group: the slot id, the span bounds, and the input the
/// span indexes into.
///
/// Groups are snapshots: the values are fixed when the group is returned,
/// so later calls on the matcher do not disturb them. Equality compares the
/// span bounds only.
pub struct CaptureGroup<'t, T> {
    id: usize,
    begin: usize,
    end: usize,
    input: &'t [T],
}

impl<'t, T> Clone for CaptureGroup<'t, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'t, T> Copy for CaptureGroup<'t, T> {}

impl<'t, T> CaptureGroup<'t, T> {
    /// The slot id; 0 is the whole match.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Begin index of the span, inclusive.
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// End index of the span, exclusive.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The matched tokens: the sub-slice of the input covered by the span.
    pub fn tokens(&self) -> &'t [T] {
        &self.input[self.begin..self.end]
    }
}

impl<T> PartialEq for CaptureGroup<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.begin == other.begin && self.end == other.end
    }
}

impl<T> Eq for CaptureGroup<'_, T> {}

impl<T> fmt::Debug for CaptureGroup<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

impl<T> fmt::Display for CaptureGroup<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.begin, self.end)
    }
}

/// Per-match mutable state shared with the pattern-node iterators.
pub(crate) struct MatchState {
    /// Capture spans, indexed by slot id; slot 0 is unused (the whole match
    /// lives on the matcher).
    slots: Vec<Option<(usize, usize)>>,
    /// Node identity → slot id, fixed at matcher construction.
    ids: HashMap<usize, usize>,
    /// Group name → slot ids carrying that name, in pre-order.
    names: HashMap<String, Vec<usize>>,
    /// Intra-token captures registered by value regexes.
    strings: HashMap<String, String>,
    /// Wall-clock instant after which the search unwinds with `Timeout`.
    deadline: Instant,
}

impl MatchState {
    pub(crate) fn new(pattern: &Pattern) -> MatchState {
        let mut ids = HashMap::new();
        let mut names: HashMap<String, Vec<usize>> = HashMap::new();
        pattern.for_each(&mut |node| match node.capture() {
            Capture::None => {}
            capture => {
                let id = ids.len() + 1;
                ids.insert(node.id(), id);
                if let Capture::Named(name) = capture {
                    names.entry(name.clone()).or_default().push(id);
                }
            }
        });
        MatchState {
            slots: vec![None; ids.len() + 1],
            ids,
            names,
            strings: HashMap::new(),
            deadline: Instant::now() + DEFAULT_TIME_LIMIT,
        }
    }

    /// Record a capture span for the node with the given identity.
    pub(crate) fn register(&mut self, node_id: usize, begin: usize, end: usize) {
        if let Some(&slot) = self.ids.get(&node_id)
            && let Some(entry) = self.slots.get_mut(slot)
        {
            *entry = Some((begin, end));
        }
    }

    /// Record an intra-token string capture from a value regex.
    pub(crate) fn register_string(&mut self, name: &str, value: &str) {
        self.strings.insert(name.to_string(), value.to_string());
    }

    #[cfg(test)]
    pub(crate) fn string_capture(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    /// Checked at the top of each backtracking priming pass; costs a clock
    /// read, so it stays off the per-predicate path.
    pub(crate) fn deadline_exceeded(&self) -> bool {
        Instant::now() > self.deadline
    }

    fn set_deadline(&mut self, limit: Duration) {
        self.deadline = Instant::now() + limit;
    }

    fn reset_captures(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.strings.clear();
    }
}

/// A matcher for a compiled pattern over one input sequence.
///
/// Created by [`Pattern::matcher`]. Two kinds of match are supported:
/// [`matches`](Matcher::matches) tests the entire input against the
/// pattern, and [`find`](Matcher::find) scans for the next matching
/// subsequence; the bounds of the current match are available through
/// [`start`](Matcher::start), [`end`](Matcher::end), and the capture-group
/// accessors.
pub struct Matcher<'t, T: Token> {
    pattern: Pattern,
    input: &'t [T],
    state: MatchState,
    /// The live root iterator driving `find`, seeded lazily per cursor.
    root: Option<EndIter>,
    /// The index `find` is currently searching from.
    cursor: usize,
    /// Bounds of the most recent successful match.
    current: Option<(usize, usize)>,
    /// Spans already reported from the current cursor.
    returned: HashSet<(usize, usize)>,
}

impl<'t, T: Token> Matcher<'t, T> {
    pub(crate) fn new(pattern: Pattern, input: &'t [T]) -> Matcher<'t, T> {
        let state = MatchState::new(&pattern);
        Matcher {
            pattern,
            input,
            state,
            root: None,
            cursor: 0,
            current: None,
            returned: HashSet::new(),
        }
    }

    /// Whether the pattern matches the entire input.
    pub fn matches(&mut self) -> Result<bool, MatchError> {
        self.matches_within(DEFAULT_TIME_LIMIT)
    }

    /// Whether the pattern matches the entire input, unwinding with
    /// [`MatchError::Timeout`] if the wall-clock limit passes first.
    pub fn matches_within(&mut self, time_limit: Duration) -> Result<bool, MatchError> {
        self.state.reset_captures();
        self.state.set_deadline(time_limit);
        let pattern = self.pattern.clone();
        let mut ends = pattern.consume(self.input, 0, &mut self.state)?;
        while let Some(end) = ends.next(self.input, &mut self.state)? {
            if end == self.input.len() {
                self.current = Some((0, self.input.len()));
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Find the next matching span; its bounds are then available from
    /// [`start`](Matcher::start) and [`end`](Matcher::end). Repeated calls
    /// enumerate every matching span, never reporting the same `(start,
    /// end)` pair twice.
    pub fn find(&mut self) -> Result<bool, MatchError> {
        self.find_within(DEFAULT_TIME_LIMIT)
    }

    /// [`find`](Matcher::find) with an explicit wall-clock limit.
    pub fn find_within(&mut self, time_limit: Duration) -> Result<bool, MatchError> {
        self.state.reset_captures();
        self.state.set_deadline(time_limit);
        loop {
            if self.root.is_none() {
                if self.cursor > self.input.len() {
                    self.current = None;
                    return Ok(false);
                }
                let pattern = self.pattern.clone();
                self.root = Some(pattern.consume(self.input, self.cursor, &mut self.state)?);
            }
            let next = match &mut self.root {
                Some(ends) => ends.next(self.input, &mut self.state)?,
                None => None,
            };
            match next {
                Some(end) => {
                    let span = (self.cursor, end);
                    if self.returned.insert(span) {
                        self.current = Some(span);
                        // Re-register the root's own slot so every slot
                        // reflects the span actually being reported, even
                        // if backtracking reassigned it along the way.
                        let pattern = self.pattern.clone();
                        pattern.register_match(span.0, span.1, &mut self.state);
                        return Ok(true);
                    }
                    // A duplicate span: drop whatever it registered and
                    // keep drawing.
                    self.state.reset_captures();
                }
                None => {
                    if self.cursor < self.input.len() {
                        self.cursor += 1;
                        self.root = None;
                        self.returned.clear();
                    } else {
                        self.current = None;
                        return Ok(false);
                    }
                }
            }
        }
    }

    /// Begin index (inclusive) of the current match.
    pub fn start(&self) -> Result<usize, MatchError> {
        self.current.map(|(begin, _)| begin).ok_or(MatchError::NoMatch)
    }

    /// End index (exclusive) of the current match.
    pub fn end(&self) -> Result<usize, MatchError> {
        self.current.map(|(_, end)| end).ok_or(MatchError::NoMatch)
    }

    /// The capture group at `index`, where 0 is the whole match.
    ///
    /// `Ok(None)` means the slot exists but did not participate in the
    /// current match. Calling this before a successful match is
    /// [`MatchError::NoMatch`]; an index past the last slot is
    /// [`MatchError::GroupOutOfBounds`].
    pub fn group(&self, index: usize) -> Result<Option<CaptureGroup<'t, T>>, MatchError> {
        let (begin, end) = self.current.ok_or(MatchError::NoMatch)?;
        if index == 0 {
            return Ok(Some(CaptureGroup {
                id: 0,
                begin,
                end,
                input: self.input,
            }));
        }
        match self.state.slots.get(index) {
            None => Err(MatchError::GroupOutOfBounds(index)),
            Some(slot) => Ok(slot.map(|(begin, end)| CaptureGroup {
                id: index,
                begin,
                end,
                input: self.input,
            })),
        }
    }

    /// The first matched capture group registered under `name`, or
    /// `Ok(None)` if no group by that name matched.
    pub fn group_named(&self, name: &str) -> Result<Option<CaptureGroup<'t, T>>, MatchError> {
        if self.current.is_none() {
            return Err(MatchError::NoMatch);
        }
        let Some(ids) = self.state.names.get(name) else {
            return Ok(None);
        };
        for &id in ids {
            if let Some(Some((begin, end))) = self.state.slots.get(id) {
                return Ok(Some(CaptureGroup {
                    id,
                    begin: *begin,
                    end: *end,
                    input: self.input,
                }));
            }
        }
        Ok(None)
    }

    /// All named capture groups that matched, as a snapshot map.
    pub fn named_capture_groups(&self) -> HashMap<String, CaptureGroup<'t, T>> {
        let mut groups = HashMap::new();
        for (name, ids) in &self.state.names {
            for &id in ids {
                if let Some(Some((begin, end))) = self.state.slots.get(id) {
                    groups.insert(
                        name.clone(),
                        CaptureGroup {
                            id,
                            begin: *begin,
                            end: *end,
                            input: self.input,
                        },
                    );
                }
            }
        }
        groups
    }

    /// Substring captures registered by named groups inside value regexes,
    /// as a snapshot map. Unlike token capture groups these cover a part of
    /// a single token's value, not a token span.
    pub fn string_capture_groups(&self) -> HashMap<String, String> {
        self.state.strings.clone()
    }

    /// Return the find cursor to the start of the input and clear the
    /// already-returned spans and capture slots.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.root = None;
        self.returned.clear();
        self.state.reset_captures();
    }
}
