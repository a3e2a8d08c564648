//! Lazy end-index iterators: the matching engine.
//!
//! Every pattern node answers `consume` with an [`EndIter`], the lazy
//! sequence of indices at which a match starting at some index could end.
//! Single-token nodes produce the allocation-free `One`/`Empty` variants;
//! sequences, conjunctions, and disjunctions produce real iterators that do
//! their work in `next`.

use crate::error::MatchError;
use crate::matcher::MatchState;
use crate::pattern::{Node, Parts, Pattern};
use crate::token::Token;

/// The lazy sequence of end indices produced by `Pattern::consume`.
pub(crate) enum EndIter {
    Empty,
    /// Exactly one end index, materialised up front. This is the engine's
    /// single-value fast path; because the value is stored by copy it is
    /// always safe to keep on a backtracking stack.
    One(usize),
    Seq(Box<SeqIter>),
    Disj(Box<DisjIter>),
    Conj(Box<ConjIter>),
}

impl EndIter {
    /// Draw the next end index. Exhausted iterators keep returning
    /// `Ok(None)` (fused).
    pub(crate) fn next<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<Option<usize>, MatchError> {
        match self {
            EndIter::Empty => Ok(None),
            EndIter::One(value) => {
                let value = *value;
                *self = EndIter::Empty;
                Ok(Some(value))
            }
            EndIter::Seq(iter) => iter.next(input, state),
            EndIter::Disj(iter) => iter.next(input, state),
            EndIter::Conj(iter) => iter.next(input, state),
        }
    }

    /// True for iterators that can never yield more than one value in
    /// total. Sequence and combinator iterators are never single-valued,
    /// even once exhausted.
    pub(crate) fn is_single_valued(&self) -> bool {
        matches!(self, EndIter::Empty | EndIter::One(_))
    }
}

// ─── Sequence / repeat ──────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum SeqState {
    NeverPrimed,
    HaveMatch,
    BranchExhausted,
    Exhausted,
}

/// A decision point in the backtracking search: a component matched at
/// `index` after `count` components were already consumed, and
/// `alternatives` holds its remaining possible ends. An `Empty` iterator
/// here is the stop-here sentinel: not matching this component at all is a
/// valid outcome.
struct Branch {
    index: usize,
    alternatives: EndIter,
    count: u32,
}

/// Backtracking iterator for a sequence node: either an ordered list of
/// components matched once each, or one component matched `min..=max`
/// times. Yields greedily (longest end first) unless the node is reluctant.
pub(crate) struct SeqIter {
    source: Pattern,
    min: u32,
    max: u32,
    reluctant: bool,
    initial: usize,
    next_index: usize,
    state: SeqState,
    stack: Vec<Branch>,
    // Cursor of the reluctant search; unused by the greedy form.
    rel_index: usize,
    rel_count: u32,
}

impl SeqIter {
    pub(crate) fn new(source: Pattern, initial: usize) -> SeqIter {
        let (min, max, reluctant) = match source.node() {
            Node::Sequence {
                min, max, reluctant, ..
            } => (*min, *max, *reluctant),
            _ => unreachable!("sequence iterator over a non-sequence node"),
        };
        SeqIter {
            source,
            min,
            max,
            reluctant,
            initial,
            next_index: initial,
            state: SeqState::NeverPrimed,
            stack: Vec::new(),
            rel_index: initial,
            rel_count: 0,
        }
    }

    /// The component to match after `count` components have been consumed.
    fn component(&self, count: u32) -> Pattern {
        match self.source.node() {
            Node::Sequence {
                parts: Parts::List(parts),
                ..
            } => parts[count as usize].clone(),
            Node::Sequence {
                parts: Parts::Repeat(part),
                ..
            } => part.clone(),
            _ => unreachable!("sequence iterator over a non-sequence node"),
        }
    }

    fn is_list(&self) -> bool {
        matches!(
            self.source.node(),
            Node::Sequence {
                parts: Parts::List(_),
                ..
            }
        )
    }

    pub(crate) fn next<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<Option<usize>, MatchError> {
        loop {
            match self.state {
                SeqState::HaveMatch => {
                    self.state = SeqState::BranchExhausted;
                    // Register only when a value is actually returned, so a
                    // capture slot never reflects a merely-peeked match.
                    self.source.register_match(self.initial, self.next_index, state);
                    return Ok(Some(self.next_index));
                }
                SeqState::Exhausted => return Ok(None),
                _ => {
                    if self.reluctant {
                        self.prime_reluctant(input, state)?;
                    } else {
                        self.prime_eager(input, state)?;
                    }
                }
            }
        }
    }

    /// Run one branch of the search as far as it will greedily go, pushing
    /// every untaken alternative onto the stack. Leaves the state at
    /// `HaveMatch` or `BranchExhausted`.
    fn prime_branch_eager<T: Token>(
        &mut self,
        start: usize,
        consumed: u32,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<(), MatchError> {
        // The deadline check sits here, at the top of every priming pass:
        // frequent enough to bound runaway searches, rare enough to stay off
        // the per-predicate path.
        if state.deadline_exceeded() {
            return Err(MatchError::Timeout);
        }
        let mut index = start;
        let mut count = consumed;
        // `index <= input.len()` admits terminal zero-width matches.
        while count < self.max && index <= input.len() {
            let component = self.component(count);
            let mut ends = component.consume(input, index, state)?;
            let Some(end) = ends.next(input, state)? else {
                break;
            };
            let before = index;
            index = end;
            if !ends.is_single_valued() {
                self.stack.push(Branch {
                    index: before,
                    alternatives: ends,
                    count,
                });
            } else if count >= self.min {
                // Stopping before this component is itself a valid match;
                // record that with an empty-alternatives sentinel.
                self.stack.push(Branch {
                    index: before,
                    alternatives: EndIter::Empty,
                    count,
                });
            }
            if count + 1 >= self.min {
                self.next_index = index;
            }
            count += 1;
        }
        self.state = if count < self.min || count > self.max {
            SeqState::BranchExhausted
        } else {
            SeqState::HaveMatch
        };
        Ok(())
    }

    /// The greedy backtracking search: longest match first, then resume
    /// saved branches in stack order. Leaves the state at `HaveMatch` or
    /// `Exhausted`.
    fn prime_eager<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<(), MatchError> {
        if self.state == SeqState::NeverPrimed {
            let start = self.next_index;
            self.prime_branch_eager(start, 0, input, state)?;
        }
        while self.state == SeqState::BranchExhausted {
            let Some(mut branch) = self.stack.pop() else {
                break;
            };
            match branch.alternatives.next(input, state)? {
                Some(end) => {
                    self.next_index = end;
                    let count = branch.count;
                    self.stack.push(branch);
                    self.prime_branch_eager(end, count + 1, input, state)?;
                }
                None => {
                    // Only reachable for stop-here sentinels and drained
                    // alternative iterators; both are valid stops when
                    // enough components matched.
                    if branch.count >= self.min {
                        self.next_index = branch.index;
                        self.state = SeqState::HaveMatch;
                    }
                }
            }
        }
        if self.state == SeqState::BranchExhausted {
            self.state = SeqState::Exhausted;
        }
        Ok(())
    }

    /// The reluctant search: shortest match first, extending one component
    /// at a time and backtracking through saved branches before extending
    /// further. Leaves the state at `HaveMatch` or `Exhausted`.
    fn prime_reluctant<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<(), MatchError> {
        if self.state == SeqState::NeverPrimed {
            if self.min == 0 {
                // Matching nothing is the shortest valid match.
                self.state = SeqState::HaveMatch;
                return Ok(());
            }
            self.state = SeqState::BranchExhausted;
        }
        while self.state == SeqState::BranchExhausted {
            if state.deadline_exceeded() {
                return Err(MatchError::Timeout);
            }
            let index = self.rel_index;
            let count = self.rel_count;
            if count < self.max && index <= input.len() {
                let component = self.component(count);
                let mut ends = component.consume(input, index, state)?;
                if let Some(end) = ends.next(input, state)? {
                    self.rel_index = end;
                    self.rel_count += 1;
                    if !ends.is_single_valued() {
                        self.stack.push(Branch {
                            index,
                            alternatives: ends,
                            count,
                        });
                    }
                    if self.rel_count >= self.min {
                        self.state = SeqState::HaveMatch;
                        self.next_index = end;
                        return Ok(());
                    }
                    // Keep extending only when the component consumed input
                    // or a different component comes next; otherwise a
                    // zero-width component would extend forever.
                    if end > index || self.is_list() {
                        continue;
                    }
                }
            }
            match self.stack.pop() {
                Some(mut branch) => {
                    if let Some(end) = branch.alternatives.next(input, state)? {
                        self.rel_index = end;
                        self.rel_count = branch.count + 1;
                        self.stack.push(branch);
                        if self.rel_count >= self.min {
                            self.state = SeqState::HaveMatch;
                            self.next_index = end;
                            return Ok(());
                        }
                    }
                    // A drained branch is skipped; the loop continues the
                    // search from the restored position.
                }
                None => self.state = SeqState::Exhausted,
            }
        }
        Ok(())
    }
}

// ─── Disjunction ────────────────────────────────────────────────────────────

/// Iterator over `lhs | rhs`: every end of the left side, then every end of
/// the right side, deduplicated by end index (the start index is fixed per
/// `consume` call).
pub(crate) struct DisjIter {
    source: Pattern,
    initial: usize,
    lhs: EndIter,
    rhs: EndIter,
    seen: IndexSet,
}

impl DisjIter {
    pub(crate) fn new(source: Pattern, initial: usize, lhs: EndIter, rhs: EndIter) -> DisjIter {
        DisjIter {
            source,
            initial,
            lhs,
            rhs,
            seen: IndexSet::new(),
        }
    }

    pub(crate) fn next<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<Option<usize>, MatchError> {
        loop {
            let end = match self.lhs.next(input, state)? {
                Some(end) => end,
                None => match self.rhs.next(input, state)? {
                    Some(end) => end,
                    None => return Ok(None),
                },
            };
            if self.seen.insert(end) {
                self.source.register_match(self.initial, end, state);
                return Ok(Some(end));
            }
        }
    }
}

// ─── Conjunction ────────────────────────────────────────────────────────────

/// Iterator over `lhs & rhs`: yields every end index reported by both
/// sides. Pulls are interleaved, always drawing from the side whose known
/// minimum is larger, so agreement is detected as early as possible.
pub(crate) struct ConjIter {
    source: Pattern,
    initial: usize,
    lhs: EndIter,
    rhs: EndIter,
    lhs_done: bool,
    rhs_done: bool,
    lhs_seen: IndexSet,
    rhs_seen: IndexSet,
    lhs_min: usize,
    rhs_min: usize,
    pending: Option<usize>,
}

impl ConjIter {
    pub(crate) fn new(
        source: Pattern,
        initial: usize,
        lhs_first: usize,
        rhs_first: usize,
        lhs: EndIter,
        rhs: EndIter,
    ) -> ConjIter {
        let mut lhs_seen = IndexSet::new();
        let mut rhs_seen = IndexSet::new();
        lhs_seen.insert(lhs_first);
        rhs_seen.insert(rhs_first);
        ConjIter {
            source,
            initial,
            lhs,
            rhs,
            lhs_done: false,
            rhs_done: false,
            lhs_seen,
            rhs_seen,
            lhs_min: usize::MAX,
            rhs_min: usize::MAX,
            pending: (lhs_first == rhs_first).then_some(lhs_first),
        }
    }

    pub(crate) fn next<T: Token>(
        &mut self,
        input: &[T],
        state: &mut MatchState,
    ) -> Result<Option<usize>, MatchError> {
        if self.pending.is_none() {
            self.prime(input, state)?;
        }
        match self.pending.take() {
            Some(end) => {
                self.source.register_match(self.initial, end, state);
                Ok(Some(end))
            }
            None => Ok(None),
        }
    }

    fn prime<T: Token>(&mut self, input: &[T], state: &mut MatchState) -> Result<(), MatchError> {
        while !self.lhs_done || !self.rhs_done {
            let pull_lhs = !self.lhs_done && (self.lhs_min > self.rhs_min || self.rhs_done);
            let pulled = if pull_lhs {
                self.lhs.next(input, state)?
            } else {
                self.rhs.next(input, state)?
            };
            match pulled {
                None => {
                    if pull_lhs {
                        self.lhs_done = true;
                    } else {
                        self.rhs_done = true;
                    }
                }
                Some(end) => {
                    if pull_lhs {
                        self.lhs_min = self.lhs_min.min(end);
                        self.lhs_seen.insert(end);
                    } else {
                        self.rhs_min = self.rhs_min.min(end);
                        self.rhs_seen.insert(end);
                    }
                    if self.lhs_seen.contains(end) && self.rhs_seen.contains(end) {
                        self.pending = Some(end);
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

// ─── Index set ──────────────────────────────────────────────────────────────

/// A set of small indices: a single `u64` mask that migrates to a growable
/// bitset (copying the mask) once an index above 63 is inserted.
pub(crate) struct IndexSet {
    small: u64,
    large: Option<Vec<u64>>,
}

impl IndexSet {
    pub(crate) fn new() -> IndexSet {
        IndexSet {
            small: 0,
            large: None,
        }
    }

    /// Insert `index`; true if it was not already present.
    pub(crate) fn insert(&mut self, index: usize) -> bool {
        if self.large.is_none() && index < 64 {
            let bit = 1u64 << index;
            if self.small & bit != 0 {
                return false;
            }
            self.small |= bit;
            return true;
        }
        let small = self.small;
        let words = self.large.get_or_insert_with(|| vec![small]);
        let word = index / 64;
        let bit = 1u64 << (index % 64);
        if words.len() <= word {
            words.resize(word + 1, 0);
        }
        if words[word] & bit != 0 {
            false
        } else {
            words[word] |= bit;
            true
        }
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        match &self.large {
            Some(words) => words
                .get(index / 64)
                .is_some_and(|word| word & (1u64 << (index % 64)) != 0),
            None => index < 64 && self.small & (1u64 << index) != 0,
        }
    }
}
