//! The mode-stack parser's side-band state.
//!
//! A `State` is a pair of bitmasks (`flags`, the modes currently active;
//! `flags_all`, modes active including ones made transparent by an
//! enclosing construct) plus a call stack of rule identifiers used to
//! recover a human-readable parse trace on error. `ModeStack` is an
//! explicit stack of these frames so the parser can push a child state,
//! parse a nested construct, and pop back to the parent's modes without
//! manually saving/restoring flags at every call site.
//!
//! `Span` and `Located<T>` attach a byte range into the character buffer
//! to a value, for error reporting and position tracking.

use std::fmt;

use super::bits::bitflags_like;

bitflags_like! {
    /// Parser mode flags. Tested with [`ModeStack::in_mode`] and
    /// [`ModeStack::in_transparent_mode`] to decide grammar productions
    /// without threading extra parameters through every recursive call.
    pub struct Mode: u64 {
        /// Parsing the parameter list of a function declaration.
        const IN_PARAMETER_LIST = 1 << 0;
        /// Parsing an argument list (call-site, not a declaration).
        const IN_ARGUMENT_LIST = 1 << 1;
        /// Parsing a template/generic argument list (`Foo<Bar>`).
        const IN_TEMPLATE_ARG_LIST = 1 << 2;
        /// Inside a class/struct/union body.
        const IN_CLASS_BODY = 1 << 3;
        /// Inside an enum body.
        const IN_ENUM_BODY = 1 << 4;
        /// Inside the three clauses of a C-style `for` control.
        const IN_FOR_CONTROL = 1 << 5;
        /// Inside an `if`/`while`/`switch` condition.
        const IN_CONDITION = 1 << 6;
        /// The next construct is expected to be a block (`{ ... }` or a
        /// single unbraced statement).
        const EXPECT_BLOCK = 1 << 7;
        /// The next construct is expected to be an expression.
        const EXPECT_EXPRESSION = 1 << 8;
        /// Inside a `using` declaration/directive.
        const IN_USING = 1 << 9;
        /// Inside a preprocessor directive line.
        const IN_PREPROCESSOR = 1 << 10;
        /// Inside a preprocessor branch whose condition is statically
        /// known to be false (`#if 0`); text-only unless
        /// [`super::options::Options::CPP_MARKUP_IF0`] is set.
        const IN_PREPROCESSOR_DEAD_BRANCH = 1 << 11;
        /// Inside a `/* ... */` block comment.
        const IN_BLOCK_COMMENT = 1 << 12;
        /// A `<` just lexed could open a template argument list; resolved
        /// by the matching-`>` heuristic in `parse::template`.
        const IN_TEMPLATE_POSSIBLE = 1 << 13;
        /// At the top level of a translation unit.
        const IN_UNIT = 1 << 14;
        /// Inside a function/method body block.
        const IN_FUNCTION_BODY = 1 << 15;
        /// Inside an initializer (`= ...` or `{ ... }` after a declarator).
        const IN_INITIALIZER = 1 << 16;
        /// Inside a lambda/anonymous-function body (C++11 and later, or
        /// Java/C# equivalents).
        const IN_LAMBDA = 1 << 17;
        /// Inside an `extern "C" { ... }` linkage block.
        const IN_EXTERN_BLOCK = 1 << 18;
        /// Inside a `namespace { ... }` block.
        const IN_NAMESPACE_BLOCK = 1 << 19;
    }
}

/// Identifies a grammar production on the parser's call stack, used only
/// to build a readable trace for [`super::parse::ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    /// The top-level unit production.
    Unit,
    /// A single statement.
    Statement,
    /// An expression.
    Expression,
    /// A declaration (variable, typedef, using).
    Declaration,
    /// A function declaration or definition.
    Function,
    /// A class/struct/union/interface declaration.
    Class,
    /// An enum declaration.
    Enum,
    /// A braced block.
    Block,
    /// A preprocessor directive.
    Preprocessor,
    /// A template/generic parameter or argument list.
    Template,
}

/// One frame of mode-stack parser state: the modes directly active on
/// this frame (`mode`) and the modes active including transparently
/// inherited ones (`transparent_mode`), plus the call stack of
/// [`RuleId`]s entered to reach here.
#[derive(Debug, Clone, Default)]
pub struct State {
    mode: Mode,
    transparent_mode: Mode,
    call_stack: Vec<RuleId>,
}

impl State {
    /// Builds a state with the given starting mode and transparent mode.
    #[must_use]
    pub fn new(mode: Mode, transparent_mode: Mode) -> Self {
        Self {
            mode,
            transparent_mode: transparent_mode.union(mode),
            call_stack: Vec::new(),
        }
    }

    /// Returns whether every bit of `m` is active in `mode`.
    #[must_use]
    pub fn in_mode(&self, m: Mode) -> bool {
        self.mode.contains(m)
    }

    /// Returns whether every bit of `m` is active in `transparent_mode`.
    #[must_use]
    pub fn in_transparent_mode(&self, m: Mode) -> bool {
        self.transparent_mode.contains(m)
    }

    /// The directly active modes.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The transparently active modes.
    #[must_use]
    pub fn transparent_mode(&self) -> Mode {
        self.transparent_mode
    }

    /// Sets every bit of `m` in both `mode` and `transparent_mode`.
    pub fn set_mode(&mut self, m: Mode) {
        self.mode |= m;
        self.transparent_mode |= m;
    }

    /// Clears every bit of `m` from both `mode` and `transparent_mode`.
    pub fn clear_mode(&mut self, m: Mode) {
        self.mode = self.mode.difference(m);
        self.transparent_mode = self.transparent_mode.difference(m);
    }

    /// Pushes a rule identifier onto this frame's call stack.
    pub fn push_rule(&mut self, id: RuleId) {
        self.call_stack.push(id);
    }

    /// Pops the most recently pushed rule identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PopOnEmptyCallStack`] if the call stack is already
    /// empty.
    pub fn pop_rule(&mut self) -> Result<RuleId, PopOnEmptyCallStack> {
        self.call_stack.pop().ok_or(PopOnEmptyCallStack)
    }

    /// The current call stack, outermost rule first.
    #[must_use]
    pub fn call_stack(&self) -> &[RuleId] {
        &self.call_stack
    }
}

/// A rule tried to pop a call stack frame that was never pushed — an
/// internal parser invariant violation, not a malformed-input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopOnEmptyCallStack;

impl fmt::Display for PopOnEmptyCallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("popped a parser call stack frame that was never pushed")
    }
}

impl std::error::Error for PopOnEmptyCallStack {}

/// A stack of [`State`] frames. The parser pushes a child frame before
/// entering a nested construct that changes which modes are active, and
/// pops it on return, so sibling productions never see a mode left set
/// by a construct that has already finished.
#[derive(Debug, Clone, Default)]
pub struct ModeStack {
    frames: Vec<State>,
}

impl ModeStack {
    /// Builds a stack with a single frame in the given starting mode.
    #[must_use]
    pub fn new(starting_mode: Mode) -> Self {
        Self {
            frames: vec![State::new(starting_mode, Mode::NONE)],
        }
    }

    /// The currently active (topmost) frame.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty, which cannot happen: [`Self::new`]
    /// seeds one frame and [`Self::pop`] refuses to remove the last one.
    #[must_use]
    pub fn top(&self) -> &State {
        self.frames.last().expect("mode stack is never empty")
    }

    /// Mutable access to the currently active frame.
    #[must_use]
    pub fn top_mut(&mut self) -> &mut State {
        self.frames.last_mut().expect("mode stack is never empty")
    }

    /// Pushes a new frame inheriting the current frame's mode and
    /// transparent mode, then ORing in `additional`.
    pub fn push(&mut self, additional: Mode) {
        let parent = self.top();
        let mode = parent.mode.union(additional);
        let transparent_mode = parent.transparent_mode.union(additional);
        self.frames.push(State::new(mode, transparent_mode));
    }

    /// Pops the topmost frame.
    ///
    /// # Errors
    ///
    /// Returns [`PopOnEmptyCallStack`] if only one frame remains; the
    /// root frame always stays and is never itself destroyed mid-parse.
    pub fn pop(&mut self) -> Result<State, PopOnEmptyCallStack> {
        if self.frames.len() <= 1 {
            return Err(PopOnEmptyCallStack);
        }
        Ok(self.frames.pop().expect("checked len above"))
    }

    /// Shorthand for `self.top().in_mode(m)`.
    #[must_use]
    pub fn in_mode(&self, m: Mode) -> bool {
        self.top().in_mode(m)
    }

    /// Shorthand for `self.top().in_transparent_mode(m)`.
    #[must_use]
    pub fn in_transparent_mode(&self, m: Mode) -> bool {
        self.top().in_transparent_mode(m)
    }

    /// Shorthand for `self.top_mut().set_mode(m)`.
    pub fn set_mode(&mut self, m: Mode) {
        self.top_mut().set_mode(m);
    }

    /// Shorthand for `self.top_mut().clear_mode(m)`.
    pub fn clear_mode(&mut self, m: Mode) {
        self.top_mut().clear_mode(m);
    }

    /// The number of frames currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// A half-open byte range `[start, end)` into the character buffer being
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// Start byte offset, inclusive.
    pub start: usize,
    /// End byte offset, exclusive.
    pub end: usize,
}

impl Span {
    /// Builds a span from a start/end byte offset pair.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span covers zero bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slices `source` by this span.
    ///
    /// # Panics
    ///
    /// Panics if the span's bounds fall outside `source` or do not lie
    /// on a UTF-8 character boundary.
    #[must_use]
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// A value paired with the [`Span`] of source text it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Located<T> {
    content: T,
    span: Span,
}

impl<T> Located<T> {
    /// Pairs `content` with `span`.
    #[must_use]
    pub const fn new(content: T, span: Span) -> Self {
        Self { content, span }
    }

    /// The wrapped content.
    #[must_use]
    pub const fn content(&self) -> &T {
        &self.content
    }

    /// Unwraps the content, discarding the span.
    #[must_use]
    pub fn into_content(self) -> T {
        self.content
    }

    /// The span this content came from.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    /// Maps the content, keeping the same span.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Located<U> {
        Located::new(f(self.content), self.span)
    }
}

impl<T: fmt::Display> fmt::Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at [{}, {})", self.content, self.span.start, self.span.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_inherits_parent_mode() {
        let mut stack = ModeStack::new(Mode::IN_UNIT);
        stack.push(Mode::IN_CLASS_BODY);
        assert!(stack.in_mode(Mode::IN_UNIT));
        assert!(stack.in_mode(Mode::IN_CLASS_BODY));
    }

    #[test]
    fn pop_restores_parent_state() {
        let mut stack = ModeStack::new(Mode::IN_UNIT);
        stack.push(Mode::IN_CLASS_BODY);
        stack.pop().unwrap();
        assert!(stack.in_mode(Mode::IN_UNIT));
        assert!(!stack.in_mode(Mode::IN_CLASS_BODY));
    }

    #[test]
    fn pop_root_frame_is_invariant_violation() {
        let mut stack = ModeStack::new(Mode::IN_UNIT);
        assert_eq!(stack.pop(), Err(PopOnEmptyCallStack));
    }

    #[test]
    fn clear_mode_clears_transparent_too() {
        let mut state = State::new(Mode::NONE, Mode::NONE);
        state.set_mode(Mode::IN_FOR_CONTROL);
        assert!(state.in_transparent_mode(Mode::IN_FOR_CONTROL));
        state.clear_mode(Mode::IN_FOR_CONTROL);
        assert!(!state.in_mode(Mode::IN_FOR_CONTROL));
        assert!(!state.in_transparent_mode(Mode::IN_FOR_CONTROL));
    }

    #[test]
    fn span_slices_source() {
        let src = "int x;";
        let span = Span::new(0, 3);
        assert_eq!(span.slice(src), "int");
    }

    #[test]
    fn located_map_preserves_span() {
        let loc = Located::new(1u32, Span::new(0, 1));
        let mapped = loc.map(|n| n + 1);
        assert_eq!(*mapped.content(), 2);
        assert_eq!(mapped.span(), Span::new(0, 1));
    }
}
