//! Failure message composition.
//!
//! A `must_be` failure message is built while the directives run. Directive
//! families either *append* a clause to the running sentence
//! (`"must be greater than 10 less than 20"`) or *replace* it with a sentence
//! of a different shape (`": '7' is not a valid value"`). Later directives
//! keep composing on top of whichever form is current.

/// Prefix every appended sentence starts from.
pub const MESSAGE_PREFIX: &str = "must be";

/// How a directive family contributes to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    Append,
    Replace,
}

/// Directive families, in the order a rule evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Blank,
    Present,
    OneOf,
    NotAnyOf,
    OnlyFrom,
    Before,
    After,
    Comparison,
    When,
    ShowValues,
}

impl Directive {
    pub fn composition(self) -> Composition {
        match self {
            Directive::OneOf
            | Directive::NotAnyOf
            | Directive::OnlyFrom
            | Directive::Before
            | Directive::After => Composition::Replace,
            Directive::Blank
            | Directive::Present
            | Directive::Comparison
            | Directive::When
            | Directive::ShowValues => Composition::Append,
        }
    }
}

/// The running message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageState {
    /// Still the `"must be ..."` sentence.
    Prefixed(String),
    /// Replaced by a directive with its own sentence shape.
    Replaced(String),
}

impl Default for MessageState {
    fn default() -> Self {
        MessageState::Prefixed(MESSAGE_PREFIX.to_string())
    }
}

impl MessageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one directive's text according to its composition.
    pub fn apply(&mut self, directive: Directive, text: impl Into<String>) {
        match directive.composition() {
            Composition::Append => self.append(&text.into()),
            Composition::Replace => self.replace(text),
        }
    }

    pub fn append(&mut self, clause: &str) {
        match self {
            MessageState::Prefixed(s) | MessageState::Replaced(s) => s.push_str(clause),
        }
    }

    pub fn replace(&mut self, message: impl Into<String>) {
        *self = MessageState::Replaced(message.into());
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageState::Prefixed(s) | MessageState::Replaced(s) => s,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, MessageState::Replaced(_))
    }

    /// The final sentence, terminated with a period.
    pub fn finish(self) -> String {
        let mut s = match self {
            MessageState::Prefixed(s) | MessageState::Replaced(s) => s,
        };
        s.push('.');
        s
    }
}
