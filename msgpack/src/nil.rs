//! Pretending that a span decodes as nil.
//!
//! Decoders that walk a byte span field by field sometimes need to treat a missing field as if
//! it were present and nil (for example, to run the same "reset to default" path for both). A
//! [NilStack] swaps the span being decoded for a one-byte span holding nil, and restores the
//! real span afterwards:
//!
//! ```
//! use commonware_msgpack::{nil::NilStack, slice};
//!
//! let input = [0x01, 0x02];
//! let mut stack = NilStack::new();
//!
//! let b = stack.push(&input);
//! assert!(slice::is_nil(b));
//! let b = slice::read_nil(b).unwrap();
//! assert!(b.is_empty());
//!
//! let b = stack.pop();
//! assert_eq!(b, &input);
//! stack.finish();
//! ```
//!
//! Pushes and pops must nest. Popping an empty stack, or finishing one with pushes outstanding,
//! is a programming error and panics.

use crate::tag::NIL;

const NIL_SPAN: &[u8] = &[NIL];

/// A stack of suspended spans.
#[derive(Debug, Default)]
pub struct NilStack<'a> {
    saved: Vec<(bool, &'a [u8])>,
    pretending: bool,
}

impl<'a> NilStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends `rest` and returns a span holding a single nil.
    pub fn push(&mut self, rest: &'a [u8]) -> &'a [u8] {
        self.saved.push((self.pretending, rest));
        self.pretending = true;
        NIL_SPAN
    }

    /// Restores the span suspended by the matching [NilStack::push].
    ///
    /// # Panics
    ///
    /// Panics if there is no matching push.
    pub fn pop(&mut self) -> &'a [u8] {
        let Some((pretending, rest)) = self.saved.pop() else {
            panic!("nil stack popped without a matching push");
        };
        self.pretending = pretending;
        rest
    }

    /// Returns true while at least one push is outstanding.
    pub fn is_pretending(&self) -> bool {
        self.pretending
    }

    /// Returns the number of outstanding pushes.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Consumes the stack.
    ///
    /// # Panics
    ///
    /// Panics if any push was not popped.
    pub fn finish(self) {
        assert!(
            self.saved.is_empty(),
            "nil stack finished with {} outstanding pushes",
            self.saved.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice;

    #[test]
    fn test_nested() {
        let outer = [0x01u8];
        let inner = [0x02u8, 0x03];
        let mut stack = NilStack::new();
        assert!(!stack.is_pretending());

        let b = stack.push(&outer);
        assert!(slice::is_nil(b));
        let b = stack.push(&inner);
        assert_eq!(stack.depth(), 2);
        assert_eq!(
            slice::read_int(b).unwrap_err().to_string(),
            "type error: expected int, found nil"
        );

        assert_eq!(stack.pop(), &inner);
        assert!(stack.is_pretending());
        assert_eq!(stack.pop(), &outer);
        assert!(!stack.is_pretending());
        stack.finish();
    }

    #[test]
    #[should_panic(expected = "without a matching push")]
    fn test_pop_empty() {
        let mut stack = NilStack::new();
        stack.pop();
    }

    #[test]
    #[should_panic(expected = "outstanding pushes")]
    fn test_finish_unbalanced() {
        let mut stack = NilStack::new();
        stack.push(&[]);
        stack.finish();
    }
}
