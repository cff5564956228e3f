//! Container context stacks for the decoder and encoder.
//!
//! One frame per open container tracks where we are in the
//! name/value alternation of objects, how many entries a definite-length
//! container still expects, and (optionally) which names have already
//! been seen for duplicate rejection.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CborError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Root,
    Array,
    Object,
}

impl ContextKind {
    pub(crate) fn type_desc(self) -> &'static str {
        match self {
            ContextKind::Root => "root",
            ContextKind::Array => "array",
            ContextKind::Object => "object",
        }
    }
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ReadFrame {
    kind: ContextKind,
    /// Declared entry count: elements for arrays, pairs for objects.
    /// `None` for indefinite-length containers and the root.
    expected: Option<u64>,
    /// Elements seen (arrays) or field names seen (objects).
    seen: u64,
    current_name: Option<Arc<str>>,
    dups: Option<HashSet<Arc<str>>>,
}

impl ReadFrame {
    fn new(kind: ContextKind, expected: Option<u64>, detect_dups: bool) -> Self {
        Self {
            kind,
            expected,
            seen: 0,
            current_name: None,
            dups: (detect_dups && kind == ContextKind::Object).then(HashSet::new),
        }
    }
}

/// The decoder's container stack; the bottom frame is the root.
#[derive(Debug)]
pub(crate) struct ReadContext {
    stack: Vec<ReadFrame>,
    detect_dups: bool,
}

impl ReadContext {
    pub(crate) fn new(detect_dups: bool) -> Self {
        Self {
            stack: vec![ReadFrame::new(ContextKind::Root, None, false)],
            detect_dups,
        }
    }

    fn top(&self) -> &ReadFrame {
        self.stack.last().expect("root frame never pops")
    }

    fn top_mut(&mut self) -> &mut ReadFrame {
        self.stack.last_mut().expect("root frame never pops")
    }

    pub(crate) fn kind(&self) -> ContextKind {
        self.top().kind
    }

    pub(crate) fn in_object(&self) -> bool {
        self.kind() == ContextKind::Object
    }

    pub(crate) fn enter_array(&mut self, expected: Option<u64>) {
        self.stack
            .push(ReadFrame::new(ContextKind::Array, expected, false));
    }

    pub(crate) fn enter_object(&mut self, expected: Option<u64>) {
        let detect = self.detect_dups;
        self.stack
            .push(ReadFrame::new(ContextKind::Object, expected, detect));
    }

    /// Pops the current container and returns its kind.
    pub(crate) fn exit(&mut self) -> ContextKind {
        debug_assert!(self.stack.len() > 1, "cannot exit the root");
        self.stack.pop().map(|f| f.kind).unwrap_or(ContextKind::Root)
    }

    /// False once a definite-length container has seen its declared
    /// entry count.
    pub(crate) fn expect_more_values(&self) -> bool {
        match self.top().expected {
            Some(expected) => self.top().seen < expected,
            None => true,
        }
    }

    pub(crate) fn has_expected_length(&self) -> bool {
        self.top().expected.is_some()
    }

    /// Counts one array element or one object pair (called at
    /// field-name decode time for objects).
    pub(crate) fn record_entry(&mut self) {
        self.top_mut().seen += 1;
    }

    pub(crate) fn set_current_name(&mut self, name: Arc<str>) -> Result<()> {
        let frame = self.top_mut();
        if let Some(dups) = frame.dups.as_mut() {
            if !dups.insert(Arc::clone(&name)) {
                return Err(CborError::DuplicateField(name.to_string()));
            }
        }
        frame.current_name = Some(name);
        Ok(())
    }

    /// Name on the current frame (the field whose value is being read).
    pub(crate) fn current_name(&self) -> Option<&Arc<str>> {
        self.top().current_name.as_ref()
    }

    /// Name on the parent frame; start-of-container events report the
    /// field the container was the value of.
    pub(crate) fn parent_name(&self) -> Option<&Arc<str>> {
        let len = self.stack.len();
        if len < 2 {
            return None;
        }
        self.stack[len - 2].current_name.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Write side
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct WriteFrame {
    kind: ContextKind,
    /// In an object: true after a field name, false after its value.
    expect_value: bool,
    /// Whether the container was opened with a declared length (and so
    /// closes without a break byte).
    definite: bool,
    dups: Option<HashSet<String>>,
}

/// The encoder's container stack, enforcing name-before-value
/// alternation.
#[derive(Debug)]
pub(crate) struct WriteContext {
    stack: Vec<WriteFrame>,
    detect_dups: bool,
}

impl WriteContext {
    pub(crate) fn new(detect_dups: bool) -> Self {
        Self {
            stack: vec![WriteFrame {
                kind: ContextKind::Root,
                expect_value: false,
                definite: false,
                dups: None,
            }],
            detect_dups,
        }
    }

    fn top(&self) -> &WriteFrame {
        self.stack.last().expect("root frame never pops")
    }

    pub(crate) fn kind(&self) -> ContextKind {
        self.top().kind
    }

    pub(crate) fn in_root(&self) -> bool {
        self.kind() == ContextKind::Root
    }

    /// Verifies that a value may be written here; in an object that
    /// means a field name came first.
    pub(crate) fn write_value(&mut self, what: &'static str) -> Result<()> {
        let frame = self.stack.last_mut().expect("root frame never pops");
        if frame.kind == ContextKind::Object {
            if !frame.expect_value {
                return Err(CborError::WriteContextViolation(format!(
                    "can not {what}, expecting a field name"
                )));
            }
            frame.expect_value = false;
        }
        Ok(())
    }

    pub(crate) fn write_field_name(&mut self, name: &str) -> Result<()> {
        let frame = self.stack.last_mut().expect("root frame never pops");
        if frame.kind != ContextKind::Object {
            return Err(CborError::WriteContextViolation(format!(
                "can not write a field name in {} context",
                frame.kind.type_desc()
            )));
        }
        if frame.expect_value {
            return Err(CborError::WriteContextViolation(
                "can not write a field name, expecting a value".into(),
            ));
        }
        if let Some(dups) = frame.dups.as_mut() {
            if !dups.insert(name.to_string()) {
                return Err(CborError::DuplicateField(name.to_string()));
            }
        }
        frame.expect_value = true;
        Ok(())
    }

    pub(crate) fn enter_array(&mut self, definite: bool) {
        self.stack.push(WriteFrame {
            kind: ContextKind::Array,
            expect_value: false,
            definite,
            dups: None,
        });
    }

    pub(crate) fn enter_object(&mut self, definite: bool) {
        let dups = self.detect_dups.then(HashSet::new);
        self.stack.push(WriteFrame {
            kind: ContextKind::Object,
            expect_value: false,
            definite,
            dups,
        });
    }

    /// Pops the current container, checking it matches `expected`;
    /// returns whether the container was definite-length.
    pub(crate) fn exit(&mut self, expected: ContextKind) -> Result<bool> {
        let top = self.top();
        if top.kind != expected {
            return Err(CborError::WriteContextViolation(format!(
                "current context not an {} but {}",
                expected.type_desc(),
                top.kind.type_desc()
            )));
        }
        if top.kind == ContextKind::Object && top.expect_value {
            return Err(CborError::WriteContextViolation(
                "can not end an object after a field name with no value".into(),
            ));
        }
        let definite = top.definite;
        self.stack.pop();
        Ok(definite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_definite_countdown() {
        let mut ctx = ReadContext::new(false);
        ctx.enter_array(Some(2));
        assert!(ctx.expect_more_values());
        ctx.record_entry();
        ctx.record_entry();
        assert!(!ctx.expect_more_values());
        assert_eq!(ctx.exit(), ContextKind::Array);
        assert_eq!(ctx.kind(), ContextKind::Root);
    }

    #[test]
    fn read_duplicate_names_rejected() {
        let mut ctx = ReadContext::new(true);
        ctx.enter_object(None);
        ctx.set_current_name(Arc::from("a")).unwrap();
        assert!(matches!(
            ctx.set_current_name(Arc::from("a")),
            Err(CborError::DuplicateField(_))
        ));
    }

    #[test]
    fn read_parent_name_for_container_start() {
        let mut ctx = ReadContext::new(false);
        ctx.enter_object(None);
        ctx.set_current_name(Arc::from("items")).unwrap();
        ctx.enter_array(None);
        assert_eq!(ctx.parent_name().map(|n| &**n), Some("items"));
        assert_eq!(ctx.current_name(), None);
    }

    #[test]
    fn write_value_requires_name_in_object() {
        let mut ctx = WriteContext::new(false);
        ctx.write_value("start an object").unwrap();
        ctx.enter_object(false);
        assert!(ctx.write_value("write number").is_err());
        ctx.write_field_name("n").unwrap();
        ctx.write_value("write number").unwrap();
        assert!(ctx.write_value("write number").is_err());
    }

    #[test]
    fn write_name_twice_is_rejected() {
        let mut ctx = WriteContext::new(false);
        ctx.enter_object(false);
        ctx.write_field_name("a").unwrap();
        assert!(ctx.write_field_name("b").is_err());
    }

    #[test]
    fn write_duplicate_detection() {
        let mut ctx = WriteContext::new(true);
        ctx.enter_object(false);
        ctx.write_field_name("a").unwrap();
        ctx.write_value("write number").unwrap();
        assert!(matches!(
            ctx.write_field_name("a"),
            Err(CborError::DuplicateField(_))
        ));
    }

    #[test]
    fn write_mismatched_end() {
        let mut ctx = WriteContext::new(false);
        ctx.enter_array(false);
        assert!(ctx.exit(ContextKind::Object).is_err());
        ctx.exit(ContextKind::Array).unwrap();
    }

    #[test]
    fn write_dangling_name_blocks_end() {
        let mut ctx = WriteContext::new(false);
        ctx.enter_object(false);
        ctx.write_field_name("a").unwrap();
        assert!(ctx.exit(ContextKind::Object).is_err());
    }
}
