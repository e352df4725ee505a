//! Cause chain and stack field rendering.

use crate::context::SERIALIZATION_FAILED;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::Write;

/// Maximum number of errors rendered from a cause chain.
pub const MAX_CAUSE_DEPTH: usize = 10;

/// Stack field written when backtrace capture is disabled.
pub const STACK_UNAVAILABLE: &str = "stack trace unavailable";

/// Longest stack field written, in bytes. Longer captures are cut at a
/// character boundary.
pub const MAX_STACK_LENGTH: usize = 2048;

/// Fallback type label for errors whose `Debug` output has no leading name.
const UNNAMED: &str = "Error";

/// Render `cause` and its `source()` chain, outermost first.
///
/// Each error becomes one `[type, message],` group. At most
/// [`MAX_CAUSE_DEPTH`] groups are written. A message whose `Display`
/// fails is written as [`SERIALIZATION_FAILED`].
pub fn cause_messages(cause: &(dyn Error + 'static)) -> String {
    let mut out = String::new();
    let mut message = String::new();
    let mut next = Some(cause);
    let mut depth = 0;
    while let Some(err) = next {
        if depth == MAX_CAUSE_DEPTH {
            break;
        }
        message.clear();
        if write!(message, "{err}").is_err() {
            message.clear();
            message.push_str(SERIALIZATION_FAILED);
        }
        out.push('[');
        out.push_str(&type_label(err));
        out.push_str(", ");
        out.push_str(&message);
        out.push_str("],");
        next = err.source();
        depth += 1;
    }
    out
}

/// Type label for an error: the leading identifier of its `Debug` output.
///
/// `Timeout { ms: 5 }` and `Timeout(5)` both label as `Timeout`. A
/// failing `Debug` impl labels as `Error`.
pub fn type_label(err: &dyn Error) -> String {
    let mut debug = String::new();
    if write!(debug, "{err:?}").is_err() {
        return UNNAMED.to_string();
    }
    let label: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if label.is_empty() {
        UNNAMED.to_string()
    } else {
        label
    }
}

/// Stack field for a record carrying a cause, at most
/// [`MAX_STACK_LENGTH`] bytes.
pub fn stack_trace() -> String {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => {
            let mut trace = String::new();
            if write!(trace, "{backtrace}").is_err() {
                return STACK_UNAVAILABLE.to_string();
            }
            truncate_at_boundary(&mut trace, MAX_STACK_LENGTH);
            trace
        }
        _ => STACK_UNAVAILABLE.to_string(),
    }
}

fn truncate_at_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        depth: usize,
        inner: Option<Box<Layer>>,
    }

    impl Layer {
        fn chain(len: usize) -> Layer {
            let mut layer = Layer {
                depth: len - 1,
                inner: None,
            };
            for depth in (0..len - 1).rev() {
                layer = Layer {
                    depth,
                    inner: Some(Box::new(layer)),
                };
            }
            layer
        }
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "layer {}", self.depth)
        }
    }

    impl Error for Layer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
        }
    }

    #[derive(Debug)]
    struct Timeout(u32);

    impl fmt::Display for Timeout {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "timed out after {}ms", self.0)
        }
    }

    impl Error for Timeout {}

    #[test]
    fn single_error() {
        assert_eq!(cause_messages(&Timeout(5)), "[Timeout, timed out after 5ms],");
    }

    #[test]
    fn chain_is_outermost_first() {
        let err = Layer::chain(3);
        assert_eq!(
            cause_messages(&err),
            "[Layer, layer 0],[Layer, layer 1],[Layer, layer 2],"
        );
    }

    #[test]
    fn chain_is_clamped() {
        let err = Layer::chain(15);
        let rendered = cause_messages(&err);
        assert_eq!(rendered.matches("],").count(), MAX_CAUSE_DEPTH);
        assert!(rendered.ends_with("[Layer, layer 9],"));
    }

    #[test]
    fn unnamed_debug_output() {
        let err: Box<dyn Error> = "plain message".into();
        assert_eq!(type_label(err.as_ref()), UNNAMED);
        assert_eq!(cause_messages(err.as_ref()), "[Error, plain message],");
    }

    #[derive(Debug)]
    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl Error for Unprintable {}

    struct Opaque;

    impl fmt::Debug for Opaque {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl fmt::Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("opaque failure")
        }
    }

    impl Error for Opaque {}

    #[test]
    fn failing_display_keeps_group_shape() {
        let rendered = cause_messages(&Unprintable);
        assert_eq!(rendered, format!("[Unprintable, {SERIALIZATION_FAILED}],"));
        assert_eq!(rendered.matches("],").count(), 1);
    }

    #[test]
    fn failing_debug_uses_fallback_label() {
        assert_eq!(type_label(&Opaque), UNNAMED);
        assert_eq!(cause_messages(&Opaque), "[Error, opaque failure],");
    }

    #[test]
    fn stack_trace_is_never_empty() {
        let trace = stack_trace();
        assert!(!trace.is_empty());
        assert!(trace.len() <= MAX_STACK_LENGTH);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut text = "ab\u{e9}cd".to_string();
        truncate_at_boundary(&mut text, 3);
        assert_eq!(text, "ab");

        let mut short = "abc".to_string();
        truncate_at_boundary(&mut short, 8);
        assert_eq!(short, "abc");
    }
}
