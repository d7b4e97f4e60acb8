//! Scoped output capture.
//!
//! Script execution emits text through [`echo`] instead of returning it.
//! An [`OutputCapture`] guard pushes a buffer on a thread-local stack and
//! pops it when finished or dropped, so a failing script (error or panic)
//! can never leave its output behind for the next capture on the thread.

use std::cell::RefCell;

thread_local! {
    static STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard owning the innermost capture buffer of the current thread.
#[derive(Debug)]
pub struct OutputCapture {
    depth: usize,
    finished: bool,
}

impl OutputCapture {
    /// Start capturing. Nested captures shadow outer ones until they end.
    pub fn start() -> Self {
        let depth = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(String::new());
            stack.len()
        });
        Self {
            depth,
            finished: false,
        }
    }

    /// Stop capturing and return everything emitted since [`start`](Self::start).
    pub fn finish(mut self) -> String {
        self.finished = true;
        self.pop()
    }

    fn pop(&self) -> String {
        STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "captures must end innermost first");
            stack.pop().unwrap_or_default()
        })
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        if !self.finished {
            // Discard: output of an aborted script is never flushed.
            let _ = self.pop();
        }
    }
}

/// Append `text` to the innermost capture.
///
/// Returns `false` when no capture is active; the text is dropped.
pub fn echo(text: &str) -> bool {
    STACK.with(|stack| match stack.borrow_mut().last_mut() {
        Some(buffer) => {
            buffer.push_str(text);
            true
        }
        None => false,
    })
}

/// Number of active captures on this thread.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_in_emission_order() {
        let capture = OutputCapture::start();
        echo("Hello");
        echo(", ");
        echo("world");
        assert_eq!(capture.finish(), "Hello, world");
        assert_eq!(depth(), 0);
    }

    #[test]
    fn nested_captures_are_isolated() {
        let outer = OutputCapture::start();
        echo("outer ");
        {
            let inner = OutputCapture::start();
            echo("inner");
            assert_eq!(inner.finish(), "inner");
        }
        echo("again");
        assert_eq!(outer.finish(), "outer again");
    }

    #[test]
    fn dropped_capture_discards_output() {
        {
            let _capture = OutputCapture::start();
            echo("lost");
        }
        assert_eq!(depth(), 0);

        let capture = OutputCapture::start();
        assert_eq!(capture.finish(), "");
    }

    #[test]
    fn echo_without_capture_is_rejected() {
        assert!(!echo("nowhere"));
    }

    #[test]
    fn panic_releases_capture() {
        let result = std::panic::catch_unwind(|| {
            let _capture = OutputCapture::start();
            echo("partial");
            panic!("script blew up");
        });
        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }
}
