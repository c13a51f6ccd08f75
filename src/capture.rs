//! Redirection of snippet output.
//!
//! Snippet code never touches the process's file descriptors directly. Every
//! `print` and `sys.stdout.write` goes through [`write`], which
//! appends to the innermost active [`OutputCapture`] on this thread or, when
//! nothing is capturing, forwards to the real standard streams.

use std::cell::RefCell;
use std::io::Write;

use crate::value::StreamKind;

#[derive(Default)]
struct CaptureFrame {
  stdout: String,
  stderr: String,
}

thread_local! {
    static CAPTURE_STACK: RefCell<Vec<CaptureFrame>> =
        const { RefCell::new(Vec::new()) };
}

pub fn write(stream: StreamKind, text: &str) {
  let captured = CAPTURE_STACK.with(|stack| {
    let mut stack = stack.borrow_mut();
    match stack.last_mut() {
      Some(frame) => {
        match stream {
          StreamKind::Stdout => frame.stdout.push_str(text),
          StreamKind::Stderr => frame.stderr.push_str(text),
        }
        true
      }
      None => false,
    }
  });
  if captured {
    return;
  }
  // Nothing to report to if the real stream is closed.
  let _ = match stream {
    StreamKind::Stdout => {
      let mut out = std::io::stdout().lock();
      out.write_all(text.as_bytes()).and_then(|_| out.flush())
    }
    StreamKind::Stderr => std::io::stderr().lock().write_all(text.as_bytes()),
  };
}

/// Scoped redirection of both output streams into per-invocation buffers.
///
/// Captures nest: a capture begun while another is active collects output
/// until it is finished or dropped, after which the outer one resumes.
pub struct OutputCapture {
  depth: usize,
  finished: bool,
}

impl OutputCapture {
  pub fn begin() -> Self {
    let depth = CAPTURE_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      stack.push(CaptureFrame::default());
      stack.len()
    });
    OutputCapture {
      depth,
      finished: false,
    }
  }

  /// Stop capturing and return `(stdout, stderr)`.
  pub fn finish(mut self) -> (String, String) {
    self.finished = true;
    let frame = pop_to(self.depth);
    (frame.stdout, frame.stderr)
  }

  /// Whether any capture is active on this thread.
  pub fn is_active() -> bool {
    CAPTURE_STACK.with(|stack| !stack.borrow().is_empty())
  }
}

impl Drop for OutputCapture {
  fn drop(&mut self) {
    if !self.finished {
      pop_to(self.depth);
    }
  }
}

/// Remove the frame at `depth` and anything pushed above it.
fn pop_to(depth: usize) -> CaptureFrame {
  CAPTURE_STACK.with(|stack| {
    let mut stack = stack.borrow_mut();
    if stack.len() < depth || depth == 0 {
      return CaptureFrame::default();
    }
    let frame = stack.drain(depth - 1..).next().unwrap_or_default();
    frame
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_stdout(text: &str) {
    write(StreamKind::Stdout, text);
  }

  #[test]
  fn collects_both_streams() {
    let capture = OutputCapture::begin();
    write_stdout("hello\n");
    write(StreamKind::Stderr, "oops\n");
    let (stdout, stderr) = capture.finish();
    assert_eq!(stdout, "hello\n");
    assert_eq!(stderr, "oops\n");
    assert!(!OutputCapture::is_active());
  }

  #[test]
  fn nested_captures_restore_the_outer_one() {
    let outer = OutputCapture::begin();
    write_stdout("a");
    {
      let inner = OutputCapture::begin();
      write_stdout("b");
      assert_eq!(inner.finish().0, "b");
    }
    write_stdout("c");
    assert_eq!(outer.finish().0, "ac");
  }

  #[test]
  fn dropping_an_unfinished_capture_pops_it() {
    let outer = OutputCapture::begin();
    drop(OutputCapture::begin());
    write_stdout("x");
    assert_eq!(outer.finish().0, "x");
  }
}
