//! Synthesis of the program that actually runs inside the sandbox.
//!
//! The wrapped program is three segments joined end to end:
//!
//! ```text
//! PREAMBLE      trusted; redirects sys.stdout / sys.stderr into buffers
//! <user script> verbatim, never formatted or escaped
//! EPILOGUE      trusted; calls main(), restores streams, emits one JSON line
//! ```
//!
//! The epilogue writes exactly one protocol line on the real stdout:
//! `{"result": ..., "stdout": ...}` with exit code 0, or `{"error": ...}`
//! with exit code 1. [`super::protocol`] parses that line back. The line is
//! written as strict UTF-8, so lone surrogates in the result or the captured
//! stdout count as unserializable rather than reaching the parser.
//!
//! Harness names are prefixed with `_sandrun_` so they stay clear of
//! anything a submitted script is likely to define.

/// Message reported when `main()` returns something `json.dumps` rejects.
pub const NOT_SERIALIZABLE_MESSAGE: &str = "main() must return a JSON-serializable value";

const PREAMBLE: &str = r#"import io as _sandrun_io
import json as _sandrun_json
import sys as _sandrun_sys
import traceback as _sandrun_traceback

_sandrun_real_stdout = _sandrun_sys.stdout
_sandrun_real_stderr = _sandrun_sys.stderr
_sandrun_captured_stdout = _sandrun_io.StringIO()
_sandrun_captured_stderr = _sandrun_io.StringIO()
_sandrun_restored = False


def _sandrun_restore():
    global _sandrun_restored
    if _sandrun_restored:
        return
    _sandrun_restored = True
    _sandrun_sys.stdout = _sandrun_real_stdout
    _sandrun_sys.stderr = _sandrun_real_stderr
    _sandrun_real_stderr.write(_sandrun_captured_stderr.getvalue())
    _sandrun_real_stderr.flush()


def _sandrun_write(data):
    _sandrun_real_stdout.flush()
    _sandrun_real_stdout.buffer.write(data)
    _sandrun_real_stdout.flush()


def _sandrun_emit(payload):
    line = _sandrun_json.dumps(payload, ensure_ascii=False) + "\n"
    _sandrun_write(line.encode("utf-8", "replace"))


def _sandrun_excepthook(exc_type, exc, tb):
    _sandrun_restore()
    _sandrun_traceback.print_exception(exc_type, exc, tb, file=_sandrun_real_stderr)
    _sandrun_emit({"error": "Error executing script: " + str(exc)})


_sandrun_sys.excepthook = _sandrun_excepthook
_sandrun_sys.stdout = _sandrun_captured_stdout
_sandrun_sys.stderr = _sandrun_captured_stderr

"#;

const EPILOGUE: &str = r#"


def _sandrun_run():
    try:
        try:
            result = main()
        finally:
            _sandrun_restore()
    except Exception as exc:
        _sandrun_traceback.print_exc(file=_sandrun_real_stderr)
        _sandrun_emit({"error": "Error executing main(): " + str(exc)})
        return 1

    try:
        line = _sandrun_json.dumps(
            {"result": result, "stdout": _sandrun_captured_stdout.getvalue()},
            allow_nan=False,
            ensure_ascii=False,
        )
        data = (line + "\n").encode("utf-8")
    except (TypeError, ValueError, OverflowError, RecursionError):
        _sandrun_emit({"error": "main() must return a JSON-serializable value"})
        return 1

    _sandrun_write(data)
    return 0


_sandrun_sys.exit(_sandrun_run())
"#;

/// A complete program ready to be written to a scratch file.
#[derive(Debug, Clone)]
pub struct WrappedProgram {
    source: String,
}

impl WrappedProgram {
    /// Concatenate the harness segments around `script`.
    pub fn new(script: &str) -> Self {
        let mut source = String::with_capacity(PREAMBLE.len() + script.len() + EPILOGUE.len());
        source.push_str(PREAMBLE);
        source.push_str(script);
        source.push_str(EPILOGUE);
        Self { source }
    }

    /// Full program text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte length of the program text.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Always `false`; the harness segments are never empty.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
