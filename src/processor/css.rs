//! CSS reference scanner
//!
//! Scans a CSS character stream for `url(...)` references, rewrites each
//! through the [`RewriteEngine`], and streams everything else through
//! unmodified. The scanner is chunk-oblivious: the `url(` introducer and the
//! candidate path may be split across any number of `process` calls.

use crate::error::VerbenaResult;
use crate::processor::Processor;
use crate::rewrite::RewriteEngine;
use std::io::Write;

/// Literal pattern introducing an embedded reference
const PATTERN: &str = "url(";

enum State {
    /// Outside a match; `matched` chars of the pattern seen so far
    Scan { matched: usize },
    /// Inside `url(...)`, buffering the candidate path
    Candidate { buf: String, escaped: bool },
}

/// Single-pass streaming rewriter for CSS
pub struct CssProcessor<'a, W: Write> {
    out: W,
    engine: &'a dyn RewriteEngine,
    base: &'a str,
    prefix: &'a str,
    state: State,
}

impl<'a, W: Write> CssProcessor<'a, W> {
    /// Create a processor for the asset at original path `base`, writing
    /// rewritten output to `out`.
    pub fn new(engine: &'a dyn RewriteEngine, base: &'a str, prefix: &'a str, out: W) -> Self {
        Self {
            out,
            engine,
            base,
            prefix,
            state: State::Scan { matched: 0 },
        }
    }

    /// Consume the processor and return the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    fn feed(&mut self, c: char) -> VerbenaResult<()> {
        loop {
            match &mut self.state {
                State::Scan { matched } => {
                    if c == PATTERN.as_bytes()[*matched] as char {
                        *matched += 1;
                        if *matched == PATTERN.len() {
                            // the introducer is emitted up front; an
                            // unterminated candidate then flushes verbatim
                            // behind it, reproducing the input byte-for-byte
                            self.out.write_all(PATTERN.as_bytes())?;
                            self.state = State::Candidate {
                                buf: String::new(),
                                escaped: false,
                            };
                        }
                        return Ok(());
                    }
                    if *matched > 0 {
                        // "url(" has no self-overlapping prefix, so a broken
                        // partial match can be flushed wholesale and the
                        // current char retried from scratch
                        let broken = *matched;
                        *matched = 0;
                        self.out.write_all(&PATTERN.as_bytes()[..broken])?;
                        continue;
                    }
                    self.write_char(c)?;
                    return Ok(());
                }
                State::Candidate { buf, escaped } => {
                    if *escaped {
                        *escaped = false;
                        buf.push(c);
                    } else if c == '\\' {
                        *escaped = true;
                        buf.push(c);
                    } else if c == ')' {
                        let reference = std::mem::take(buf);
                        self.state = State::Scan { matched: 0 };
                        self.emit_reference(&reference)?;
                        self.out.write_all(b")")?;
                    } else {
                        buf.push(c);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn emit_reference(&mut self, reference: &str) -> VerbenaResult<()> {
        match self.engine.rewrite(reference, self.base, self.prefix) {
            Some(url) => {
                // a quoted reference stays quoted in the output
                let quote = quote_style(reference);
                if let Some(q) = quote {
                    self.out.write_all(&[q])?;
                }
                self.out.write_all(url.as_bytes())?;
                if let Some(q) = quote {
                    self.out.write_all(&[q])?;
                }
            }
            None => self.out.write_all(reference.as_bytes())?,
        }
        Ok(())
    }

    fn write_char(&mut self, c: char) -> VerbenaResult<()> {
        let mut utf8 = [0u8; 4];
        self.out.write_all(c.encode_utf8(&mut utf8).as_bytes())?;
        Ok(())
    }
}

/// Quote character wrapping the candidate, if any
fn quote_style(reference: &str) -> Option<u8> {
    let bytes = reference.trim().as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return Some(first);
        }
    }
    None
}

impl<W: Write> Processor for CssProcessor<'_, W> {
    fn process(&mut self, chunk: &str) -> VerbenaResult<()> {
        for c in chunk.chars() {
            self.feed(c)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> VerbenaResult<()> {
        match std::mem::replace(&mut self.state, State::Scan { matched: 0 }) {
            State::Scan { matched } => {
                if matched > 0 {
                    self.out.write_all(&PATTERN.as_bytes()[..matched])?;
                }
            }
            // unterminated match at end-of-input: the candidate is emitted
            // verbatim, never resolved
            State::Candidate { buf, .. } => self.out.write_all(buf.as_bytes())?,
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolver substituting a single known reference
    struct OneMapping;

    impl RewriteEngine for OneMapping {
        fn rewrite(&self, reference: &str, _base: &str, _prefix: &str) -> Option<String> {
            let reference = reference.trim().trim_matches(|c| c == '"' || c == '\'');
            (reference == "/x/y/z.gif").then(|| "http://a.b.c".to_string())
        }
    }

    fn run(chunks: &[&str]) -> String {
        let engine = OneMapping;
        let mut processor = CssProcessor::new(&engine, "style/main.css", "/", Vec::new());
        for chunk in chunks {
            processor.process(chunk).unwrap();
        }
        processor.flush().unwrap();
        String::from_utf8(processor.into_inner()).unwrap()
    }

    #[test]
    fn simple_reference_is_rewritten() {
        let input = "background: transparent url(/x/y/z.gif) no-repeat top left;";
        let expected = "background: transparent url(http://a.b.c) no-repeat top left;";
        assert_eq!(run(&[input]), expected);
    }

    #[test]
    fn unterminated_match_is_emitted_verbatim() {
        let input = "background: transparent url(/x/y/z.gif";
        assert_eq!(run(&[input]), input);
    }

    #[test]
    fn unresolved_reference_is_left_unchanged() {
        let input = "background: url(/not/tracked.png) top;";
        assert_eq!(run(&[input]), input);
    }

    #[test]
    fn pattern_split_across_chunks() {
        let out = run(&["background: u", "rl", "(/x/y/z.gif)"]);
        assert_eq!(out, "background: url(http://a.b.c)");
    }

    #[test]
    fn candidate_split_across_chunks() {
        let out = run(&["url(/x/", "y/z.gif)"]);
        assert_eq!(out, "url(http://a.b.c)");
    }

    #[test]
    fn one_char_chunks() {
        let input = "a url(/x/y/z.gif) b";
        let chunks: Vec<String> = input.chars().map(String::from).collect();
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        assert_eq!(run(&refs), "a url(http://a.b.c) b");
    }

    #[test]
    fn broken_partial_pattern_passes_through() {
        assert_eq!(run(&["curl is not url"]), "curl is not url");
        assert_eq!(run(&["ur "]), "ur ");
    }

    #[test]
    fn repeated_prefix_character_restarts_match() {
        // the second 'u' must start a fresh match after the first is flushed
        assert_eq!(run(&["uurl(/x/y/z.gif)"]), "uurl(http://a.b.c)");
    }

    #[test]
    fn partial_pattern_at_end_of_input_is_flushed() {
        assert_eq!(run(&["margin: 0; ur"]), "margin: 0; ur");
    }

    #[test]
    fn quoted_reference_keeps_quote_style() {
        assert_eq!(
            run(&["url(\"/x/y/z.gif\")"]),
            "url(\"http://a.b.c\")"
        );
        assert_eq!(run(&["url('/x/y/z.gif')"]), "url('http://a.b.c')");
    }

    #[test]
    fn unresolved_quoted_reference_is_untouched() {
        let input = "url(\"/not/tracked.png\")";
        assert_eq!(run(&[input]), input);
    }

    #[test]
    fn escaped_delimiter_does_not_terminate() {
        let input = "url(/a\\)b.gif)";
        // candidate is "/a\)b.gif", unresolved, emitted unchanged
        assert_eq!(run(&[input]), input);
    }

    #[test]
    fn multiple_references_in_one_stream() {
        let input = "a: url(/x/y/z.gif); b: url(/x/y/z.gif);";
        let expected = "a: url(http://a.b.c); b: url(http://a.b.c);";
        assert_eq!(run(&[input]), expected);
    }

    #[test]
    fn non_ascii_text_streams_through() {
        let input = "content: \"héllo → wörld\";";
        assert_eq!(run(&[input]), input);
    }

    #[test]
    fn empty_input_produces_empty_output() {
        assert_eq!(run(&[]), "");
        assert_eq!(run(&[""]), "");
    }
}
