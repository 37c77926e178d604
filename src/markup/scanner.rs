//! Two-cursor scanner for one kind of delimited marker.

/// Classification of a scanned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Prose outside any marker.
    Plain,
    /// Open tag through close tag, inclusive.
    CompleteMarker,
    /// Open tag through end of buffer; the close tag has not arrived.
    IncompleteMarker,
}

/// A borrowed slice of the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub text: &'a str,
    /// Byte offset of `text` in the buffer.
    pub start: usize,
}

impl Span<'_> {
    /// Byte offset one past the end of the span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Text between the open and close tags of a complete marker.
    #[must_use]
    pub fn inner<'s>(&'s self, open: &str, close: &str) -> Option<&'s str> {
        match self.kind {
            SpanKind::CompleteMarker => self
                .text
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close)),
            _ => None,
        }
    }
}

/// Lazy iterator over the spans of a buffer.
///
/// Plain spans are never empty. An incomplete marker is always the last span.
/// The empty buffer yields no spans.
#[derive(Debug, Clone)]
pub struct MarkerScanner<'a> {
    buf: &'a str,
    open: &'a str,
    close: &'a str,
    pos: usize,
    pending: Option<Span<'a>>,
}

impl<'a> MarkerScanner<'a> {
    /// Scan `buf` for `open ... close` markers.
    #[must_use]
    pub fn new(buf: &'a str, open: &'a str, close: &'a str) -> Self {
        Self {
            buf,
            open,
            close,
            pos: 0,
            pending: None,
        }
    }

    fn span(&self, kind: SpanKind, start: usize, end: usize) -> Span<'a> {
        Span {
            kind,
            text: &self.buf[start..end],
            start,
        }
    }

    fn finish_plain(&mut self) -> Span<'a> {
        let span = self.span(SpanKind::Plain, self.pos, self.buf.len());
        self.pos = self.buf.len();
        span
    }
}

impl<'a> Iterator for MarkerScanner<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(span) = self.pending.take() {
            return Some(span);
        }
        if self.pos >= self.buf.len() {
            return None;
        }
        if self.open.is_empty() {
            return Some(self.finish_plain());
        }

        let Some(rel) = self.buf[self.pos..].find(self.open) else {
            return Some(self.finish_plain());
        };
        let open_at = self.pos + rel;
        let after_open = open_at + self.open.len();

        let marker = match self.buf[after_open..].find(self.close) {
            Some(c) if !self.close.is_empty() => {
                let end = after_open + c + self.close.len();
                self.span(SpanKind::CompleteMarker, open_at, end)
            }
            _ => self.span(SpanKind::IncompleteMarker, open_at, self.buf.len()),
        };

        let plain_start = self.pos;
        self.pos = marker.end();
        if open_at > plain_start {
            self.pending = Some(marker);
            Some(self.span(SpanKind::Plain, plain_start, open_at))
        } else {
            Some(marker)
        }
    }
}
