use std::collections::BTreeMap;

use reviewtag::{
    AnnotatedSpan, AnnotationSink, Dialect, FileBuffer, LineSelection, Session, StringBuffer,
    TextBuffer,
};

/// Deterministic xorshift generator so the corpus is the same on every run.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        let idx = usize::try_from(self.next() % items.len() as u64).unwrap();
        items[idx]
    }
}

/// Random lines mixing code, ordinary comments, and every marker shape for
/// keys of different lengths, so most buffers contain several kinds of
/// corruption and deletions of unequal size.
fn random_buffer(rng: &mut XorShift) -> String {
    const PIECES: &[&str] = &[
        "code();", "/* note */", "/*?A*/", "/*A?*/", "/*?A?*/", "/*?B*/", "/*B?*/", "/*?B?*/",
        "/*? C */", "/* C ?*/", "/*?LONGER*/", "/*LONGER?*/", "/*?LONGER?*/", "/*?  D  */", "/*D?*/",
        "/**/", " ", "\n", "\r\n", "\r",
    ];
    let len = 1 + rng.next() % 24;
    (0..len).map(|_| rng.pick(PIECES)).collect()
}

#[test]
fn repair_always_reaches_a_fixed_point() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    for round in 0..2000 {
        let text = random_buffer(&mut rng);
        let mut session = Session::open(StringBuffer::new(text.clone()), Dialect::BlockComment);
        let first = session.parse().unwrap();
        let second = session.parse().unwrap();

        assert!(second.corruptions.is_empty(), "round {round}: {text:?} needed a second repair");
        assert_eq!(
            session.buffer().text().matches("code();").count(),
            text.matches("code();").count(),
            "round {round}: repair of {text:?} deleted code"
        );
        assert_eq!(first.index, second.index, "round {round}: index changed on reparse of {text:?}");
        for key in second.index.keys() {
            let tags = second.index.tag_positions(key).unwrap();
            assert!(tags.end.is_some(), "round {round}: {key} has no end after a clean parse");
            let span = second.index.span_of(key).unwrap();
            assert!(span.end >= span.start, "round {round}: inverted span for {key}");
        }
    }
}

#[test]
fn file_buffer_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Service.java");
    let original = "public class Service {\r\n  int a;\r\n\r\n  int b;\r\n}";
    std::fs::write(&path, original).unwrap();

    let mut session = Session::open(FileBuffer::open(&path).unwrap(), Dialect::BlockComment);
    session.parse().unwrap();
    session.insert("7|carol|4", Some(LineSelection::single(2))).unwrap();
    let inserted = session.insert("7|carol|3", Some(LineSelection::new(1, 4))).unwrap();

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("  int a;/*?7|carol|3*/\r\n"), "begin before CRLF: {on_disk:?}");
    assert!(on_disk.ends_with("}/*7|carol|3?*/"), "end on last line without delimiter: {on_disk:?}");

    session.parse().unwrap();
    assert_eq!(session.span_of("7|carol|3"), Some(inserted), "parsed span matches inserted span");
    let single = session.tag_positions("7|carol|4").unwrap();
    assert!(single.is_self_contained(), "single-line selection is self-contained");

    session.remove_many(&["7|carol|4", "7|carol|3"]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original, "file restored");
    assert!(session.index().is_empty(), "index empty after batch removal");
}

#[test]
fn sink_sees_every_successful_parse() {
    /// Keeps a copy of every published span map.
    #[derive(Default)]
    struct Recorder(Vec<BTreeMap<String, AnnotatedSpan>>);

    impl AnnotationSink for Recorder {
        fn publish(&mut self, spans: &BTreeMap<String, AnnotatedSpan>) {
            self.0.push(spans.clone());
        }
    }

    let mut session = Session::attach(StringBuffer::new("a\nb\nc\n"), Dialect::BlockComment, Recorder::default());
    session.parse().unwrap();
    session.insert("K", Some(LineSelection::new(0, 2))).unwrap();
    session.parse().unwrap();
    session.remove("K").unwrap();

    let sizes: Vec<usize> = session.sink().0.iter().map(BTreeMap::len).collect();
    assert_eq!(sizes, vec![0, 1, 0], "empty, tagged, removed");
}

#[test]
fn failed_parse_keeps_previous_index() {
    /// Buffer whose line lookups break after the first parse.
    struct Flaky {
        inner: StringBuffer,
        broken: bool,
    }

    impl TextBuffer for Flaky {
        fn line_count(&self) -> usize {
            self.inner.line_count()
        }
        fn line_delimiter_length(&self, line: usize) -> Result<usize, reviewtag::Error> {
            self.inner.line_delimiter_length(line)
        }
        fn line_length(&self, line: usize) -> Result<usize, reviewtag::Error> {
            self.inner.line_length(line)
        }
        fn line_of_offset(&self, offset: usize) -> Result<usize, reviewtag::Error> {
            if self.broken {
                return Err(reviewtag::Error::MalformedDocumentState { reason: "raced".to_string() });
            }
            self.inner.line_of_offset(offset)
        }
        fn line_offset(&self, line: usize) -> Result<usize, reviewtag::Error> {
            self.inner.line_offset(line)
        }
        fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<(), reviewtag::Error> {
            self.inner.replace(offset, length, text)
        }
        fn save(&mut self) -> Result<(), reviewtag::Error> {
            self.broken = true;
            Ok(())
        }
        fn text(&self) -> &str {
            self.inner.text()
        }
    }

    let buffer = Flaky { inner: StringBuffer::new("x /*?K?*/\ny /*?J?*/\n"), broken: false };
    let mut session = Session::open(buffer, Dialect::BlockComment);
    session.parse().unwrap();
    let before = session.index().clone();

    // Saving flips the buffer into its broken state, so the reparse fails.
    let err = session.remove("J").unwrap_err();
    assert!(matches!(err, reviewtag::Error::MalformedDocumentState { .. }), "fatal error surfaced: {err}");
    assert_eq!(session.index(), &before, "previous index still published");
}
