use std::collections::BTreeMap;

use crate::types::AnnotatedSpan;

/// Receives the current annotated spans after every successful parse,
/// e.g. an editor decoration layer.
pub trait AnnotationSink {
    /// Replace whatever was shown before with `spans`.
    fn publish(&mut self, spans: &BTreeMap<String, AnnotatedSpan>);
}

impl<F> AnnotationSink for F
where
    F: FnMut(&BTreeMap<String, AnnotatedSpan>),
{
    fn publish(&mut self, spans: &BTreeMap<String, AnnotatedSpan>) {
        self(spans);
    }
}

/// Sink that discards every publication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnnotationSink for NullSink {
    fn publish(&mut self, _spans: &BTreeMap<String, AnnotatedSpan>) {}
}
