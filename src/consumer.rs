//! Single-use accumulator for one in-flight response.

use http::{header, HeaderMap, StatusCode};

use crate::classify::{Classifier, Decode};
use crate::error::{Error, ExecutionFault, Result};

enum State {
    AwaitingHeaders,
    AccumulatingBody {
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
    },
    Completed,
    Failed,
}

/// Buffers a response body and classifies it once the body is complete.
///
/// `AwaitingHeaders -> AccumulatingBody -> Completed`, or `Failed` on a
/// transport error. Dropping the consumer before completion discards the
/// partial body without classifying it, which is what happens when a call is
/// cancelled.
pub(crate) struct ResponseConsumer<D> {
    classifier: Classifier<D>,
    state: State,
}

impl<D: Decode> ResponseConsumer<D> {
    pub(crate) fn new(classifier: Classifier<D>) -> Self {
        Self {
            classifier,
            state: State::AwaitingHeaders,
        }
    }

    pub(crate) fn on_headers(&mut self, status: StatusCode, headers: HeaderMap) {
        tracing::debug!(
            status = status.as_u16(),
            content_type = ?headers.get(header::CONTENT_TYPE),
            "Received response headers"
        );
        self.state = State::AccumulatingBody {
            status,
            headers,
            body: Vec::new(),
        };
    }

    pub(crate) fn on_chunk(&mut self, chunk: &[u8]) {
        if let State::AccumulatingBody { body, .. } = &mut self.state {
            body.extend_from_slice(chunk);
        }
    }

    /// Classifies the accumulated body. The consumer is `Completed` afterwards.
    pub(crate) fn complete(&mut self) -> Result<D::Output> {
        match std::mem::replace(&mut self.state, State::Completed) {
            State::AccumulatingBody {
                status,
                headers,
                body,
            } => self.classifier.classify(status, headers, body),
            State::AwaitingHeaders => {
                self.state = State::Failed;
                Err(ExecutionFault::Internal("response completed before headers").into())
            }
            State::Completed => Err(ExecutionFault::ResultTaken.into()),
            State::Failed => {
                self.state = State::Failed;
                Err(ExecutionFault::Internal("response consumer already failed").into())
            }
        }
    }

    /// Records a transport-level failure. Terminal; nothing is classified.
    pub(crate) fn fail(&mut self, error: reqwest::Error) -> Error {
        self.state = State::Failed;
        ExecutionFault::Transport(error).into()
    }

    /// Drives the consumer through a whole response.
    pub(crate) async fn consume(mut self, mut response: reqwest::Response) -> Result<D::Output> {
        self.on_headers(response.status(), response.headers().clone());

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => self.on_chunk(&chunk),
                Ok(None) => break,
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.complete()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::classify::{Empty, Json};

    /// Counts how often a body reaches the decoder.
    struct Counting(Arc<AtomicUsize>);

    impl Decode for Counting {
        type Output = ();

        fn decode(&self, _body: &[u8]) -> serde_json::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn accumulates_chunks_before_classifying() {
        let mut consumer = ResponseConsumer::new(Classifier::new(Json::<Vec<u32>>::new()));

        consumer.on_headers(StatusCode::OK, HeaderMap::new());
        consumer.on_chunk(b"[1,");
        consumer.on_chunk(b"2,");
        consumer.on_chunk(b"3]");

        assert_eq!(consumer.complete().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn completes_only_once() {
        let mut consumer = ResponseConsumer::new(Classifier::new(Empty));
        consumer.on_headers(StatusCode::OK, HeaderMap::new());

        assert!(consumer.complete().is_ok());
        assert!(matches!(
            consumer.complete(),
            Err(Error::Execution(ExecutionFault::ResultTaken))
        ));
    }

    #[test]
    fn completing_without_headers_is_an_internal_fault() {
        let mut consumer = ResponseConsumer::new(Classifier::new(Empty));

        assert!(matches!(
            consumer.complete(),
            Err(Error::Execution(ExecutionFault::Internal(_)))
        ));
    }

    #[test]
    fn chunks_before_headers_are_ignored() {
        let mut consumer = ResponseConsumer::new(Classifier::new(Json::<Vec<u32>>::new()));

        consumer.on_chunk(b"garbage");
        consumer.on_headers(StatusCode::OK, HeaderMap::new());
        consumer.on_chunk(b"[7]");

        assert_eq!(consumer.complete().unwrap(), vec![7]);
    }

    #[test]
    fn modeled_error_surfaces_as_failure() {
        let mut consumer = ResponseConsumer::new(Classifier::new(Json::<Vec<u32>>::new()));
        consumer.on_headers(StatusCode::BAD_REQUEST, HeaderMap::new());
        consumer.on_chunk(br#"{"code":"syntax_error","text":"bad"}"#);

        let err = consumer.complete().unwrap_err();
        assert_eq!(err.api_error().map(|e| e.code.as_str()), Some("syntax_error"));
    }

    #[test]
    fn dropping_mid_body_never_classifies() {
        let decoded = Arc::new(AtomicUsize::new(0));

        let mut consumer = ResponseConsumer::new(Classifier::new(Counting(decoded.clone())));
        consumer.on_headers(StatusCode::OK, HeaderMap::new());
        consumer.on_chunk(b"partial");
        drop(consumer);
        assert_eq!(decoded.load(Ordering::SeqCst), 0);

        let mut consumer = ResponseConsumer::new(Classifier::new(Counting(decoded.clone())));
        consumer.on_headers(StatusCode::OK, HeaderMap::new());
        consumer.on_chunk(b"whole");
        consumer.complete().unwrap();
        assert_eq!(decoded.load(Ordering::SeqCst), 1);
    }
}
