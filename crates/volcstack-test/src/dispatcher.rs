//! Scripted dispatch adapter.

use std::collections::VecDeque;

use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use volcstack_core::{
    BoxFuture, DispatchAdapter, DispatchRequest, DispatchResponse, TransportError,
};

/// Message of the response returned when nothing else matches.
pub const FALLBACK_MESSAGE: &str = "Mock fallback response";

/// What the mock does with a request.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response, whatever its status.
    Response(DispatchResponse),
    /// Fail with this transport error.
    Error(TransportError),
    /// Never answer; resolves with a cancellation error once the request's
    /// token fires.
    Hang,
}

impl From<DispatchResponse> for MockReply {
    fn from(response: DispatchResponse) -> Self {
        Self::Response(response)
    }
}

impl From<TransportError> for MockReply {
    fn from(err: TransportError) -> Self {
        Self::Error(err)
    }
}

#[derive(Debug)]
enum UrlMatcher {
    Exact(String),
    Pattern(Regex),
}

#[derive(Debug)]
struct Route {
    matcher: UrlMatcher,
    reply: MockReply,
}

#[derive(Debug)]
struct DispatcherState {
    requests: Vec<DispatchRequest>,
    queue: VecDeque<MockReply>,
    routes: Vec<Route>,
    fallback: MockReply,
    destroyed: bool,
}

impl DispatcherState {
    fn select(&mut self, url: &str) -> MockReply {
        if let Some(reply) = self.queue.pop_front() {
            return reply;
        }

        let exact = self.routes.iter().find(|route| match &route.matcher {
            UrlMatcher::Exact(expected) => expected == url,
            UrlMatcher::Pattern(_) => false,
        });
        let pattern = || {
            self.routes.iter().find(|route| match &route.matcher {
                UrlMatcher::Exact(_) => false,
                UrlMatcher::Pattern(regex) => regex.is_match(url),
            })
        };

        exact
            .or_else(pattern)
            .map_or_else(|| self.fallback.clone(), |route| route.reply.clone())
    }
}

/// A [`DispatchAdapter`] that answers from a script and records every call.
///
/// Replies are picked in this order:
///
/// 1. the next queued reply ([`push_response`](Self::push_response),
///    [`push_error`](Self::push_error), [`push_reply`](Self::push_reply)),
///    consumed once
/// 2. a route whose URL matches exactly ([`mock`](Self::mock))
/// 3. the first route whose pattern matches ([`mock_pattern`](Self::mock_pattern))
/// 4. the fallback, by default `200 {"message": "Mock fallback response"}`
///
/// A request whose cancellation token has already fired fails with a
/// cancellation error without consuming a reply.
#[derive(Debug)]
pub struct MockDispatcher {
    state: Mutex<DispatcherState>,
}

impl MockDispatcher {
    /// Creates a dispatcher with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DispatcherState {
                requests: Vec::new(),
                queue: VecDeque::new(),
                routes: Vec::new(),
                fallback: MockReply::Response(DispatchResponse::new(
                    200,
                    json!({ "message": FALLBACK_MESSAGE }),
                )),
                destroyed: false,
            }),
        }
    }

    /// Queues a response.
    pub fn push_response(&self, response: DispatchResponse) -> &Self {
        self.push_reply(MockReply::Response(response))
    }

    /// Queues a transport error.
    pub fn push_error(&self, err: TransportError) -> &Self {
        self.push_reply(MockReply::Error(err))
    }

    /// Queues any reply.
    pub fn push_reply(&self, reply: impl Into<MockReply>) -> &Self {
        self.state.lock().queue.push_back(reply.into());
        self
    }

    /// Answers requests for exactly `url` with `reply`.
    pub fn mock(&self, url: impl Into<String>, reply: impl Into<MockReply>) -> &Self {
        self.state.lock().routes.push(Route {
            matcher: UrlMatcher::Exact(url.into()),
            reply: reply.into(),
        });
        self
    }

    /// Answers requests whose URL matches `pattern` with `reply`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn mock_pattern(
        &self,
        pattern: &str,
        reply: impl Into<MockReply>,
    ) -> Result<&Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.state.lock().routes.push(Route {
            matcher: UrlMatcher::Pattern(regex),
            reply: reply.into(),
        });
        Ok(self)
    }

    /// Replaces the fallback reply.
    pub fn fallback(&self, reply: impl Into<MockReply>) -> &Self {
        self.state.lock().fallback = reply.into();
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.state.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<DispatchRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Whether a request for exactly `url` was received.
    #[must_use]
    pub fn was_called(&self, url: &str) -> bool {
        self.state.lock().requests.iter().any(|r| r.url == url)
    }

    /// Whether [`destroy`](DispatchAdapter::destroy) was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Forgets recorded requests, queued replies and routes.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.requests.clear();
        state.queue.clear();
        state.routes.clear();
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchAdapter for MockDispatcher {
    fn request(
        &self,
        request: DispatchRequest,
    ) -> BoxFuture<'_, Result<DispatchResponse, TransportError>> {
        let token = request.cancellation.clone();
        let reply = {
            let mut state = self.state.lock();
            let reply = if token.as_ref().is_some_and(|t| t.is_cancelled()) {
                MockReply::Error(TransportError::cancelled())
            } else {
                state.select(&request.url)
            };
            state.requests.push(request);
            reply
        };

        Box::pin(async move {
            match reply {
                MockReply::Response(response) => Ok(response),
                MockReply::Error(err) => Err(err),
                MockReply::Hang => {
                    match token {
                        Some(token) => token.cancelled().await,
                        None => std::future::pending::<()>().await,
                    }
                    Err(TransportError::cancelled())
                }
            }
        })
    }

    fn destroy(&self) {
        self.state.lock().destroyed = true;
    }
}
