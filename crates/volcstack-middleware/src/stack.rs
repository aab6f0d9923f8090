//! Phase-ordered, priority-sorted middleware stack.
//!
//! A [`MiddlewareStack`] groups named stages into four fixed [`Phase`]s.
//! Within a phase, entries are kept sorted by descending priority; entries of
//! equal priority keep their insertion order.
//!
//! ## Resolution
//!
//! [`MiddlewareStack::resolve`] concatenates the phases in their fixed order
//! and binds the result to a terminal handler and an [`ExecutionContext`]:
//!
//! ```text
//! initialize ─► serialize ─► build ─► finalizeRequest ─► terminal
//! ```
//!
//! The resolved chain is a snapshot. Changes made to the stack afterwards do
//! not affect it, and separate resolutions share no state.
//!
//! ## Example
//!
//! ```
//! use volcstack_middleware::{AddOptions, FnMiddleware, MiddlewareStack, Phase};
//!
//! let mut stack = MiddlewareStack::new();
//! stack.add(
//!     FnMiddleware::new(|ctx, envelope, next| next.run(ctx, envelope)),
//!     AddOptions::new(Phase::Build).name("passThrough").priority(10),
//! );
//!
//! assert_eq!(
//!     stack.to_string(),
//!     "MiddlewareStack:\n  [build]\n    - passThrough (priority: 10)"
//! );
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use volcstack_core::{BoxFuture, RequestEnvelope, SdkResult};

use crate::context::ExecutionContext;
use crate::middleware::{Middleware, Next, TerminalHandler};

static MIDDLEWARE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A pipeline phase. Phases always execute in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Credentials, default headers and endpoint resolution.
    #[default]
    Initialize,
    /// Parameter and body transforms.
    Serialize,
    /// Request signing.
    Build,
    /// Retry and dispatch.
    FinalizeRequest,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 4] = [
        Phase::Initialize,
        Phase::Serialize,
        Phase::Build,
        Phase::FinalizeRequest,
    ];

    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Serialize => "serialize",
            Self::Build => "build",
            Self::FinalizeRequest => "finalizeRequest",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a stage within a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Phase the stage belongs to.
    pub phase: Phase,
    /// Stage name; generated as `middleware_<n>` when absent.
    pub name: Option<String>,
    /// Ordering within the phase; higher runs first.
    pub priority: i32,
    /// Replace an existing entry with the same phase and name.
    pub overriding: bool,
}

impl AddOptions {
    /// Creates options for `phase` with priority 0.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }

    /// Sets the stage name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether an existing entry with the same name is replaced.
    #[must_use]
    pub fn overriding(mut self, overriding: bool) -> Self {
        self.overriding = overriding;
        self
    }
}

/// A stage registered in a stack.
#[derive(Clone)]
pub struct StackEntry {
    name: String,
    phase: Phase,
    priority: i32,
    middleware: Arc<dyn Middleware>,
}

impl StackEntry {
    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the stage itself.
    #[must_use]
    pub fn middleware(&self) -> &Arc<dyn Middleware> {
        &self.middleware
    }
}

impl fmt::Debug for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackEntry")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of named, prioritized stages grouped by phase.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    phases: [Vec<StackEntry>; 4],
}

impl MiddlewareStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage.
    pub fn add(&mut self, middleware: impl Middleware, options: AddOptions) -> &mut Self {
        self.add_arc(Arc::new(middleware), options)
    }

    /// Adds a shared stage.
    ///
    /// With `overriding` set and an entry of the same name already in the
    /// phase, that entry is replaced in place. Otherwise the stage is
    /// appended; duplicate names are allowed. The phase is then re-sorted.
    pub fn add_arc(&mut self, middleware: Arc<dyn Middleware>, options: AddOptions) -> &mut Self {
        let AddOptions {
            phase,
            name,
            priority,
            overriding,
        } = options;
        let name = name.unwrap_or_else(|| {
            format!(
                "middleware_{}",
                MIDDLEWARE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
            )
        });
        let entry = StackEntry {
            name,
            phase,
            priority,
            middleware,
        };

        let entries = &mut self.phases[phase.index()];
        let existing = if overriding {
            entries.iter().position(|e| e.name == entry.name)
        } else {
            None
        };
        match existing {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }
        sort_entries(entries);
        self
    }

    /// Returns a new stack holding this stack's entries followed by `other`'s, per phase.
    ///
    /// Neither input is modified and same-named entries are kept.
    #[must_use]
    pub fn merge(&self, other: &MiddlewareStack) -> MiddlewareStack {
        let mut merged = self.clone();
        for (entries, extra) in merged.phases.iter_mut().zip(&other.phases) {
            entries.extend(extra.iter().cloned());
            sort_entries(entries);
        }
        merged
    }

    /// Returns the entries of `phase` in execution order.
    #[must_use]
    pub fn entries(&self, phase: Phase) -> &[StackEntry] {
        &self.phases[phase.index()]
    }

    /// Returns true if `phase` holds an entry named `name`.
    #[must_use]
    pub fn contains(&self, phase: Phase, name: &str) -> bool {
        self.entries(phase).iter().any(|e| e.name == name)
    }

    /// Returns all entries in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &StackEntry> {
        self.phases.iter().flatten()
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    /// Returns true if the stack has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds the current entries to `terminal` and `context`.
    pub fn resolve<F>(&self, terminal: F, context: ExecutionContext) -> ResolvedChain
    where
        F: Fn(RequestEnvelope) -> BoxFuture<'static, SdkResult<RequestEnvelope>>
            + Send
            + Sync
            + 'static,
    {
        let (names, stages): (Vec<_>, Vec<_>) = self
            .iter()
            .map(|e| (e.name.clone(), Arc::clone(&e.middleware)))
            .unzip();

        tracing::debug!(
            command = %context.command_name,
            stages = ?names,
            "Resolved middleware chain"
        );

        ResolvedChain {
            stages,
            names,
            terminal: Box::new(terminal),
            context,
        }
    }
}

fn sort_entries(entries: &mut [StackEntry]) {
    // `sort_by` is stable, so equal priorities keep insertion order.
    entries.sort_by(|a, b| b.priority.cmp(&a.priority));
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareStack:")?;
        for phase in Phase::ALL {
            let entries = self.entries(phase);
            if entries.is_empty() {
                continue;
            }
            write!(f, "\n  [{phase}]")?;
            for entry in entries {
                write!(f, "\n    - {} (priority: {})", entry.name, entry.priority)?;
            }
        }
        Ok(())
    }
}

/// A stack bound to a terminal handler and an execution context.
pub struct ResolvedChain {
    stages: Vec<Arc<dyn Middleware>>,
    names: Vec<String>,
    terminal: Box<TerminalHandler>,
    context: ExecutionContext,
}

impl ResolvedChain {
    /// Runs the chain over `envelope`.
    pub async fn call(&self, envelope: RequestEnvelope) -> SdkResult<RequestEnvelope> {
        Next::new(&self.stages, &*self.terminal)
            .run(&self.context, envelope)
            .await
    }

    /// Runs the chain and returns the response body.
    ///
    /// A chain that completes without a response yields `null`.
    pub async fn call_for_body(&self, envelope: RequestEnvelope) -> SdkResult<Value> {
        let envelope = self.call(envelope).await?;
        Ok(envelope.response.map(|r| r.body).unwrap_or(Value::Null))
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the bound execution context.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl fmt::Debug for ResolvedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedChain")
            .field("stages", &self.names)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
