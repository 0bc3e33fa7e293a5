use crate::diagnostic::Diagnostic;
use crate::literal::Literal;
use crate::parameter::{RuleParameter, ValueSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};
use xsdedit_dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

type Listener = Box<dyn FnOnce(&RuleId) + Send>;

/// One-shot "rule resolved" event
///
/// Listeners run at most once: firing drains them. Someone who wants the next
/// resolution as well has to subscribe again.
#[derive(Default)]
pub struct ResolutionSignal {
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl ResolutionSignal {
    pub fn subscribe(&mut self, listener: impl FnOnce(&RuleId) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription was still pending
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Run and drop every pending listener, returning how many ran
    pub fn fire(&mut self, rule: &RuleId) -> usize {
        let listeners = std::mem::take(&mut self.listeners);
        let count = listeners.len();
        for (_, listener) in listeners {
            listener(rule);
        }
        count
    }
}

impl fmt::Debug for ResolutionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSignal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// What one evaluation of a rule found out
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEvaluation {
    /// Nodes the parameters resolved to, first match per parameter, deduplicated
    pub referenced_nodes: Vec<NodeId>,
    /// Whether this evaluation moved the rule into the satisfied state
    pub fired: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// A cross-field constraint: if every premise literal holds, every conclusion literal must
#[derive(Debug)]
pub struct Rule {
    id: RuleId,
    parameters: Vec<RuleParameter>,
    premise: Vec<Literal>,
    conclusion: Vec<Literal>,
    message: String,
    satisfied: bool,
    resolution: ResolutionSignal,
}

impl Rule {
    /// Parameters sharing an id replace the earlier one in place
    pub fn new(
        id: RuleId,
        parameters: Vec<RuleParameter>,
        premise: Vec<Literal>,
        conclusion: Vec<Literal>,
        message: impl Into<String>,
    ) -> Self {
        let mut unique: Vec<RuleParameter> = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            match unique.iter_mut().find(|p| p.id() == parameter.id()) {
                Some(existing) => *existing = parameter,
                None => unique.push(parameter),
            }
        }
        Self {
            id,
            parameters: unique,
            premise,
            conclusion,
            message: message.into(),
            satisfied: false,
            resolution: ResolutionSignal::default(),
        }
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn parameters(&self) -> &[RuleParameter] {
        &self.parameters
    }

    pub fn premise(&self) -> &[Literal] {
        &self.premise
    }

    pub fn conclusion(&self) -> &[Literal] {
        &self.conclusion
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Result of the last evaluation; false before the first one
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn resolution(&mut self) -> &mut ResolutionSignal {
        &mut self.resolution
    }

    /// Re-evaluate against the live document
    ///
    /// A premise that is false or cannot be evaluated makes the rule hold. The
    /// resolution signal fires on a transition into the satisfied state.
    pub fn evaluate(&mut self, source: &dyn ValueSource) -> RuleEvaluation {
        let mut values = HashMap::new();
        let mut referenced_nodes = Vec::new();
        let mut diagnostics = Vec::new();

        for parameter in &self.parameters {
            if let Some(diagnostic) = parameter.diagnostic() {
                diagnostics.push(diagnostic.with_rule(self.id.as_str()));
            }
            if let Some(resolved) = parameter.resolve(source) {
                trace!(rule = %self.id, parameter = parameter.id(), value = %resolved.value, "parameter resolved");
                if !referenced_nodes.contains(&resolved.node) {
                    referenced_nodes.push(resolved.node);
                }
                values.insert(parameter.id().to_string(), resolved.value);
            }
        }

        let mut conjunction = |literals: &[Literal]| {
            let mut holds = true;
            for literal in literals {
                let outcome = literal.evaluate(&values);
                holds &= outcome.value.is_true();
                diagnostics.extend(
                    outcome
                        .diagnostics
                        .into_iter()
                        .map(|d| d.with_rule(self.id.as_str())),
                );
            }
            holds
        };

        let premise_holds = conjunction(&self.premise);
        let satisfied = if premise_holds {
            conjunction(&self.conclusion)
        } else {
            true
        };

        let fired = satisfied && !self.satisfied;
        self.satisfied = satisfied;
        if fired {
            let notified = self.resolution.fire(&self.id);
            debug!(rule = %self.id, notified, "rule resolved");
        }

        RuleEvaluation {
            referenced_nodes,
            fired,
            diagnostics,
        }
    }
}
