use std::collections::HashMap;
use xsdedit_dom::NodeId;
use xsdedit_schema::IdLookup;

/// Owners of `ID` typed values, per document.
///
/// Several nodes may claim the same ID. The first claimant owns it; the rest
/// wait in line and are promoted when the owner releases it.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    claims: HashMap<String, Vec<NodeId>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node` as a claimant of `id`. Empty IDs are ignored.
    pub fn register(&mut self, id: &str, node: NodeId) {
        if id.is_empty() {
            return;
        }
        let claimants = self.claims.entry(id.to_string()).or_default();
        if !claimants.contains(&node) {
            claimants.push(node);
        }
    }

    /// Withdraw the claim of `node` on `id`, returning the new owner if ownership moved
    pub fn release(&mut self, id: &str, node: NodeId) -> Option<NodeId> {
        let claimants = self.claims.get_mut(id)?;
        let position = claimants.iter().position(|n| *n == node)?;
        claimants.remove(position);

        let promoted = if position == 0 {
            claimants.first().copied()
        } else {
            None
        };
        if claimants.is_empty() {
            self.claims.remove(id);
        }
        promoted
    }

    pub fn owner_of(&self, id: &str) -> Option<NodeId> {
        self.claims.get(id).and_then(|claimants| claimants.first().copied())
    }

    pub fn candidates(&self, id: &str) -> &[NodeId] {
        self.claims.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
    }
}

impl IdLookup for IdRegistry {
    fn owner_of(&self, id: &str) -> Option<NodeId> {
        IdRegistry::owner_of(self, id)
    }
}
