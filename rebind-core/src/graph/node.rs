//! Node identity.
//!
//! Objects and arrays are shared handles, so "the same node" cannot be
//! decided by contents. Each node draws an ID when it is created and keeps it
//! for life; equality of nodes, cycle detection and log fields all use it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an object or array node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let ids: Vec<_> = (0..64).map(|_| NodeId::next()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_ne!(ids[0].raw(), 0);
    }

    #[test]
    fn display_prefixes_hash() {
        let id = NodeId::next();
        assert_eq!(id.to_string(), format!("#{}", id.raw()));
    }
}
