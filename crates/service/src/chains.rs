use std::collections::HashMap;

/// Static mapping between chain aliases ("eth", "base") and chain IDs.
///
/// Built once at startup and never mutated afterwards, so it can be cloned
/// freely into every component that needs to resolve community IDs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: HashMap<String, u64>,
}

impl ChainRegistry {
    pub fn new<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            chains: chains.into_iter().map(|(alias, id)| (alias.into(), id)).collect(),
        }
    }

    pub fn chain_id_from_alias(&self, alias: &str) -> Option<u64> {
        self.chains.get(alias).copied()
    }

    // a handful of chains, a linear scan is fine
    pub fn chain_alias_from_id(&self, chain_id: u64) -> Option<&str> {
        self.chains
            .iter()
            .find(|(_, id)| **id == chain_id)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.chains.contains_key(alias)
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }
}
