use crate::{
    error::{BridgeError, BridgeResult},
    models::model::Chain,
};

/// The two chains the bridge connects. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    l1: Chain,
    l2: Chain,
}

impl ChainRegistry {
    pub fn new(l1: Chain, l2: Chain) -> Self {
        Self { l1, l2 }
    }

    pub fn l1(&self) -> &Chain {
        &self.l1
    }

    pub fn l2(&self) -> &Chain {
        &self.l2
    }

    pub fn all(&self) -> [&Chain; 2] {
        [&self.l1, &self.l2]
    }

    pub fn by_network_id(&self, network_id: u32) -> BridgeResult<&Chain> {
        self.all()
            .into_iter()
            .find(|chain| chain.network_id == network_id)
            .ok_or_else(|| {
                BridgeError::RegistryMismatch(format!("unknown network id {}", network_id))
            })
    }

    pub fn by_chain_id(&self, chain_id: u64) -> BridgeResult<&Chain> {
        self.all()
            .into_iter()
            .find(|chain| chain.chain_id == chain_id)
            .ok_or_else(|| BridgeError::RegistryMismatch(format!("unknown chain id {}", chain_id)))
    }

    pub fn is_l1(&self, chain: &Chain) -> bool {
        chain.network_id == self.l1.network_id
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{l1_chain, l2_chain, registry};

    #[test]
    fn test_lookup_by_ids() {
        let chains = registry();

        assert_eq!(chains.by_network_id(0).unwrap(), &l1_chain());
        assert_eq!(chains.by_network_id(1).unwrap(), &l2_chain());
        assert_eq!(chains.by_chain_id(1442).unwrap().key, "polygon-zkevm");
    }

    #[test]
    fn test_unknown_network_is_registry_mismatch() {
        let err = registry().by_network_id(7).unwrap_err();
        assert!(matches!(err, crate::BridgeError::RegistryMismatch(_)));
    }

    #[test]
    fn test_is_l1() {
        let chains = registry();
        assert!(chains.is_l1(&l1_chain()));
        assert!(!chains.is_l1(&l2_chain()));
    }
}
