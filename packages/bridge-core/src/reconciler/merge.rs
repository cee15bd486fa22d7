use std::collections::HashSet;

use crate::models::model::{Bridge, BridgeStatus, PendingTx, PendingTxKind};

/// Folds locally-pending transactions into the indexer's bridge list.
///
/// Pending txs the indexer has not observed become `Pending` entries placed
/// before the indexer entries. A local claim overrides a not-yet-completed
/// indexer status. Merging the output again with the same pending txs yields
/// the same list.
pub fn merge_with_pending(api_bridges: &[Bridge], pending_txs: &[PendingTx]) -> Vec<Bridge> {
    let mut seen = HashSet::new();
    let local_only = pending_txs
        .iter()
        .filter(|tx| seen.insert(tx.deposit_tx_hash.clone()))
        .filter(|tx| {
            !api_bridges
                .iter()
                .any(|bridge| bridge.deposit_tx_hash == tx.deposit_tx_hash)
        })
        .map(pending_bridge);

    let reconciled = api_bridges.iter().map(|bridge| {
        match pending_txs
            .iter()
            .find(|tx| tx.deposit_tx_hash == bridge.deposit_tx_hash)
        {
            Some(tx) => overlay(bridge, tx),
            None => bridge.clone(),
        }
    });

    local_only.chain(reconciled).collect()
}

fn pending_bridge(tx: &PendingTx) -> Bridge {
    Bridge {
        id: None,
        from: tx.from.clone(),
        to: tx.to.clone(),
        token: tx.token.clone(),
        amount: tx.amount,
        destination_address: tx.destination_address,
        deposit_tx_hash: tx.deposit_tx_hash.clone(),
        fiat_amount: None,
        status: BridgeStatus::Pending {
            claim_tx_hash: tx.claim_tx_hash().map(str::to_string),
        },
    }
}

fn overlay(bridge: &Bridge, tx: &PendingTx) -> Bridge {
    match (&bridge.status, &tx.kind) {
        (BridgeStatus::Pending { .. } | BridgeStatus::Completed { .. }, _) => bridge.clone(),
        (_, PendingTxKind::Claim { claim_tx_hash }) => Bridge {
            status: BridgeStatus::Completed {
                claim_tx_hash: claim_tx_hash.clone(),
            },
            ..bridge.clone()
        },
        (_, PendingTxKind::Deposit) => bridge.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        models::model::BridgeId,
        test_utils::{api_bridge, merkle_proof, pending_claim, pending_deposit},
    };

    fn on_hold() -> BridgeStatus {
        BridgeStatus::OnHold {
            merkle_proof: merkle_proof(),
        }
    }

    fn scenarios() -> Vec<(Vec<Bridge>, Vec<PendingTx>)> {
        let api = vec![
            api_bridge(5, "0x05", BridgeStatus::Initiated),
            api_bridge(4, "0x04", on_hold()),
            api_bridge(
                3,
                "0x03",
                BridgeStatus::Completed {
                    claim_tx_hash: "0xc3".to_string(),
                },
            ),
        ];
        let pending = vec![
            pending_deposit("0x07"),
            pending_claim("0x04", "0xc4"),
            pending_deposit("0x05"),
            pending_claim("0x08", "0xc8"),
            pending_deposit("0x07"),
        ];

        vec![
            (vec![], vec![]),
            (api.clone(), vec![]),
            (vec![], pending.clone()),
            (api, pending),
        ]
    }

    #[test]
    fn test_local_only_entries_are_prepended() {
        let api = vec![api_bridge(5, "0x05", BridgeStatus::Initiated)];
        let pending = vec![pending_deposit("0x07"), pending_claim("0x08", "0xc8")];

        let merged = merge_with_pending(&api, &pending);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].deposit_tx_hash, "0x07");
        assert_eq!(
            merged[0].status,
            BridgeStatus::Pending {
                claim_tx_hash: None
            }
        );
        assert_eq!(merged[0].id, None);
        assert_eq!(
            merged[1].status,
            BridgeStatus::Pending {
                claim_tx_hash: Some("0xc8".to_string())
            }
        );
        assert_eq!(merged[2], api[0]);
    }

    #[test]
    fn test_indexed_deposit_supersedes_pending_deposit() {
        let api = vec![api_bridge(5, "0x05", BridgeStatus::Initiated)];
        let merged = merge_with_pending(&api, &[pending_deposit("0x05")]);

        assert_eq!(merged, api);
    }

    #[test]
    fn test_local_claim_overrides_on_hold() {
        let api = vec![api_bridge(4, "0x04", on_hold())];
        let merged = merge_with_pending(&api, &[pending_claim("0x04", "0xc4")]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, Some(BridgeId::new(4, 1)));
        assert_eq!(
            merged[0].status,
            BridgeStatus::Completed {
                claim_tx_hash: "0xc4".to_string()
            }
        );
    }

    #[test]
    fn test_indexer_completion_wins_over_local_claim() {
        let completed = BridgeStatus::Completed {
            claim_tx_hash: "0xindexed".to_string(),
        };
        let api = vec![api_bridge(4, "0x04", completed.clone())];
        let merged = merge_with_pending(&api, &[pending_claim("0x04", "0xc4")]);

        assert_eq!(merged[0].status, completed);
    }

    #[test]
    fn test_merge_is_idempotent() {
        for (api, pending) in scenarios() {
            let once = merge_with_pending(&api, &pending);
            let twice = merge_with_pending(&once, &pending);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_at_most_one_entry_per_id_and_hash() {
        for (api, pending) in scenarios() {
            let merged = merge_with_pending(&api, &pending);

            let mut ids = HashMap::new();
            let mut hashes = HashSet::new();
            for bridge in &merged {
                if let Some(id) = bridge.id {
                    *ids.entry(id).or_insert(0) += 1;
                }
                assert!(
                    hashes.insert(bridge.deposit_tx_hash.clone()),
                    "duplicate entry for {}",
                    bridge.deposit_tx_hash
                );
            }
            assert!(ids.values().all(|count| *count == 1));
        }
    }

    #[test]
    fn test_reconciled_entries_keep_indexer_order() {
        let (api, pending) = scenarios().pop().unwrap();
        let merged = merge_with_pending(&api, &pending);

        let indexed: Vec<_> = merged.iter().filter_map(|b| b.id).collect();
        assert_eq!(
            indexed,
            vec![BridgeId::new(5, 1), BridgeId::new(4, 1), BridgeId::new(3, 1)]
        );
        assert_eq!(merged.len(), 5);
        assert!(merged[..2].iter().all(|b| b.id.is_none()));
    }
}
