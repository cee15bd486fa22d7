use ethers::types::{Address, H256, U256};
use serde::Deserialize;

use crate::{
    error::{BridgeError, BridgeResult},
    models::model::{Claim, Deposit, DepositPage, MerkleProof, normalize_hash},
};

// ============================================================================
// WIRE MODELS
// ============================================================================

/// Integers arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiUint {
    Number(u64),
    Text(String),
}

impl Default for ApiUint {
    fn default() -> Self {
        ApiUint::Number(0)
    }
}

impl ApiUint {
    pub fn parse(&self, field: &str) -> BridgeResult<u64> {
        match self {
            ApiUint::Number(n) => Ok(*n),
            ApiUint::Text(s) => {
                if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(BridgeError::Schema(format!(
                        "{} must be a non-negative integer, got {:?}",
                        field, s
                    )));
                }
                s.parse()
                    .map_err(|e| BridgeError::Schema(format!("{} out of range: {}", field, e)))
            }
        }
    }

    pub fn parse_u32(&self, field: &str) -> BridgeResult<u32> {
        u32::try_from(self.parse(field)?)
            .map_err(|_| BridgeError::Schema(format!("{} does not fit in 32 bits", field)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDeposit {
    pub orig_net: ApiUint,
    pub orig_addr: String,
    pub amount: String,
    pub dest_net: ApiUint,
    pub dest_addr: String,
    #[serde(default)]
    pub block_num: ApiUint,
    pub deposit_cnt: ApiUint,
    pub network_id: ApiUint,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositsResponse {
    #[serde(default)]
    pub deposits: Option<Vec<ApiDeposit>>,
    #[serde(default, alias = "total_cnt")]
    pub total: ApiUint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiClaim {
    pub index: ApiUint,
    pub network_id: ApiUint,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimsResponse {
    #[serde(default)]
    pub claims: Option<Vec<ApiClaim>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimStatusResponse {
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMerkleProof {
    pub merkle_proof: Vec<String>,
    pub exit_root_num: ApiUint,
    pub l2_exit_root_num: ApiUint,
    pub main_exit_root: String,
    pub rollup_exit_root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerkleProofResponse {
    pub proof: ApiMerkleProof,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Parses a `0x`-prefixed 32-byte hex string (66 characters).
pub fn parse_hash32(field: &str, value: &str) -> BridgeResult<H256> {
    let invalid = || {
        BridgeError::Schema(format!("{} is not a 32-byte hex string: {:?}", field, value))
    };

    if value.len() != 66 || !value.starts_with("0x") {
        return Err(invalid());
    }
    let bytes: [u8; 32] = hex::decode(&value[2..])
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;

    Ok(H256::from(bytes))
}

fn parse_address(field: &str, value: &str) -> BridgeResult<Address> {
    value
        .parse()
        .map_err(|e| BridgeError::Schema(format!("invalid {} {:?}: {}", field, value, e)))
}

fn parse_tx_hash(field: &str, value: &str) -> BridgeResult<String> {
    let hash = normalize_hash(value);
    let valid = hash
        .strip_prefix("0x")
        .is_some_and(|hex| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if !valid {
        return Err(BridgeError::Schema(format!("invalid {} {:?}", field, value)));
    }
    Ok(hash)
}

impl TryFrom<ApiDeposit> for Deposit {
    type Error = BridgeError;

    fn try_from(api: ApiDeposit) -> BridgeResult<Self> {
        if api.amount.is_empty() || !api.amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BridgeError::Schema(format!(
                "amount must be a non-negative integer, got {:?}",
                api.amount
            )));
        }

        Ok(Deposit {
            token_address: parse_address("orig_addr", &api.orig_addr)?,
            token_network_id: api.orig_net.parse_u32("orig_net")?,
            network_id: api.network_id.parse_u32("network_id")?,
            destination_network_id: api.dest_net.parse_u32("dest_net")?,
            destination_address: parse_address("dest_addr", &api.dest_addr)?,
            amount: U256::from_dec_str(&api.amount)
                .map_err(|e| BridgeError::Schema(format!("invalid amount: {}", e)))?,
            deposit_count: api.deposit_cnt.parse("deposit_cnt")?,
            block_number: api.block_num.parse("block_num")?,
            tx_hash: parse_tx_hash("tx_hash", &api.tx_hash)?,
        })
    }
}

impl TryFrom<DepositsResponse> for DepositPage {
    type Error = BridgeError;

    fn try_from(response: DepositsResponse) -> BridgeResult<Self> {
        let deposits = response
            .deposits
            .unwrap_or_default()
            .into_iter()
            .map(Deposit::try_from)
            .collect::<BridgeResult<Vec<_>>>()?;
        let total = response.total.parse("total")?.max(deposits.len() as u64);

        Ok(DepositPage { deposits, total })
    }
}

impl TryFrom<ApiClaim> for Claim {
    type Error = BridgeError;

    fn try_from(api: ApiClaim) -> BridgeResult<Self> {
        Ok(Claim {
            index: api.index.parse("index")?,
            network_id: api.network_id.parse_u32("network_id")?,
            tx_hash: parse_tx_hash("tx_hash", &api.tx_hash)?,
        })
    }
}

impl TryFrom<ApiMerkleProof> for MerkleProof {
    type Error = BridgeError;

    fn try_from(api: ApiMerkleProof) -> BridgeResult<Self> {
        Ok(MerkleProof {
            merkle_proof: api
                .merkle_proof
                .iter()
                .map(|node| parse_hash32("merkle_proof", node))
                .collect::<BridgeResult<Vec<_>>>()?,
            exit_root_num: api.exit_root_num.parse("exit_root_num")?,
            l2_exit_root_num: api.l2_exit_root_num.parse("l2_exit_root_num")?,
            main_exit_root: parse_hash32("main_exit_root", &api.main_exit_root)?,
            rollup_exit_root: parse_hash32("rollup_exit_root", &api.rollup_exit_root)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn deposits_json(deposit_cnt: &str) -> String {
        format!(
            r#"{{
                "deposits": [{{
                    "leaf_type": 0,
                    "orig_net": 0,
                    "orig_addr": "0x0000000000000000000000000000000000000000",
                    "amount": "1000000000000000000",
                    "dest_net": 1,
                    "dest_addr": "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd",
                    "block_num": "120",
                    "deposit_cnt": {},
                    "network_id": 0,
                    "tx_hash": "0xDEADBEEF",
                    "claim_tx_hash": "",
                    "ready_for_claim": false
                }}],
                "total_cnt": "1"
            }}"#,
            deposit_cnt
        )
    }

    #[test]
    fn test_parse_deposit_page() {
        let response: DepositsResponse = serde_json::from_str(&deposits_json("\"3\"")).unwrap();
        let page = DepositPage::try_from(response).unwrap();

        assert_eq!(page.total, 1);
        let deposit = &page.deposits[0];
        assert_eq!(deposit.deposit_count, 3);
        assert_eq!(deposit.destination_network_id, 1);
        assert_eq!(deposit.block_number, 120);
        assert_eq!(deposit.amount, U256::exp10(18));
        assert_eq!(deposit.tx_hash, "0xdeadbeef");
    }

    #[test]
    fn test_numeric_deposit_count_accepted() {
        let response: DepositsResponse = serde_json::from_str(&deposits_json("3")).unwrap();
        assert_eq!(DepositPage::try_from(response).unwrap().deposits[0].deposit_count, 3);
    }

    #[test]
    fn test_negative_deposit_count_rejected() {
        let parsed = serde_json::from_str::<DepositsResponse>(&deposits_json("\"-3\""))
            .map_err(BridgeError::from)
            .and_then(DepositPage::try_from);
        assert!(matches!(parsed, Err(BridgeError::Schema(_))));

        let parsed = serde_json::from_str::<DepositsResponse>(&deposits_json("-3"))
            .map_err(BridgeError::from)
            .and_then(DepositPage::try_from);
        assert!(matches!(parsed, Err(BridgeError::Schema(_))));
    }

    #[test]
    fn test_empty_deposits_are_null() {
        let response: DepositsResponse =
            serde_json::from_str(r#"{"deposits": null, "total_cnt": "0"}"#).unwrap();
        let page = DepositPage::try_from(response).unwrap();
        assert!(page.deposits.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_parse_claims() {
        let response: ClaimsResponse = serde_json::from_str(
            r#"{"claims": [{"index": "3", "network_id": 1, "tx_hash": "0xabc"}]}"#,
        )
        .unwrap();
        let claim = Claim::try_from(response.claims.unwrap().remove(0)).unwrap();

        assert_eq!(
            claim,
            Claim {
                index: 3,
                network_id: 1,
                tx_hash: "0xabc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_merkle_proof() {
        let json = format!(
            r#"{{"proof": {{
                "merkle_proof": ["{root}", "{root}"],
                "exit_root_num": "12",
                "l2_exit_root_num": "7",
                "main_exit_root": "{root}",
                "rollup_exit_root": "{root}"
            }}}}"#,
            root = ROOT
        );
        let response: MerkleProofResponse = serde_json::from_str(&json).unwrap();
        let proof = MerkleProof::try_from(response.proof).unwrap();

        assert_eq!(proof.merkle_proof.len(), 2);
        assert_eq!(proof.exit_root_num, 12);
        assert_eq!(proof.l2_exit_root_num, 7);
        assert_eq!(proof.main_exit_root, H256::repeat_byte(0x11));
    }

    #[test]
    fn test_hash32_rejects_wrong_length_or_prefix() {
        assert!(parse_hash32("root", &ROOT[..65]).is_err());
        assert!(parse_hash32("root", &format!("{}1", ROOT)).is_err());
        assert!(parse_hash32("root", &ROOT.replacen("0x", "1x", 1)).is_err());
        assert!(parse_hash32("root", &ROOT.replace('1', "g")).is_err());
        assert!(parse_hash32("root", ROOT).is_ok());
    }
}
