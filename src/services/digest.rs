//! Signed Merkle digests over the feedback store.
//!
//! Leaves are `sha256(0x00 || card_id)`, interior nodes
//! `sha256(0x01 || left || right)`. An odd node at the end of a level is
//! promoted unchanged. The signature covers
//! `feedgate-digest:v1|<count>|<root>`, so a digest commits to both the
//! number of cards and their order.

use crate::domain::constants::{DIGEST_DOMAIN, EMPTY_TREE_LABEL, SIGNATURE_ALGORITHM};
use crate::domain::errors::FeedbackError;
use crate::domain::models::{
    DigestCheck, FeedbackCard, FeedbackDigest, InclusionProof, ProofDirection, ProofStep,
};
use crate::services::trust::{sign_hex, verify_hex};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

type Hash = [u8; 32];

const DIGEST_VERSION: u32 = 1;
const LEAF_PREFIX: [u8; 1] = [0x00];
const NODE_PREFIX: [u8; 1] = [0x01];

fn sha256(parts: &[&[u8]]) -> Hash {
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

fn leaf(card_id: &str) -> Hash {
    sha256(&[&LEAF_PREFIX[..], card_id.as_bytes()])
}

fn node(left: &Hash, right: &Hash) -> Hash {
    sha256(&[&NODE_PREFIX[..], &left[..], &right[..]])
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| {
            if pair.len() == 2 {
                node(&pair[0], &pair[1])
            } else {
                pair[0]
            }
        })
        .collect()
}

pub fn merkle_root(card_ids: &[String]) -> String {
    if card_ids.is_empty() {
        return hex::encode(sha256(&[EMPTY_TREE_LABEL]));
    }
    let mut level: Vec<Hash> = card_ids.iter().map(|id| leaf(id)).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    hex::encode(level[0])
}

pub fn prove(card_ids: &[String], card_id: &str) -> Result<InclusionProof, FeedbackError> {
    let index = card_ids
        .iter()
        .position(|c| c == card_id)
        .ok_or_else(|| FeedbackError::CardNotFound(card_id.to_string()))?;

    let mut level: Vec<Hash> = card_ids.iter().map(|id| leaf(id)).collect();
    let mut pos = index;
    let mut path = Vec::new();
    while level.len() > 1 {
        if pos % 2 == 0 {
            if pos + 1 < level.len() {
                path.push(ProofStep {
                    sibling: hex::encode(level[pos + 1]),
                    direction: ProofDirection::Right,
                });
            }
        } else {
            path.push(ProofStep {
                sibling: hex::encode(level[pos - 1]),
                direction: ProofDirection::Left,
            });
        }
        level = next_level(&level);
        pos /= 2;
    }

    Ok(InclusionProof {
        card_id: card_id.to_string(),
        index,
        path,
        root: hex::encode(level[0]),
    })
}

pub fn verify_proof(proof: &InclusionProof) -> bool {
    let mut current = leaf(&proof.card_id);
    for step in &proof.path {
        let sibling: Hash = match hex::decode(&step.sibling)
            .ok()
            .and_then(|b| b.as_slice().try_into().ok())
        {
            Some(h) => h,
            None => return false,
        };
        current = match step.direction {
            ProofDirection::Left => node(&sibling, &current),
            ProofDirection::Right => node(&current, &sibling),
        };
    }
    hex::encode(current) == proof.root
}

fn signing_message(count: usize, root: &str) -> String {
    format!("{}|{}|{}", DIGEST_DOMAIN, count, root)
}

pub fn build_digest(
    cards: &[FeedbackCard],
    key: &SigningKey,
    now: DateTime<Utc>,
) -> FeedbackDigest {
    let ids: Vec<String> = cards.iter().map(|c| c.card_id.clone()).collect();
    let root = merkle_root(&ids);
    FeedbackDigest {
        version: DIGEST_VERSION,
        count: cards.len(),
        first_ts: cards.iter().map(|c| c.ts).min(),
        last_ts: cards.iter().map(|c| c.ts).max(),
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        public_key: hex::encode(key.verifying_key().to_bytes()),
        signature: sign_hex(key, signing_message(cards.len(), &root).as_bytes()),
        root,
        created_at: now,
    }
}

/// Recomputes the root over the first `digest.count` cards of the store, so
/// a digest stays verifiable after later appends.
pub fn verify_digest(digest: &FeedbackDigest, cards: &[FeedbackCard], trusted: bool) -> DigestCheck {
    let covered: Vec<String> = cards
        .iter()
        .take(digest.count)
        .map(|c| c.card_id.clone())
        .collect();
    let root_matches = covered.len() == digest.count && merkle_root(&covered) == digest.root;
    let signature_ok = digest.algorithm == SIGNATURE_ALGORITHM
        && verify_hex(
            &digest.public_key,
            signing_message(digest.count, &digest.root).as_bytes(),
            &digest.signature,
        );
    DigestCheck {
        root_matches,
        signature_ok,
        trusted_key: trusted,
        count: digest.count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{:064x}", i)).collect()
    }

    fn cards(n: usize) -> Vec<FeedbackCard> {
        ids(n)
            .into_iter()
            .enumerate()
            .map(|(i, id)| FeedbackCard {
                card_id: id,
                ts: Utc.with_ymd_and_hms(2026, 7, 1, 0, i as u32, 0).unwrap(),
                user_hash: "u".into(),
                session_hash: "s".into(),
                task: "qa".into(),
                jurisdiction: "EU".into(),
                satisfaction: 0.5,
                issues: vec![],
                note: None,
                proposed_tuning: None,
                attestation: None,
            })
            .collect()
    }

    #[test]
    fn empty_and_single_roots() {
        assert_eq!(merkle_root(&[]), hex::encode(Sha256::digest(b"empty_feedback_tree")));
        let one = ids(1);
        assert_eq!(merkle_root(&one), hex::encode(leaf(&one[0])));
    }

    #[test]
    fn root_depends_on_order() {
        let mut v = ids(4);
        let a = merkle_root(&v);
        v.swap(0, 1);
        assert_ne!(a, merkle_root(&v));
    }

    #[test]
    fn odd_leaf_is_promoted() {
        let v = ids(3);
        let expected = node(&node(&leaf(&v[0]), &leaf(&v[1])), &leaf(&v[2]));
        assert_eq!(merkle_root(&v), hex::encode(expected));
    }

    #[test]
    fn every_leaf_has_a_valid_proof() {
        for n in [1usize, 2, 3, 5, 8, 13] {
            let v = ids(n);
            let root = merkle_root(&v);
            for id in &v {
                let proof = prove(&v, id).unwrap();
                assert_eq!(proof.root, root);
                assert!(verify_proof(&proof), "n={} id={}", n, id);
            }
        }
    }

    #[test]
    fn tampered_proof_fails() {
        let v = ids(6);
        let mut proof = prove(&v, &v[4]).unwrap();
        proof.card_id = v[3].clone();
        assert!(!verify_proof(&proof));
        assert!(prove(&v, "missing").is_err());
    }

    #[test]
    fn digest_verifies_and_survives_appends() {
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let now = Utc.with_ymd_and_hms(2026, 7, 2, 0, 0, 0).unwrap();
        let store = cards(5);
        let digest = build_digest(&store[..4], &key, now);
        assert_eq!(digest.count, 4);
        assert_eq!(digest.first_ts, Some(store[0].ts));
        assert_eq!(digest.last_ts, Some(store[3].ts));

        let check = verify_digest(&digest, &store, true);
        assert!(check.root_matches && check.signature_ok);

        let mut forged = digest.clone();
        forged.count = 5;
        let check = verify_digest(&forged, &store, true);
        assert!(!check.signature_ok);

        let mut reordered = store.clone();
        reordered.swap(1, 2);
        assert!(!verify_digest(&digest, &reordered, true).root_matches);
        assert!(!verify_digest(&digest, &store[..3], true).root_matches);
    }
}
