//! # IDDocument Lifecycle
//!
//! Build and publish a node's IDDoc, fetch peers' IDDocs, and check that a
//! stored seed still matches what was published.

use dta_02_content_store::ContentStore;
use dta_04_envelope::{decode_iddoc, encode_iddoc, IdDocument};

use crate::errors::IdentityError;
use crate::keyring::Keyring;

/// IDDoc and its encoded envelope for `keyring`.
pub fn build_iddoc(
    keyring: &Keyring,
    name: &str,
    timestamp: i64,
) -> Result<(IdDocument, Vec<u8>), IdentityError> {
    let iddoc = keyring.iddoc(name, timestamp);
    let raw = encode_iddoc(&iddoc, keyring.bls_secret_key())?;
    Ok((iddoc, raw))
}

/// Generate a fresh identity, publish its IDDoc and return `(cid, keyring)`.
///
/// The caller persists `keyring.seed()`.
pub async fn create_identity(
    name: &str,
    store: &dyn ContentStore,
) -> Result<(String, Keyring), IdentityError> {
    let keyring = Keyring::generate()?;
    let (_, raw) = build_iddoc(&keyring, name, chrono::Utc::now().timestamp())?;
    let cid = store.put(raw).await?;
    tracing::info!(cid = %cid, name, "published identity document");
    Ok((cid, keyring))
}

/// Fetch and decode a peer IDDoc; its signature must match its own BLS key.
pub async fn retrieve_iddoc(store: &dyn ContentStore, cid: &str) -> Result<IdDocument, IdentityError> {
    let raw = store.get(cid).await?;
    let (_, iddoc) = decode_iddoc(&raw, cid)?;
    Ok(iddoc)
}

/// Verify the IDDoc at `cid` was produced from `keyring` under `name`.
pub async fn check_identity(
    store: &dyn ContentStore,
    cid: &str,
    name: &str,
    keyring: &Keyring,
) -> Result<(), IdentityError> {
    let iddoc = retrieve_iddoc(store, cid).await?;
    if iddoc.authentication_reference != name {
        return Err(IdentityError::Mismatch("name differs from the authentication reference"));
    }
    if iddoc.sike_public_key != keyring.sike_public_key() {
        return Err(IdentityError::Mismatch("KEM keys differ"));
    }
    if iddoc.bls_public_key != keyring.bls_public_key() {
        return Err(IdentityError::Mismatch("BLS keys differ"));
    }
    if iddoc.beneficiary_ec_public_key != keyring.ec_public_key() {
        return Err(IdentityError::Mismatch("EC keys differ"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dta_02_content_store::MemoryContentStore;

    #[tokio::test]
    async fn test_create_retrieve_check() {
        let store = MemoryContentStore::new();
        let (cid, keyring) = create_identity("alice", &store).await.unwrap();
        assert!(cid.starts_with("Qm") && cid.len() == 46);

        let iddoc = retrieve_iddoc(&store, &cid).await.unwrap();
        assert_eq!(iddoc.authentication_reference, "alice");
        assert_eq!(iddoc.bls_public_key, keyring.bls_public_key());

        check_identity(&store, &cid, "alice", &keyring).await.unwrap();
        assert!(matches!(
            check_identity(&store, &cid, "bob", &keyring).await,
            Err(IdentityError::Mismatch(_))
        ));

        let other = Keyring::generate().unwrap();
        assert!(matches!(
            check_identity(&store, &cid, "alice", &other).await,
            Err(IdentityError::Mismatch(_))
        ));
    }

    #[test]
    fn test_identical_seed_identical_document() {
        let seed: Vec<u8> = (1..=48).collect();
        let a = build_iddoc(&Keyring::from_seed(&seed).unwrap(), "node", 1_700_000_000).unwrap();
        let b = build_iddoc(&Keyring::from_seed(&seed).unwrap(), "node", 1_700_000_000).unwrap();
        assert_eq!(a.1, b.1);
    }

    #[tokio::test]
    async fn test_missing_document() {
        let store = MemoryContentStore::new();
        let cid = shared_crypto::multihash_cid(b"never stored");
        assert!(matches!(
            retrieve_iddoc(&store, &cid).await,
            Err(IdentityError::ContentStore(_))
        ));
    }
}
