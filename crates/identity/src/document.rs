use serde_json::{json, Value};

use fides_crypto::base58_encode;

use crate::did::Did;

/// Build the JSON document describing an agent identity.
///
/// The document mirrors the DID-document shape consumed by resolvers: the
/// identifier, its single Ed25519 verification method, and the relationships
/// that reference it.
pub fn agent_document(did: &Did, metadata: Option<&Value>) -> Value {
    let key_id = format!("{}#keys-1", did);

    let mut doc = json!({
        "id": did.as_str(),
        "verificationMethod": [{
            "id": key_id,
            "type": "Ed25519VerificationKey2020",
            "controller": did.as_str(),
            "publicKeyBase58": base58_encode(&did.public_key()),
        }],
        "authentication": [key_id],
        "assertionMethod": [key_id],
    });

    if let Some(metadata) = metadata {
        doc["metadata"] = metadata.clone();
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use fides_crypto::KeyPair;

    #[test]
    fn document_embeds_key_and_relationships() {
        let keypair = KeyPair::generate();
        let did = Did::from_public_key(&keypair.public_key_bytes()).unwrap();

        let doc = agent_document(&did, None);

        assert_eq!(doc["id"], did.as_str());
        assert_eq!(
            doc["verificationMethod"][0]["publicKeyBase58"],
            base58_encode(&keypair.public_key_bytes())
        );
        assert_eq!(doc["authentication"][0], format!("{}#keys-1", did));
    }

    #[test]
    fn document_carries_metadata() {
        let keypair = KeyPair::generate();
        let did = Did::from_public_key(&keypair.public_key_bytes()).unwrap();
        let metadata = json!({"name": "billing-agent"});

        let doc = agent_document(&did, Some(&metadata));
        assert_eq!(doc["metadata"]["name"], "billing-agent");
    }
}
