use serde_json::Value;

use fides_attestation::{create_attestation, Attestation};
use fides_crypto::{hex_encode, KeyPair};
use fides_identity::{agent_document, Did};
use fides_keystore::KeyStore;
use fides_signature::{sign_request, RequestMessage, SignOptions};

use crate::error::AgentResult;

/// An agent's local identity: its identifier and the keypair behind it.
pub struct AgentIdentity {
    did: Did,
    keypair: KeyPair,
}

impl AgentIdentity {
    /// Mint a fresh identity and persist it in the keystore.
    pub async fn mint(store: &dyn KeyStore) -> AgentResult<Self> {
        let keypair = KeyPair::generate();
        let did = Did::from_public_key(&keypair.public_key_bytes())?;

        store.save(did.as_str(), &keypair).await?;

        Ok(Self { did, keypair })
    }

    /// Load an existing identity from the keystore.
    pub async fn load(store: &dyn KeyStore, did: &str) -> AgentResult<Self> {
        let keypair = store.load(did).await?;
        let did = Did::new(did)?;
        Ok(Self { did, keypair })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Hex encoding of the public key, as the registry expects it.
    pub fn public_key_hex(&self) -> String {
        hex_encode(&self.keypair.public_key_bytes())
    }

    /// The identity's DID-document view.
    pub fn document(&self, metadata: Option<&Value>) -> Value {
        agent_document(&self.did, metadata)
    }

    /// A `/.well-known/fides.json` document for agents hosting their own
    /// discovery, in the shape resolvers consume.
    pub fn well_known_document(&self, metadata: Option<&Value>) -> Value {
        serde_json::json!({
            "service": "fides-agent",
            "identities": [{
                "did": self.did.as_str(),
                "publicKey": self.public_key_hex(),
                "metadata": metadata,
            }],
        })
    }

    /// Sign an outbound request with this identity's key.
    pub fn sign_request(&self, request: &mut RequestMessage) -> AgentResult<()> {
        sign_request(request, &self.keypair, SignOptions::new(self.did.as_str()))?;
        Ok(())
    }

    /// Issue a trust attestation for a subject.
    pub fn attest(&self, subject_did: &str, trust_level: u8) -> AgentResult<Attestation> {
        Ok(create_attestation(
            self.did.as_str(),
            subject_did,
            trust_level,
            &self.keypair,
        )?)
    }
}
