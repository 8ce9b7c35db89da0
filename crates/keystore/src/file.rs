use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use fides_crypto::{KeyError, KeyPair, KeyResult};

use crate::record::KeyRecord;
use crate::KeyStore;

/// File-backed keystore, one JSON record per identifier.
///
/// When a passphrase is configured every secret is sealed in an AES-256-GCM
/// envelope; otherwise secrets are stored base64-encoded. Records are owner
/// read/write only.
pub struct FileKeyStore {
    dir: PathBuf,
    passphrase: Option<String>,
}

impl FileKeyStore {
    pub fn new(dir: impl AsRef<Path>, passphrase: Option<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            passphrase,
        }
    }

    /// Record filename for an identifier, with colons flattened to hyphens.
    fn record_path(&self, did: &str) -> PathBuf {
        self.dir.join(format!("{}.json", did.replace(':', "-")))
    }

    async fn ensure_dir(&self) -> KeyResult<()> {
        fs::create_dir_all(&self.dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.dir, perms).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn save(&self, did: &str, keypair: &KeyPair) -> KeyResult<()> {
        self.ensure_dir().await?;

        let record = KeyRecord::seal(did, keypair, self.passphrase.as_deref())?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| KeyError::Serialization(format!("Failed to serialize key record: {}", e)))?;

        let path = self.record_path(did);
        fs::write(&path, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).await?;
        }

        debug!(did, encrypted = record.encrypted, "Saved key record");
        Ok(())
    }

    async fn load(&self, did: &str) -> KeyResult<KeyPair> {
        let path = self.record_path(did);

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyError::NotFound(did.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let record: KeyRecord = serde_json::from_str(&json)
            .map_err(|e| KeyError::Serialization(format!("Failed to parse key record: {}", e)))?;

        if record.did != did {
            return Err(KeyError::IdentifierMismatch {
                stored: record.did,
                requested: did.to_string(),
            });
        }

        record.open(self.passphrase.as_deref())
    }

    async fn contains(&self, did: &str) -> KeyResult<bool> {
        Ok(self.record_path(did).exists())
    }

    async fn list(&self) -> KeyResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut dids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                dids.push(stem.replacen("did-fides-", "did:fides:", 1));
            }
        }

        dids.sort();
        Ok(dids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fides_identity::derive_did;
    use tempfile::tempdir;

    #[tokio::test]
    async fn plaintext_save_and_load() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), None);

        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();

        store.save(&did, &keypair).await.unwrap();
        let loaded = store.load(&did).await.unwrap();

        assert_eq!(loaded.public_key_bytes(), keypair.public_key_bytes());
    }

    #[tokio::test]
    async fn encrypted_save_and_load() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), Some("hunter2".to_string()));

        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();

        store.save(&did, &keypair).await.unwrap();
        let loaded = store.load(&did).await.unwrap();

        assert_eq!(loaded.public_key_bytes(), keypair.public_key_bytes());
    }

    #[tokio::test]
    async fn wrong_passphrase_fails() {
        let dir = tempdir().unwrap();
        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();

        let writer = FileKeyStore::new(dir.path(), Some("correct".to_string()));
        writer.save(&did, &keypair).await.unwrap();

        let reader = FileKeyStore::new(dir.path(), Some("wrong".to_string()));
        let result = reader.load(&did).await;
        assert!(matches!(result, Err(KeyError::Decryption(_))));
    }

    #[tokio::test]
    async fn identifier_mismatch_is_refused() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), None);

        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();
        store.save(&did, &keypair).await.unwrap();

        // Copy the record under a different identifier's filename
        let other = derive_did(&KeyPair::generate().public_key_bytes()).unwrap();
        let src = dir.path().join(format!("{}.json", did.replace(':', "-")));
        let dst = dir.path().join(format!("{}.json", other.replace(':', "-")));
        std::fs::copy(&src, &dst).unwrap();

        let result = store.load(&other).await;
        assert!(matches!(result, Err(KeyError::IdentifierMismatch { .. })));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), None);
        let result = store.load("did:fides:missing").await;
        assert!(matches!(result, Err(KeyError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn record_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), None);

        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();
        store.save(&did, &keypair).await.unwrap();

        let path = dir.path().join(format!("{}.json", did.replace(':', "-")));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn list_restores_identifier_form() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path(), None);

        let keypair = KeyPair::generate();
        let did = derive_did(&keypair.public_key_bytes()).unwrap();
        store.save(&did, &keypair).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![did]);
    }
}
