/// Document protection: a state machine gating mutation, plus watermark,
/// encryption, and signature settings.
///
/// Protection moves between `Unprotected` and one of the restriction kinds
/// via [`Protection::enable`] / [`Protection::disable`]. The password is
/// stored as a salted SHA-512 hash, emitted into `word/settings.xml` as the
/// `w:documentProtection` hash/salt attributes. Watermarks, encryption, and
/// signature settings are configuration records attached to the same
/// aggregate; they are not gated by the password.
use crate::docx::error::{DocxError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use sha2::{Digest, Sha512};
use std::collections::{HashMap, HashSet};

/// The kind of protection applied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtectionKind {
    /// No protection
    #[default]
    None,
    /// No editing allowed
    ReadOnly,
    /// Only comments allowed
    Comments,
    /// Only tracked changes allowed
    TrackChanges,
    /// Only form fields allowed
    Forms,
}

impl ProtectionKind {
    /// The `w:documentProtection@w:edit` attribute value.
    pub fn as_edit_value(&self) -> Option<&'static str> {
        match self {
            ProtectionKind::None => None,
            ProtectionKind::ReadOnly => Some("readOnly"),
            ProtectionKind::Comments => Some("comments"),
            ProtectionKind::TrackChanges => Some("trackedChanges"),
            ProtectionKind::Forms => Some("forms"),
        }
    }

    /// Parse the `w:edit` attribute value.
    pub fn from_edit_value(s: &str) -> Option<Self> {
        match s {
            "readOnly" => Some(Self::ReadOnly),
            "comments" => Some(Self::Comments),
            "trackedChanges" => Some(Self::TrackChanges),
            "forms" => Some(Self::Forms),
            _ => None,
        }
    }
}

/// A capability a user can hold on a protected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Read,
    Edit,
    Delete,
    Format,
    Print,
    Share,
    Comment,
}

/// Edit restrictions derived from the protection kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRestrictions {
    pub allow_editing: bool,
    pub allow_deletion: bool,
    pub allow_insertion: bool,
    pub allow_formatting: bool,
    pub allow_printing: bool,
}

impl Default for EditRestrictions {
    fn default() -> Self {
        Self {
            allow_editing: true,
            allow_deletion: true,
            allow_insertion: true,
            allow_formatting: true,
            allow_printing: true,
        }
    }
}

/// Salted SHA-512 password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl PasswordHash {
    /// Hash a password with a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = vec![0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        let hash = Self::digest(&salt, password);
        Self { salt, hash }
    }

    /// Reconstruct a hash from its base64-encoded salt and hash values.
    pub fn from_base64(salt: &str, hash: &str) -> Result<Self> {
        let salt = BASE64
            .decode(salt)
            .map_err(|e| DocxError::InvalidFormat(format!("invalid protection salt: {}", e)))?;
        let hash = BASE64
            .decode(hash)
            .map_err(|e| DocxError::InvalidFormat(format!("invalid protection hash: {}", e)))?;
        Ok(Self { salt, hash })
    }

    /// Check a candidate password against the stored hash.
    pub fn verify(&self, password: &str) -> bool {
        Self::digest(&self.salt, password) == self.hash
    }

    /// Base64-encoded salt, as written to settings.xml.
    pub fn salt_base64(&self) -> String {
        BASE64.encode(&self.salt)
    }

    /// Base64-encoded hash, as written to settings.xml.
    pub fn hash_base64(&self) -> String {
        BASE64.encode(&self.hash)
    }

    fn digest(salt: &[u8], password: &str) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().to_vec()
    }
}

/// The kind of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// A watermark attached to the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub id: String,
    pub name: String,
    pub kind: WatermarkKind,
    pub text: String,
    pub font: String,
    /// Font size in points
    pub size: u32,
    /// Hex RGB color
    pub color: String,
    pub opacity: f32,
    /// Rotation in degrees; negative values slope upward
    pub rotation: f32,
}

/// Declarative encryption settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSettings {
    pub enabled: bool,
    pub algorithm: EncryptionAlgorithm,
    pub key_size: u32,
    pub encrypt_content: bool,
    pub encrypt_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    Aes128,
    Aes256,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            algorithm: EncryptionAlgorithm::Aes256,
            key_size: 256,
            encrypt_content: true,
            encrypt_metadata: false,
        }
    }
}

/// Digital signature metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureSettings {
    pub enabled: bool,
    pub signer: Option<String>,
    pub reason: Option<String>,
    pub signed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The protection aggregate of a document.
#[derive(Debug, Clone, Default)]
pub struct Protection {
    enabled: bool,
    kind: ProtectionKind,
    password: Option<PasswordHash>,
    restrictions: EditRestrictions,
    permissions: HashMap<String, HashSet<Capability>>,
    watermarks: Vec<Watermark>,
    pub encryption: EncryptionSettings,
    pub signature: SignatureSettings,
}

impl Protection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether protection is currently enabled.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The active protection kind; `None` when unprotected.
    #[inline]
    pub fn kind(&self) -> ProtectionKind {
        self.kind
    }

    /// The stored password hash, if a password was set.
    #[inline]
    pub fn password_hash(&self) -> Option<&PasswordHash> {
        self.password.as_ref()
    }

    /// The active edit restrictions.
    #[inline]
    pub fn restrictions(&self) -> &EditRestrictions {
        &self.restrictions
    }

    /// Enable protection of the given kind with a password.
    ///
    /// Stores a salted hash of the password and applies the kind's edit
    /// restrictions. `ProtectionKind::None` is not a valid target state.
    pub fn enable(&mut self, kind: ProtectionKind, password: &str) -> Result<()> {
        if kind == ProtectionKind::None {
            return Err(DocxError::InvalidFormat(
                "cannot enable protection of kind None".to_string(),
            ));
        }

        self.enabled = true;
        self.kind = kind;
        if !password.is_empty() {
            self.password = Some(PasswordHash::new(password));
        }

        self.restrictions = match kind {
            ProtectionKind::ReadOnly => EditRestrictions {
                allow_editing: false,
                allow_deletion: false,
                allow_insertion: false,
                allow_formatting: false,
                allow_printing: true,
            },
            ProtectionKind::Comments => EditRestrictions {
                allow_editing: false,
                allow_deletion: false,
                allow_insertion: false,
                allow_formatting: true,
                allow_printing: true,
            },
            ProtectionKind::TrackChanges => EditRestrictions {
                allow_editing: false,
                ..Default::default()
            },
            ProtectionKind::Forms => EditRestrictions {
                allow_editing: false,
                allow_formatting: false,
                ..Default::default()
            },
            ProtectionKind::None => unreachable!(),
        };

        Ok(())
    }

    /// Disable protection.
    ///
    /// The stored password must match; on mismatch the call fails with
    /// [`DocxError::WrongPassword`] and the protection state is unchanged.
    /// On success the state resets to `Unprotected` and all restrictions are
    /// cleared.
    pub fn disable(&mut self, password: &str) -> Result<()> {
        if !self.enabled {
            return Err(DocxError::InvalidFormat(
                "document protection is not enabled".to_string(),
            ));
        }

        if let Some(stored) = &self.password
            && !stored.verify(password)
        {
            return Err(DocxError::WrongPassword);
        }

        self.enabled = false;
        self.kind = ProtectionKind::None;
        self.password = None;
        self.restrictions = EditRestrictions::default();

        Ok(())
    }

    /// Check whether a user holds a capability.
    ///
    /// Returns `true` unconditionally while protection is disabled. When
    /// enabled, returns the stored grant for `(user, capability)`, defaulting
    /// to `false` for unknown users.
    pub fn check_permission(&self, user_id: &str, capability: Capability) -> bool {
        if !self.enabled {
            return true;
        }

        self.permissions
            .get(user_id)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// Grant a user a set of capabilities.
    pub fn add_user_permission(&mut self, user_id: &str, capabilities: &[Capability]) {
        self.permissions
            .entry(user_id.to_string())
            .or_default()
            .extend(capabilities.iter().copied());
    }

    /// Add a text watermark with the defaults used by Word.
    pub fn add_watermark(&mut self, name: &str, text: &str) -> &mut Watermark {
        let watermark = Watermark {
            id: format!("watermark_{}", self.watermarks.len() + 1),
            name: name.to_string(),
            kind: WatermarkKind::Text,
            text: text.to_string(),
            font: "Arial".to_string(),
            size: 48,
            color: "808080".to_string(),
            opacity: 0.5,
            rotation: -45.0,
        };
        self.watermarks.push(watermark);
        self.watermarks.last_mut().unwrap()
    }

    /// The ordered watermark sequence.
    pub fn watermarks(&self) -> &[Watermark] {
        &self.watermarks
    }

    /// Whether content edits are currently allowed.
    pub fn allows_edit(&self) -> bool {
        !self.enabled || self.restrictions.allow_editing
    }

    /// Whether adding comments is currently allowed.
    pub fn allows_comments(&self) -> bool {
        !self.enabled || matches!(self.kind, ProtectionKind::Comments | ProtectionKind::TrackChanges)
    }

    /// Restore protection state parsed from settings.xml.
    pub(crate) fn restore(&mut self, kind: ProtectionKind, password: Option<PasswordHash>) {
        self.enabled = kind != ProtectionKind::None;
        self.kind = kind;
        self.password = password;
        if self.enabled {
            // Re-derive restrictions; ignore the only possible error (kind != None)
            let hash = self.password.take();
            let _ = self.enable(kind, "");
            self.password = hash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_open_when_disabled() {
        let protection = Protection::new();
        assert!(protection.check_permission("anyone", Capability::Edit));
        assert!(protection.check_permission("anyone", Capability::Delete));
    }

    #[test]
    fn test_enable_disable_cycle() {
        let mut protection = Protection::new();
        protection.enable(ProtectionKind::ReadOnly, "pw").unwrap();

        assert!(protection.is_enabled());
        assert_eq!(protection.kind(), ProtectionKind::ReadOnly);
        assert!(!protection.restrictions().allow_editing);

        // Wrong password leaves the state untouched
        assert!(matches!(
            protection.disable("wrong"),
            Err(DocxError::WrongPassword)
        ));
        assert!(protection.is_enabled());

        protection.disable("pw").unwrap();
        assert!(!protection.is_enabled());
        assert_eq!(protection.kind(), ProtectionKind::None);
        assert!(protection.restrictions().allow_editing);
    }

    #[test]
    fn test_permission_lookup_when_enabled() {
        let mut protection = Protection::new();
        protection.enable(ProtectionKind::ReadOnly, "pw").unwrap();
        protection.add_user_permission("alice", &[Capability::Read, Capability::Edit]);

        assert!(protection.check_permission("alice", Capability::Edit));
        assert!(!protection.check_permission("alice", Capability::Delete));
        assert!(!protection.check_permission("bob", Capability::Read));
    }

    #[test]
    fn test_enable_none_rejected() {
        let mut protection = Protection::new();
        assert!(protection.enable(ProtectionKind::None, "pw").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = PasswordHash::new("secret");
        assert!(hash.verify("secret"));
        assert!(!hash.verify("other"));

        let restored =
            PasswordHash::from_base64(&hash.salt_base64(), &hash.hash_base64()).unwrap();
        assert!(restored.verify("secret"));
    }

    #[test]
    fn test_watermarks_are_ordered_config() {
        let mut protection = Protection::new();
        protection.add_watermark("draft", "DRAFT");
        protection.add_watermark("confidential", "CONFIDENTIAL");

        let wms = protection.watermarks();
        assert_eq!(wms.len(), 2);
        assert_eq!(wms[0].id, "watermark_1");
        assert_eq!(wms[1].text, "CONFIDENTIAL");
        assert_eq!(wms[0].rotation, -45.0);
    }

    #[test]
    fn test_comments_allowed_under_comments_protection() {
        let mut protection = Protection::new();
        protection.enable(ProtectionKind::Comments, "pw").unwrap();
        assert!(!protection.allows_edit());
        assert!(protection.allows_comments());

        let mut readonly = Protection::new();
        readonly.enable(ProtectionKind::ReadOnly, "pw").unwrap();
        assert!(!readonly.allows_comments());
    }
}
