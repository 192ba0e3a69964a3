#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use strum::EnumIter;
use strum::EnumVariantNames;

/// Keys persisted in the local key-value storage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum SessionKey {
    ApiBase,
    Token,
    RefreshToken,
    ExtensionKey,
    InstallId,
    TempToken,
}

impl SessionKey {
    /// Names older releases stored the same field under. Resolved after the
    /// canonical key, in order.
    pub fn legacy_aliases(&self) -> &'static [&'static str] {
        return match self {
            SessionKey::Token => &["a2svToken", "accessToken"],
            SessionKey::RefreshToken => &["a2svRefreshToken", "refresh_token"],
            SessionKey::ExtensionKey => &["a2svExtensionKey", "extension_key"],
            SessionKey::InstallId => &["a2svInstallId", "install_id"],
            SessionKey::ApiBase | SessionKey::TempToken => &[],
        };
    }

    /// Canonical name followed by every legacy alias.
    pub fn storage_names(&self) -> Vec<String> {
        let mut names = vec![self.to_string()];
        names.extend(self.legacy_aliases().iter().map(|e| return e.to_string()));
        return names;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub extension_key: Option<String>,
    pub install_id: Option<String>,
}

impl Session {
    pub fn with_tokens(access_token: &str, refresh_token: Option<&str>) -> Session {
        return Session {
            access_token: Some(access_token.to_string()),
            refresh_token: refresh_token.map(|e| return e.to_string()),
            ..Session::default()
        };
    }

    pub fn field(&self, key: SessionKey) -> Option<&String> {
        return match key {
            SessionKey::Token => self.access_token.as_ref(),
            SessionKey::RefreshToken => self.refresh_token.as_ref(),
            SessionKey::ExtensionKey => self.extension_key.as_ref(),
            SessionKey::InstallId => self.install_id.as_ref(),
            SessionKey::ApiBase | SessionKey::TempToken => None,
        };
    }

    pub fn set_field(&mut self, key: SessionKey, value: String) {
        match key {
            SessionKey::Token => self.access_token = Some(value),
            SessionKey::RefreshToken => self.refresh_token = Some(value),
            SessionKey::ExtensionKey => self.extension_key = Some(value),
            SessionKey::InstallId => self.install_id = Some(value),
            SessionKey::ApiBase | SessionKey::TempToken => {}
        }
    }

    pub fn identity(&self) -> Option<ExtensionIdentity> {
        let extension_key = self.extension_key.clone()?;
        return Some(ExtensionIdentity {
            extension_key,
            install_id: self.install_id.clone().unwrap_or_default(),
        });
    }

    pub fn is_authenticated(&self) -> bool {
        return self.access_token.is_some() && self.refresh_token.is_some();
    }
}

/// Backend-issued identity of one installation, independent of any user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionIdentity {
    pub extension_key: String,
    pub install_id: String,
}

impl From<ExtensionIdentity> for Session {
    fn from(identity: ExtensionIdentity) -> Session {
        return Session {
            extension_key: Some(identity.extension_key),
            install_id: Some(identity.install_id),
            ..Session::default()
        };
    }
}
