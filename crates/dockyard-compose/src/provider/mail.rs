//! Mail capture provider: Mailpit.

use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::ResourceKind;

const SMTP_PORT: u16 = 1025;

/// Provider for the `mail` kind.
#[derive(Debug)]
pub struct MailProvider {
    catalog: Catalog,
}

impl MailProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for MailProvider {
    fn default() -> Self {
        Self::new(Catalog::new().with("mailpit", VersionTable::new("latest", &["latest"])))
    }
}

impl Provider for MailProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Mail
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, _subtype: &str) -> bool {
        false
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        if request.subtype != "mailpit" {
            return Err(DockyardError::validation(
                "mail subtype",
                &request.subtype,
                "no recipe available",
            ));
        }
        Ok(
            SharedResourceEntry::new(request, format!("axllent/mailpit:{}", request.version))
                .port(SMTP_PORT),
        )
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        _credentials: &Credentials,
    ) -> Vec<(String, String)> {
        vec![
            ("MAIL_MAILER".into(), "smtp".into()),
            ("MAIL_HOST".into(), entry.host().into()),
            ("MAIL_PORT".into(), entry.port_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceRequest;

    #[test]
    fn mailpit_has_no_volume() {
        let provider = MailProvider::default();
        let resolved = provider
            .validate(&ResourceRequest::of(ResourceKind::Mail))
            .expect("valid");
        let entry = provider.materialize(&resolved).expect("materialize");
        assert_eq!(entry.name, "mailpit-latest");
        assert!(entry.volume.is_none());
        let env = provider.environment_for(&entry, &entry.credentials);
        assert_eq!(
            env,
            vec![
                ("MAIL_MAILER".to_owned(), "smtp".to_owned()),
                ("MAIL_HOST".to_owned(), "mailpit-latest".to_owned()),
                ("MAIL_PORT".to_owned(), "1025".to_owned()),
            ]
        );
    }
}
