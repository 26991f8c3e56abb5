//! Attribute enrichment
//!
//! Loads directory attributes for an already authenticated identity. The DN
//! comes from the stashed marker when there is one, otherwise from the
//! identity's userid.

use crate::ldap::client::LdapSettings;
use crate::ldap::connector::{Connection, DirectoryConnector, Session};
use crate::ldap::types::{DirectoryEntry, ProxyCredentials};
use dirbind_core::types::{
    AttributeSelection, DistinguishedName, Identity, RequestContext, SearchScope, VerifiedIdentity,
};
use dirbind_core::{AttributesConfig, Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct AttributeEnricher {
    connector: DirectoryConnector,
    proxy: Option<ProxyCredentials>,
    attributes: AttributeSelection,
    filter: String,
}

impl AttributeEnricher {
    pub async fn from_config(config: &AttributesConfig) -> Result<Self> {
        let connection = config.server_url.clone().map(Connection::Url);
        Self::with_connection(connection, config).await
    }

    pub async fn with_connection(
        connection: Option<Connection>,
        config: &AttributesConfig,
    ) -> Result<Self> {
        config.validate()?;

        let settings = LdapSettings::from_attributes_config(config);
        let connector = DirectoryConnector::make_connection(connection, &settings).await?;

        Ok(Self {
            connector,
            proxy: ProxyCredentials::from_pair(config.proxy()?),
            attributes: config.selection(),
            filter: config.filter.clone(),
        })
    }

    /// Attributes fetched for each identity
    pub fn attributes(&self) -> &AttributeSelection {
        &self.attributes
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Fetch the configured attributes of the entry at `dn`
    pub async fn fetch(
        &self,
        ctx: &RequestContext,
        dn: &DistinguishedName,
    ) -> Result<HashMap<String, Vec<String>>> {
        if dn.as_str().is_empty() {
            return Err(Error::EntryNotFound(String::new()));
        }

        let mut session = self
            .connector
            .session()
            .await
            .map_err(|e| lookup_failed(ctx, dn, e))?;
        let result = self.lookup(ctx, &mut session, dn).await;
        session.close().await;

        let mut entries = result?;
        match entries.len() {
            1 => Ok(entries.remove(0).attrs),
            0 => Err(Error::EntryNotFound(dn.to_string())),
            count => Err(Error::AmbiguousEntry {
                filter: self.filter.clone(),
                count,
            }),
        }
    }

    async fn lookup(
        &self,
        ctx: &RequestContext,
        session: &mut Session,
        dn: &DistinguishedName,
    ) -> Result<Vec<DirectoryEntry>> {
        if let Some(proxy) = &self.proxy {
            proxy.bind(session.handle()).await?;
        }

        session
            .handle()
            .search(dn.as_str(), SearchScope::Base, &self.filter, &self.attributes)
            .await
            .map_err(|e| lookup_failed(ctx, dn, e))
    }

    /// Merge directory attributes into `identity`.
    ///
    /// Directory values overwrite attributes the identity already carries.
    pub async fn enrich(&self, ctx: &RequestContext, identity: &mut Identity) -> Result<()> {
        let dn = identity.record_identifier();
        debug!("[{}] Enriching identity {} from {}", ctx.request_id, identity.userid, dn);

        let attributes = self.fetch(ctx, &dn).await?;
        identity.merge_attributes(attributes);
        Ok(())
    }

    /// Enrich straight from a verified identity, without the string marker
    pub async fn enrich_verified(
        &self,
        ctx: &RequestContext,
        verified: &VerifiedIdentity,
    ) -> Result<Identity> {
        let mut identity = verified.clone().into_identity();
        self.enrich(ctx, &mut identity).await?;
        Ok(identity)
    }
}

fn lookup_failed(ctx: &RequestContext, dn: &DistinguishedName, e: Error) -> Error {
    warn!("[{}] Attribute lookup for {} failed: {}", ctx.request_id, dn, e);
    Error::EnrichmentFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::memory::MemoryDirectory;
    use dirbind_core::config::AttributeList;
    use dirbind_core::types::{DnMarker, ReturnStyle};

    const CARLA_DN: &str = "uid=carla,ou=people,dc=example,dc=org";

    fn directory() -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        directory.add_entry(
            "cn=Manager,dc=example,dc=org",
            Some("some password"),
            &[("cn", vec!["Manager"])],
        );
        directory.add_entry(
            CARLA_DN,
            Some("hello"),
            &[
                ("uid", vec!["carla"]),
                ("cn", vec!["Carla Paola"]),
                ("mail", vec!["carla@example.org"]),
                ("objectClass", vec!["person"]),
            ],
        );
        directory
    }

    fn config(attributes: &str) -> AttributesConfig {
        AttributesConfig {
            attributes: Some(AttributeList::Csv(attributes.to_string())),
            ..Default::default()
        }
    }

    async fn enricher(directory: &MemoryDirectory, config: &AttributesConfig) -> AttributeEnricher {
        AttributeEnricher::with_connection(Some(Connection::factory(directory.clone())), config)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_enrich_from_userid() {
        let directory = directory();
        let enricher = enricher(&directory, &config("cn, mail")).await;

        let mut identity = Identity::new(CARLA_DN);
        identity
            .attributes
            .insert("cn".to_string(), vec!["stale".to_string()]);

        enricher.enrich(&RequestContext::new(), &mut identity).await.unwrap();
        assert_eq!(identity.get_attribute("cn"), Some("Carla Paola"));
        assert_eq!(identity.get_attribute("mail"), Some("carla@example.org"));
        assert!(identity.get_attribute("uid").is_none());
    }

    #[tokio::test]
    async fn test_enrich_prefers_marker() {
        let directory = directory();
        let enricher = enricher(&directory, &AttributesConfig::default()).await;

        let mut identity = Identity::new("carla");
        identity.aux_data.insert(
            "userdata".to_string(),
            format!("prior;{}", DnMarker::encode(&CARLA_DN.into())),
        );

        enricher.enrich(&RequestContext::new(), &mut identity).await.unwrap();
        assert_eq!(identity.get_attribute("uid"), Some("carla"));
    }

    #[tokio::test]
    async fn test_enrich_verified() {
        let directory = directory();
        let enricher = enricher(&directory, &config("mail")).await;
        let verified = VerifiedIdentity::new("carla", CARLA_DN.into(), ReturnStyle::BareLogin);

        let identity = enricher
            .enrich_verified(&RequestContext::new(), &verified)
            .await
            .unwrap();
        assert_eq!(identity.userid, "carla");
        assert_eq!(identity.get_attribute("mail"), Some("carla@example.org"));
    }

    #[tokio::test]
    async fn test_filter_excludes_entry() {
        let directory = directory();
        let config = AttributesConfig {
            filter: "(objectClass=application)".to_string(),
            ..Default::default()
        };
        let enricher = enricher(&directory, &config).await;

        let err = enricher
            .fetch(&RequestContext::new(), &CARLA_DN.into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_entry_and_search_error_are_distinct() {
        let directory = directory();
        let enricher = enricher(&directory, &AttributesConfig::default()).await;
        let ctx = RequestContext::new();

        let mut identity = Identity::new("uid=nobody,ou=people,dc=example,dc=org");
        let err = enricher.enrich(&ctx, &mut identity).await.unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));

        let mut identity = Identity::new("");
        assert!(matches!(
            enricher.enrich(&ctx, &mut identity).await,
            Err(Error::EntryNotFound(_))
        ));

        directory.set_available(false);
        let mut identity = Identity::new(CARLA_DN);
        let err = enricher.enrich(&ctx, &mut identity).await.unwrap_err();
        assert!(matches!(err, Error::EnrichmentFailed(_)));
        assert!(identity.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_outage_while_opening_tls_session() {
        let directory = directory();
        let config = AttributesConfig {
            start_tls: true,
            ..config("cn")
        };
        let enricher = enricher(&directory, &config).await;
        let ctx = RequestContext::new();

        directory.set_available(false);
        let mut identity = Identity::new(CARLA_DN);
        let err = enricher.enrich(&ctx, &mut identity).await.unwrap_err();
        assert_eq!(err.code(), "EnrichmentFailed");
        assert!(identity.attributes.is_empty());

        directory.set_available(true);
        enricher.enrich(&ctx, &mut identity).await.unwrap();
        assert_eq!(identity.get_attribute("cn"), Some("Carla Paola"));
    }

    #[tokio::test]
    async fn test_proxy_bind() {
        let directory = directory();
        directory.set_anonymous_search(false);
        let ctx = RequestContext::new();

        let anonymous = enricher(&directory, &AttributesConfig::default()).await;
        assert!(matches!(
            anonymous.fetch(&ctx, &CARLA_DN.into()).await,
            Err(Error::EnrichmentFailed(_))
        ));

        let proxied = enricher(
            &directory,
            &AttributesConfig {
                bind_dn: Some("cn=Manager,dc=example,dc=org".to_string()),
                bind_password: Some("some password".to_string()),
                ..Default::default()
            },
        )
        .await;
        let attrs = proxied.fetch(&ctx, &CARLA_DN.into()).await.unwrap();
        assert_eq!(attrs.get("cn"), Some(&vec!["Carla Paola".to_string()]));
    }

    #[tokio::test]
    async fn test_invalid_result_filter() {
        let result = AttributeEnricher::with_connection(
            Some(Connection::factory(directory())),
            &AttributesConfig {
                filter: "objectClass=*".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(result.err().map(|e| e.is_configuration()).unwrap_or(false));
    }
}
