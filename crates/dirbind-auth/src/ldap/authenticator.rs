//! LDAP Authenticator
//!
//! Verifies a claimed secret by binding to the directory as the DN resolved
//! for the claimed login. The bind is the only proof of valid credentials.

use crate::ldap::client::LdapSettings;
use crate::ldap::connector::{Connection, DirectoryConnector, Session};
use crate::ldap::resolver::{IdentityResolver, PatternResolver, SearchResolver};
use crate::ldap::types::{LdapAuthResult, ResolverConfig};
use dirbind_core::types::{IdentityClaim, RequestContext, ResolverKind, ReturnStyle, VerifiedIdentity};
use dirbind_core::{LdapConfig, Result};
use tracing::{debug, info};

/// LDAP Authenticator
pub struct LdapAuthenticator {
    connector: DirectoryConnector,
    resolver: Box<dyn IdentityResolver>,
    return_style: ReturnStyle,
}

impl LdapAuthenticator {
    /// Build from configuration, connecting to `server_url`
    pub async fn from_config(config: &LdapConfig) -> Result<Self> {
        let connection = config.server_url.clone().map(Connection::Url);
        Self::with_connection(connection, config).await
    }

    /// Build with an explicit connection descriptor
    pub async fn with_connection(
        connection: Option<Connection>,
        config: &LdapConfig,
    ) -> Result<Self> {
        let resolver_config = ResolverConfig::from_config(config)?;
        let resolver: Box<dyn IdentityResolver> = match config.resolver_kind()? {
            ResolverKind::Pattern => Box::new(PatternResolver::new(resolver_config)),
            ResolverKind::Search => Box::new(SearchResolver::new(resolver_config)),
        };

        Self::with_resolver(connection, resolver, config).await
    }

    /// Build around a caller-supplied resolver
    pub async fn with_resolver(
        connection: Option<Connection>,
        resolver: Box<dyn IdentityResolver>,
        config: &LdapConfig,
    ) -> Result<Self> {
        config.validate()?;
        let return_style = config.return_style()?;

        let settings = LdapSettings::from_ldap_config(config);
        let connector = DirectoryConnector::make_connection(connection, &settings).await?;

        info!(
            "LDAP authenticator ready (resolver: {}, returned id: {:?})",
            config.resolver, return_style
        );

        Ok(Self {
            connector,
            resolver,
            return_style,
        })
    }

    pub fn return_style(&self) -> ReturnStyle {
        self.return_style
    }

    pub fn connector(&self) -> &DirectoryConnector {
        &self.connector
    }

    /// Verify a claim, keeping the failure kind.
    ///
    /// A claim without a login or secret is declined before the directory
    /// is contacted.
    pub async fn verify(&self, ctx: &RequestContext, claim: &IdentityClaim) -> LdapAuthResult {
        let (login, secret) = match claim.login().and_then(|login| Ok((login, claim.secret()?))) {
            Ok(credentials) => credentials,
            Err(e) => return LdapAuthResult::Declined(e),
        };

        let mut session = match self.connector.session().await {
            Ok(session) => session,
            Err(e) => return LdapAuthResult::ResolutionFailed(e),
        };

        let result = self.verify_in_session(ctx, &mut session, claim, login, secret).await;
        session.close().await;
        result
    }

    async fn verify_in_session(
        &self,
        ctx: &RequestContext,
        session: &mut Session,
        claim: &IdentityClaim,
        login: &str,
        secret: &str,
    ) -> LdapAuthResult {
        let dn = match self.resolver.resolve_dn(session.handle(), claim).await {
            Ok(dn) => dn,
            Err(e) => return LdapAuthResult::ResolutionFailed(e),
        };

        debug!("[{}] Resolved login {} to {}", ctx.request_id, login, dn);

        match session.handle().simple_bind(dn.as_str(), secret).await {
            Ok(()) => LdapAuthResult::Success(VerifiedIdentity::new(login, dn, self.return_style)),
            Err(e) => LdapAuthResult::InvalidCredentials(e),
        }
    }

    /// Authenticate a claim.
    ///
    /// Returns the DN or the login, depending on the return style. With the
    /// bare-login style the DN marker is appended to the claim's userdata.
    /// Every failure kind collapses to `None`.
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        claim: &mut IdentityClaim,
    ) -> Option<String> {
        match self.verify(ctx, claim).await {
            LdapAuthResult::Success(verified) => {
                if let Some(marker) = verified.marker() {
                    claim.append_userdata(&marker);
                }
                info!("[{}] LDAP authentication succeeded for {}", ctx.request_id, verified.dn);
                Some(verified.userid)
            }
            LdapAuthResult::Declined(e) => {
                debug!("[{}] LDAP authentication declined: {}", ctx.request_id, e);
                None
            }
            failure => {
                if let Some(e) = failure.error() {
                    info!(
                        "[{}] LDAP authentication failed ({}): {}",
                        ctx.request_id,
                        failure.kind(),
                        e
                    );
                }
                None
            }
        }
    }
}
