//! check-config command - validate settings and show what they resolve to

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use dirbind_auth::{AttributeEnricher, LdapAuthenticator};
use serde::Serialize;

#[derive(Serialize)]
struct ConfigSummary {
    server_url: Option<String>,
    start_tls: bool,
    base_dn: String,
    resolver: String,
    naming_attribute: String,
    search_scope: String,
    restrict: Option<String>,
    returned_id: String,
    proxy_dn: Option<String>,
    attributes: Vec<String>,
    result_filter: String,
}

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let ldap = &ctx.config.ldap;
    let attributes = ctx.config.effective_attributes();

    ldap.validate().context("Invalid [ldap] configuration")?;
    attributes
        .validate()
        .context("Invalid [attributes] configuration")?;

    // Construction negotiates STARTTLS when requested, so a refusing
    // server fails here rather than on the first login
    if ldap.server_url.is_some() {
        ctx.debug("Building authenticator");
        LdapAuthenticator::from_config(ldap)
            .await
            .context("Cannot set up the authenticator")?;
        AttributeEnricher::from_config(&attributes)
            .await
            .context("Cannot set up attribute lookups")?;
    }

    let summary = ConfigSummary {
        server_url: ldap.server_url.clone(),
        start_tls: ldap.start_tls,
        base_dn: ldap.base()?.to_string(),
        resolver: format!("{:?}", ldap.resolver_kind()?).to_lowercase(),
        naming_attribute: ldap.naming_attribute.clone(),
        search_scope: format!("{:?}", ldap.scope()?).to_lowercase(),
        restrict: ldap.restrict.clone(),
        returned_id: format!("{:?}", ldap.return_style()?),
        proxy_dn: ldap.proxy()?.map(|(dn, _)| dn.to_string()),
        attributes: attributes
            .selection()
            .names()
            .map(|names| names.to_vec())
            .unwrap_or_else(|| vec!["*".to_string()]),
        result_filter: attributes.filter.clone(),
    };

    if ctx.is_json() {
        return ctx.report(&summary);
    }

    ctx.info(&format!("{}", "Configuration is valid".green().bold()));
    ctx.info("");
    let rows = [
        ("server_url", summary.server_url.unwrap_or_else(|| "(not set)".to_string())),
        ("start_tls", summary.start_tls.to_string()),
        ("base_dn", summary.base_dn),
        ("resolver", summary.resolver),
        ("naming_attribute", summary.naming_attribute),
        ("search_scope", summary.search_scope),
        ("restrict", summary.restrict.unwrap_or_else(|| "(none)".to_string())),
        ("returned_id", summary.returned_id),
        ("proxy_dn", summary.proxy_dn.unwrap_or_else(|| "(anonymous)".to_string())),
        ("attributes", summary.attributes.join(",")),
        ("result_filter", summary.result_filter),
    ];
    for (key, value) in rows {
        ctx.info(&format!("  {}: {}", key.cyan(), value));
    }

    Ok(())
}
