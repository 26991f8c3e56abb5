//! auth command - authenticate one login

use super::CommandContext;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use dirbind_auth::{AttributeEnricher, LdapAuthenticator};
use dirbind_core::types::{Identity, IdentityClaim, RequestContext};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

#[derive(Serialize)]
struct AuthResult {
    authenticated: bool,
    userid: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    userdata: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, Vec<String>>,
}

pub async fn execute(
    ctx: &CommandContext,
    login: &str,
    password: Option<String>,
    enrich: bool,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let authenticator = LdapAuthenticator::from_config(&ctx.config.ldap)
        .await
        .context("Invalid [ldap] configuration")?;

    let request = RequestContext::new();
    ctx.debug(&format!("Request id: {}", request.request_id));

    let mut claim = IdentityClaim::new(login, password);
    let userid = authenticator.authenticate(&request, &mut claim).await;

    let mut result = AuthResult {
        authenticated: userid.is_some(),
        userid: userid.clone(),
        userdata: claim.userdata().to_string(),
        attributes: BTreeMap::new(),
    };

    if let (Some(userid), true) = (userid, enrich) {
        let enricher = AttributeEnricher::from_config(&ctx.config.effective_attributes())
            .await
            .context("Invalid [attributes] configuration")?;

        let mut identity = Identity::from_claim(userid, &claim);
        enricher
            .enrich(&request, &mut identity)
            .await
            .context("Attribute lookup failed")?;
        result.attributes = identity.attributes.into_iter().collect();
    }

    print_result(ctx, &result)?;

    if !result.authenticated {
        bail!("Authentication failed for {}", login);
    }
    Ok(())
}

fn print_result(ctx: &CommandContext, result: &AuthResult) -> Result<()> {
    if ctx.is_json() {
        return ctx.report(result);
    }

    match &result.userid {
        Some(userid) => ctx.info(&format!("{} {}", "Authenticated:".green().bold(), userid)),
        None => ctx.info(&format!("{}", "Not authenticated".red().bold())),
    }
    if !result.userdata.is_empty() {
        ctx.info(&format!("  {}: {}", "userdata".cyan(), result.userdata));
    }
    for (name, values) in &result.attributes {
        ctx.info(&format!("  {}: {}", name.cyan(), values.join(", ")));
    }
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
