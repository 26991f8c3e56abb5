//! demo command - run the pipeline against a built-in directory

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use dirbind_auth::{AttributeEnricher, Connection, LdapAuthenticator, MemoryDirectory};
use dirbind_core::config::AttributeList;
use dirbind_core::types::{Identity, IdentityClaim, RequestContext};
use dirbind_core::{AttributesConfig, LdapConfig};
use serde::Serialize;

const BASE_DN: &str = "ou=people,dc=example,dc=org";

#[derive(Serialize)]
struct Step {
    resolver: &'static str,
    returned_id: &'static str,
    login: &'static str,
    secret: &'static str,
    result: Option<String>,
    userdata: String,
}

fn sample_directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();
    directory.add_entry(BASE_DN, None, &[("ou", vec!["people"])]);
    directory.add_entry(
        "uid=carla,ou=people,dc=example,dc=org",
        Some("hello"),
        &[
            ("uid", vec!["carla"]),
            ("cn", vec!["Carla Paola"]),
            ("mail", vec!["carla@example.org"]),
            ("objectClass", vec!["person"]),
        ],
    );
    directory.add_entry(
        "uid=dario,ou=staff,ou=people,dc=example,dc=org",
        Some("secret"),
        &[
            ("uid", vec!["dario"]),
            ("cn", vec!["Dario Rossi"]),
            ("objectClass", vec!["person"]),
        ],
    );
    directory
}

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let directory = sample_directory();
    ctx.debug(&format!("Demo directory holds {} entries", directory.len()));

    let runs = [
        ("pattern", "dn", "carla", "hello"),
        ("pattern", "dn", "carla", "wrong"),
        ("pattern", "login", "carla", "hello"),
        ("pattern", "dn", "dario", "secret"),
        ("search", "dn", "dario", "secret"),
        ("search", "login", "*", "secret"),
    ];

    let request = RequestContext::new();
    let mut steps = Vec::new();
    let mut last_claim = None;

    for (resolver, returned_id, login, secret) in runs {
        let config = LdapConfig {
            base_dn: Some(BASE_DN.to_string()),
            resolver: resolver.to_string(),
            returned_id: returned_id.to_string(),
            ..Default::default()
        };
        let authenticator = LdapAuthenticator::with_connection(
            Some(Connection::factory(directory.clone())),
            &config,
        )
        .await
        .context("Demo configuration rejected")?;

        let mut claim = IdentityClaim::new(login, secret);
        let result = authenticator.authenticate(&request, &mut claim).await;

        if returned_id == "login" {
            if let Some(userid) = &result {
                last_claim = Some((userid.clone(), claim.clone()));
            }
        }

        steps.push(Step {
            resolver,
            returned_id,
            login,
            secret,
            result,
            userdata: claim.userdata().to_string(),
        });
    }

    let mut enriched = None;
    if let Some((userid, claim)) = last_claim {
        let enricher = AttributeEnricher::with_connection(
            Some(Connection::factory(directory.clone())),
            &AttributesConfig {
                attributes: Some(AttributeList::Csv("cn,mail".to_string())),
                ..Default::default()
            },
        )
        .await?;

        let mut identity = Identity::from_claim(userid, &claim);
        enricher.enrich(&request, &mut identity).await?;
        enriched = Some(identity);
    }

    if ctx.is_json() {
        let output = serde_json::json!({
            "steps": steps,
            "enriched": enriched.as_ref().map(|identity| serde_json::json!({
                "userid": identity.userid,
                "attributes": identity.attributes,
            })),
        });
        return ctx.report(&output);
    }

    for step in &steps {
        let outcome = match &step.result {
            Some(userid) => userid.green().to_string(),
            None => "not authenticated".red().to_string(),
        };
        ctx.info(&format!(
            "{:<8} {:<6} {}/{} -> {}",
            step.resolver, step.returned_id, step.login, step.secret, outcome
        ));
        if !step.userdata.is_empty() {
            ctx.info(&format!("         userdata: {}", step.userdata.dimmed()));
        }
    }

    if let Some(identity) = enriched {
        ctx.info("");
        ctx.info(&format!("{} {}", "Enriched:".bold(), identity.userid));
        let mut names: Vec<_> = identity.attributes.keys().collect();
        names.sort();
        for name in names {
            if let Some(value) = identity.get_attribute(name) {
                ctx.info(&format!("  {}: {}", name.cyan(), value));
            }
        }
    }

    Ok(())
}
