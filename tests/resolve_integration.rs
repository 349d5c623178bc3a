//! End-to-end resolution of layered YAML profiles

use async_trait::async_trait;
use confresolve::errors::{Error, ErrorCategory, Result};
use confresolve::secrets::{Decrypter, DecrypterFactory};
use confresolve::{loader, resolve, tree, Env, Resolver, Tree};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Returns the `v:` segment of the descriptor unchanged
#[derive(Debug)]
struct NoopDecrypter {
    descriptor: String,
}

#[async_trait]
impl Decrypter for NoopDecrypter {
    async fn decrypt(&mut self) -> Result<String> {
        self.descriptor
            .split('!')
            .find_map(|segment| segment.strip_prefix("v:"))
            .map(str::to_string)
            .ok_or_else(|| Error::syntax(self.descriptor.as_str(), "missing 'v' key"))
    }
}

fn noop_factory() -> DecrypterFactory {
    Arc::new(|descriptor: &str| {
        Box::new(NoopDecrypter { descriptor: descriptor.to_string() }) as Box<dyn Decrypter>
    })
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load(names: &[&str]) -> Vec<Tree> {
    let paths: Vec<PathBuf> = names.iter().map(|name| fixture(name)).collect();
    loader::load_files(&paths).unwrap()
}

fn env() -> Env {
    Env::from([
        ("SPINNAKER_AWS_ENABLED".to_string(), "true".to_string()),
        ("DEFAULT_DNS_NAME".to_string(), "mockdns.com".to_string()),
        ("REDIS_HOST".to_string(), "redishost.com".to_string()),
    ])
}

fn get<'a>(resolved: &'a Tree, path: &str) -> &'a Value {
    tree::lookup(resolved, path).unwrap_or_else(|| panic!("missing {path}"))
}

#[tokio::test]
async fn test_layered_profile() {
    let trees = load(&["spinnaker.yml", "spinnaker-armory.yml", "spinnaker-local.yml"]);

    let resolved =
        Resolver::new().register("noop", noop_factory()).resolve(&trees, &env()).await.unwrap();

    // simple replacement from the environment
    assert_eq!(get(&resolved, "services.rosco.host"), &json!("mockdns.com"));
    // defaults and env values are strings
    assert_eq!(get(&resolved, "providers.google.enabled"), &json!("false"));
    assert_eq!(get(&resolved, "providers.aws.enabled"), &json!("true"));
    assert_eq!(get(&resolved, "providers.aws.defaultRegion"), &json!("us-east-1"));
    // transitive references inside a url
    assert_eq!(get(&resolved, "services.fiat.baseUrl"), &json!("http://mockdns.com:7003"));
    assert_eq!(get(&resolved, "services.redis.connection"), &json!("redis://redishost.com:6379"));
    // later documents win, and placeholders see the merged value
    assert_eq!(get(&resolved, "services.rosco.baseUrl"), &json!("http://mockdns.com:8088"));
    assert_eq!(get(&resolved, "services.fiat.enabled"), &json!(true));
    assert_eq!(get(&resolved, "global.spinnaker.timezone"), &json!("Europe/Berlin"));
    assert_eq!(get(&resolved, "global.spinnaker.architecture"), &json!("k8s"));
    // empty default
    assert_eq!(get(&resolved, "providers.google.primaryCredentials.project"), &json!(""));
    // secrets, including inside sequences
    assert_eq!(get(&resolved, "services.echo.slackApiKey"), &json!("mynotsosecretstring"));
    assert_eq!(
        get(&resolved, "services.terraformer.profiles.0.variables.0.options.sshKeyContents"),
        &json!("mynotsosecretsshstring")
    );
}

#[tokio::test]
async fn test_collections() {
    let trees = load(&["collections.yml"]);
    let resolved = resolve(&trees, &env()).await.unwrap();

    let multi = json!([
        {"multi_one_one": "one-one", "multi_one_two": "one-two"},
        {"multi_two_one": "two-one", "multi_two_two": "two-two"}
    ]);
    assert_eq!(resolved.get("baseUrl"), Some(&json!("http://localhost:8080")));
    assert_eq!(resolved.get("multiValCol"), Some(&multi));
    assert_eq!(resolved.get("multiValColAgain"), Some(&multi));
    assert_eq!(resolved.get("col"), Some(&json!(["one", "two", "three"])));
}

#[tokio::test]
async fn test_secret_without_registered_backend_fails_closed() {
    let trees = load(&["spinnaker.yml", "spinnaker-armory.yml"]);
    let err = resolve(&trees, &env()).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("'noop'"));
}

#[tokio::test]
async fn test_unresolved_placeholder_fails() {
    let document = loader::parse_yaml("fiat:\n  url: http://${FIAT_HOST}:7003\n").unwrap();
    let err = resolve(&[document], &Env::new()).await.unwrap_err();
    match err {
        Error::Unresolved { path } => assert_eq!(path, "FIAT_HOST"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cyclic_reference_fails() {
    let document = loader::parse_yaml("a: ${b}\nb: ${c}\nc: ${a}\n").unwrap();
    let err = resolve(&[document], &Env::new()).await.unwrap_err();
    assert!(matches!(err, Error::CyclicReference { .. }));
}

#[tokio::test]
async fn test_vault_settings_come_from_resolved_tree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/echo"))
        .and(header("X-Vault-Token", "s.session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"key": "shh"}})))
        .expect(1)
        .mount(&server)
        .await;

    let defaults = loader::parse_yaml(
        r#"
secrets:
  vault:
    enabled: ${VAULT_ENABLED:false}
    url: ${VAULT_ADDR:http://localhost:8200}
    authMethod: TOKEN
    token: ${VAULT_SESSION_TOKEN}
services:
  echo:
    apiKey: encrypted:vault!e:secret!n:echo!k:key
"#,
    )
    .unwrap();
    let env = Env::from([
        ("VAULT_ENABLED".to_string(), "true".to_string()),
        ("VAULT_ADDR".to_string(), server.uri()),
        ("VAULT_SESSION_TOKEN".to_string(), "s.session".to_string()),
    ]);

    let resolved = resolve(&[defaults], &env).await.unwrap();
    assert_eq!(get(&resolved, "services.echo.apiKey"), &json!("shh"));
    assert_eq!(get(&resolved, "secrets.vault.url"), &json!(server.uri()));
}

#[tokio::test]
async fn test_disabled_vault_fails_closed() {
    let document = loader::parse_yaml(
        r#"
secrets:
  vault:
    enabled: false
    url: https://vault.com
    authMethod: TOKEN
apiKey: encrypted:vault!e:secret!n:echo!k:key
"#,
    )
    .unwrap();

    let err = resolve(&[document], &Env::new()).await.unwrap_err();
    match &err {
        Error::Secret { location, source } => {
            assert_eq!(location, "apiKey");
            assert!(source.to_string().contains("vault secrets disabled"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
