//! Offline keyword extraction.
//!
//! Deterministic and network-free. Understands French and English phrasing,
//! digits and number words, and multi-cloud phrases such as
//! "2 serveurs sur AWS et 3 serveurs sur GCP".

use async_trait::async_trait;
use stratus_model::{fold, CloudProvider, DatabaseEngine, RawInfrastructure, RawProviderSpec};
use tracing::debug;

use crate::error::ExtractResult;
use crate::extractor::Extractor;

const PROVIDER_WORDS: &[(&str, CloudProvider)] = &[
    ("aws", CloudProvider::Aws),
    ("amazon", CloudProvider::Aws),
    ("azure", CloudProvider::Azure),
    ("gcp", CloudProvider::Gcp),
    ("google", CloudProvider::Gcp),
    ("openstack", CloudProvider::OpenStack),
];

const SERVER_NOUNS: &[&[&str]] = &[
    &["serveur"],
    &["serveurs"],
    &["server"],
    &["servers"],
    &["vm"],
    &["vms"],
    &["machine"],
    &["machines"],
    &["ec2"],
];

const DATABASE_NOUNS: &[&[&str]] = &[
    &["base", "de", "donnees"],
    &["bases", "de", "donnees"],
    &["bdd"],
    &["database"],
    &["databases"],
    &["db"],
    &["dbs"],
];

const LOAD_BALANCER_NOUNS: &[&[&str]] = &[
    &["load", "balancer"],
    &["load", "balancers"],
    &["loadbalancer"],
    &["loadbalancers"],
    &["lb"],
    &["alb"],
    &["elb"],
    &["repartiteur", "de", "charge"],
    &["repartiteurs", "de", "charge"],
    &["equilibreur", "de", "charge"],
    &["equilibreurs", "de", "charge"],
];

const NETWORK_NOUNS: &[&[&str]] = &[
    &["reseau"],
    &["reseaux"],
    &["network"],
    &["networks"],
    &["vpc"],
    &["vnet"],
];

const SECURITY_GROUP_NOUNS: &[&[&str]] = &[
    &["groupe", "de", "securite"],
    &["groupes", "de", "securite"],
    &["security", "group"],
    &["security", "groups"],
    &["firewall"],
    &["firewalls"],
    &["pare", "feu"],
];

const CLAUSE_JOINERS: &[&str] = &["et", "and", "puis", "plus"];

/// Rule-based extractor used when no LLM is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`Extractor::extract`].
    pub fn parse(&self, description: &str) -> RawInfrastructure {
        let folded = fold(description);
        let groups = group_by_provider(&folded);

        let providers: Vec<RawProviderSpec> = if groups.is_empty() {
            vec![Self::analyze(CloudProvider::Aws, &tokenize(&folded))]
        } else {
            groups
                .iter()
                .map(|(provider, tokens)| Self::analyze(*provider, tokens))
                .collect()
        };

        debug!("Keyword extraction produced {} provider entr(ies)", providers.len());
        RawInfrastructure::new(providers)
    }

    fn analyze(provider: CloudProvider, tokens: &[String]) -> RawProviderSpec {
        let mut servers = count_mentions(tokens, SERVER_NOUNS, |t, at, len| !is_database_server(t, at, len));
        let explicit_databases = count_mentions(tokens, DATABASE_NOUNS, |_, _, _| true);
        let engine = tokens.iter().find_map(|t| DatabaseEngine::from_str(t));
        let databases = match (explicit_databases, engine) {
            (None, Some(_)) => Some(1),
            (count, _) => count,
        };
        let load_balancers = count_mentions(tokens, LOAD_BALANCER_NOUNS, |_, _, _| true);

        if servers.is_none() && databases.is_none() && load_balancers.is_none() {
            servers = Some(1);
        }

        let mut spec = RawProviderSpec::new(provider.as_str())
            .with_servers(servers.unwrap_or(0))
            .with_databases(databases.unwrap_or(0))
            .with_load_balancers(load_balancers.unwrap_or(0));
        if let Some(n) = count_mentions(tokens, NETWORK_NOUNS, |_, _, _| true) {
            spec = spec.with_networks(n);
        }
        if let Some(n) = count_mentions(tokens, SECURITY_GROUP_NOUNS, |_, _, _| true) {
            spec = spec.with_security_groups(n);
        }
        if let Some(engine) = engine {
            spec = spec.with_database_type(engine.as_str());
        }
        spec
    }
}

#[async_trait]
impl Extractor for KeywordExtractor {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn extract(&self, description: &str) -> ExtractResult<RawInfrastructure> {
        Ok(self.parse(description))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn provider_of(token: &str) -> Option<CloudProvider> {
    PROVIDER_WORDS.iter().find(|(word, _)| *word == token).map(|(_, p)| *p)
}

/// Split a folded phrase into clauses and merge them per provider, in order of
/// first mention. Clauses naming no provider attach to the previous one; a
/// leading one attaches to the first provider found.
fn group_by_provider(folded: &str) -> Vec<(CloudProvider, Vec<String>)> {
    let mut groups: Vec<(CloudProvider, Vec<String>)> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut current: Option<usize> = None;

    for clause in clauses(folded) {
        let named = clause.iter().find_map(|t| provider_of(t));
        let target = match named {
            Some(provider) => match groups.iter().position(|(p, _)| *p == provider) {
                Some(idx) => Some(idx),
                None => {
                    groups.push((provider, std::mem::take(&mut pending)));
                    Some(groups.len() - 1)
                }
            },
            None => current,
        };
        match target {
            Some(idx) => {
                groups[idx].1.extend(clause);
                current = Some(idx);
            }
            None => pending.extend(clause),
        }
    }
    groups
}

fn clauses(folded: &str) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for piece in folded.split(|c| matches!(c, ',' | ';' | '+' | '\n')) {
        let mut clause = Vec::new();
        for token in tokenize(piece) {
            if CLAUSE_JOINERS.contains(&token.as_str()) {
                if !clause.is_empty() {
                    out.push(std::mem::take(&mut clause));
                }
            } else {
                clause.push(token);
            }
        }
        if !clause.is_empty() {
            out.push(clause);
        }
    }
    out
}

fn number_word(token: &str) -> Option<i64> {
    if let Ok(n) = token.parse::<i64>() {
        return Some(n);
    }
    let n = match token {
        "un" | "une" | "one" | "a" | "an" | "single" => 1,
        "deux" | "two" | "couple" => 2,
        "trois" | "three" => 3,
        "quatre" | "four" => 4,
        "cinq" | "five" => 5,
        "six" => 6,
        "sept" | "seven" => 7,
        "huit" | "eight" => 8,
        "neuf" | "nine" => 9,
        "dix" | "ten" => 10,
        _ => return None,
    };
    Some(n)
}

/// Quantity written right before a noun, allowing one adjective in between
/// ("3 petits serveurs", "two web servers").
fn quantity_before(tokens: &[String], at: usize) -> Option<i64> {
    let first = at.checked_sub(1).and_then(|i| number_word(&tokens[i]));
    first.or_else(|| at.checked_sub(2).and_then(|i| number_word(&tokens[i])))
}

/// Total quantity across every mention of the nouns, `None` when never mentioned.
fn count_mentions(
    tokens: &[String],
    nouns: &[&[&str]],
    accept: impl Fn(&[String], usize, usize) -> bool,
) -> Option<i64> {
    let mut total = None;
    let mut i = 0;
    while i < tokens.len() {
        let hit = nouns.iter().find(|noun| {
            tokens.len() - i >= noun.len() && noun.iter().zip(&tokens[i..]).all(|(a, b)| a == b)
        });
        match hit {
            Some(noun) if accept(tokens, i, noun.len()) => {
                let n = quantity_before(tokens, i).unwrap_or(1);
                total = Some(total.unwrap_or(0) + n);
                i += noun.len();
            }
            _ => i += 1,
        }
    }
    total
}

/// "serveur de base de données", "database server" and "mysql server" name a
/// database, not a compute instance.
fn is_database_server(tokens: &[String], at: usize, len: usize) -> bool {
    let next = tokens.get(at + len).map(String::as_str);
    let after = tokens.get(at + len + 1).map(String::as_str);
    if next == Some("de") && matches!(after, Some("base" | "bases" | "donnees")) {
        return true;
    }
    at.checked_sub(1)
        .map(|i| tokens[i].as_str())
        .map_or(false, |prev| {
            matches!(prev, "database" | "db" | "bdd") || DatabaseEngine::from_str(prev).is_some()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(description: &str) -> RawProviderSpec {
        let raw = KeywordExtractor::new().parse(description);
        assert_eq!(raw.providers.len(), 1, "{:?}", raw);
        raw.providers.into_iter().next().unwrap()
    }

    #[test]
    fn test_single_aws_server() {
        let spec = only("Je veux un serveur AWS");
        assert_eq!(spec.provider.as_deref(), Some("aws"));
        assert_eq!(spec.servers, Some(1));
        assert_eq!(spec.databases, Some(0));
        assert_eq!(spec.load_balancers, Some(0));
    }

    #[test]
    fn test_gcp_servers_with_mysql() {
        let spec = only("Je veux 2 serveurs GCP avec MySQL");
        assert_eq!(spec.provider.as_deref(), Some("gcp"));
        assert_eq!(spec.servers, Some(2));
        assert_eq!(spec.databases, Some(1));
        assert_eq!(spec.database_type.as_deref(), Some("mysql"));
    }

    #[test]
    fn test_azure_server_without_number() {
        let spec = only("Serveur Azure");
        assert_eq!(spec.provider.as_deref(), Some("azure"));
        assert_eq!(spec.servers, Some(1));
    }

    #[test]
    fn test_database_only_defaults_to_aws() {
        let spec = only("Une base de données");
        assert_eq!(spec.provider.as_deref(), Some("aws"));
        assert_eq!(spec.servers, Some(0));
        assert_eq!(spec.databases, Some(1));
    }

    #[test]
    fn test_number_words_in_english() {
        let spec = only("I need three web servers and two databases on Azure");
        assert_eq!(spec.servers, Some(3));
        assert_eq!(spec.databases, Some(2));
    }

    #[test]
    fn test_load_balancer_and_engine() {
        let spec = only("deux serveurs derrière un load balancer sur OpenStack avec PostgreSQL");
        assert_eq!(spec.provider.as_deref(), Some("openstack"));
        assert_eq!(spec.servers, Some(2));
        assert_eq!(spec.load_balancers, Some(1));
        assert_eq!(spec.databases, Some(1));
        assert_eq!(spec.database_type.as_deref(), Some("postgresql"));
    }

    #[test]
    fn test_database_server_is_not_compute() {
        let spec = only("un serveur de base de données MariaDB");
        assert_eq!(spec.servers, Some(0));
        assert_eq!(spec.databases, Some(1));
    }

    #[test]
    fn test_network_counts_only_when_mentioned() {
        let spec = only("3 serveurs AWS");
        assert_eq!(spec.networks, None);
        assert_eq!(spec.security_groups, None);

        let spec = only("3 serveurs AWS dans 2 réseaux avec 2 groupes de sécurité");
        assert_eq!(spec.networks, Some(2));
        assert_eq!(spec.security_groups, Some(2));
    }

    #[test]
    fn test_nothing_mentioned_yields_one_server() {
        let spec = only("Bonjour");
        assert_eq!(spec.provider.as_deref(), Some("aws"));
        assert_eq!(spec.servers, Some(1));
    }

    #[test]
    fn test_multi_cloud_split() {
        let raw = KeywordExtractor::new().parse("2 serveurs sur AWS et 3 serveurs sur GCP avec une base PostgreSQL");
        assert_eq!(raw.providers.len(), 2);
        assert_eq!(raw.providers[0].provider.as_deref(), Some("aws"));
        assert_eq!(raw.providers[0].servers, Some(2));
        assert_eq!(raw.providers[0].databases, Some(0));
        assert_eq!(raw.providers[1].provider.as_deref(), Some("gcp"));
        assert_eq!(raw.providers[1].servers, Some(3));
        assert_eq!(raw.providers[1].databases, Some(1));
    }

    #[test]
    fn test_leading_clause_attaches_to_first_provider() {
        let raw = KeywordExtractor::new().parse("3 serveurs, une base MySQL sur Azure, 1 serveur OpenStack");
        assert_eq!(raw.providers.len(), 2);
        assert_eq!(raw.providers[0].provider.as_deref(), Some("azure"));
        assert_eq!(raw.providers[0].servers, Some(3));
        assert_eq!(raw.providers[0].databases, Some(1));
        assert_eq!(raw.providers[1].provider.as_deref(), Some("openstack"));
        assert_eq!(raw.providers[1].servers, Some(1));
    }

    #[test]
    fn test_repeated_provider_is_merged() {
        let raw = KeywordExtractor::new().parse("2 serveurs AWS, 1 serveur GCP, 1 serveur AWS");
        assert_eq!(raw.providers.len(), 2);
        assert_eq!(raw.providers[0].servers, Some(3));
    }

    #[tokio::test]
    async fn test_extract_is_deterministic() {
        let extractor = KeywordExtractor::new();
        let a = extractor.extract("deux VMs Azure").await.unwrap();
        let b = extractor.extract("deux VMs Azure").await.unwrap();
        assert_eq!(a, b);
    }
}
