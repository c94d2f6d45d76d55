//! Ansible playbook generation.
//!
//! Every play hardens the operating system. Database and web server sections
//! are appended when the provider spec has databases or servers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use stratus_model::{DatabaseEngine, ProviderInfraSpec};

use crate::error::IacResult;
use crate::provider::renderer_for;

/// One Ansible task: a name, a single module invocation and optional modifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub name: String,
    #[serde(flatten)]
    pub module: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, module: &str, args: Value) -> Self {
        let mut invocation = BTreeMap::new();
        invocation.insert(module.to_string(), args);
        Self {
            name: name.into(),
            module: invocation,
            notify: None,
        }
    }

    pub fn notify(mut self, handler: impl Into<String>) -> Self {
        self.notify = Some(handler.into());
        self
    }
}

/// One play targeting a host group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    pub name: String,
    pub hosts: String,
    #[serde(rename = "become")]
    pub escalate: bool,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<Task>,
}

/// Accumulates one play per spec and renders them as a single YAML document.
#[derive(Debug, Clone, Default)]
pub struct PlaybookBuilder {
    plays: Vec<Play>,
}

impl PlaybookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spec(mut self, hosts: &str, spec: &ProviderInfraSpec) -> Self {
        self.plays.push(Self::play(hosts, spec));
        self
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    pub fn render(&self) -> IacResult<String> {
        let yaml = serde_yaml::to_string(&self.plays)?;
        Ok(format!("---\n{}", yaml.trim_start_matches("---\n")))
    }

    fn play(hosts: &str, spec: &ProviderInfraSpec) -> Play {
        let mut tasks = os_hardening();
        let mut handlers = vec![Task::new(
            "Restart ssh",
            "ansible.builtin.service",
            json!({ "name": "ssh", "state": "restarted" }),
        )];

        if spec.databases() > 0 {
            let engine = renderer_for(spec.provider()).effective_engine(spec.database_type());
            let (db_tasks, handler) = database_hardening(engine);
            tasks.extend(db_tasks);
            handlers.push(handler);
        }

        if spec.servers() > 0 {
            tasks.extend(web_hardening());
            handlers.push(Task::new(
                "Reload nginx",
                "ansible.builtin.service",
                json!({ "name": "nginx", "state": "reloaded" }),
            ));
        }

        Play {
            name: format!("Harden {} hosts", spec.provider().display_name()),
            hosts: hosts.to_string(),
            escalate: true,
            tasks,
            handlers,
        }
    }
}

fn os_hardening() -> Vec<Task> {
    vec![
        Task::new(
            "Update package cache and upgrade packages",
            "ansible.builtin.apt",
            json!({ "update_cache": true, "upgrade": "dist" }),
        ),
        Task::new(
            "Install intrusion prevention and firewall",
            "ansible.builtin.apt",
            json!({ "name": ["fail2ban", "ufw"], "state": "present" }),
        ),
        Task::new(
            "Enable fail2ban",
            "ansible.builtin.service",
            json!({ "name": "fail2ban", "state": "started", "enabled": true }),
        ),
        Task::new(
            "Allow SSH through the firewall",
            "community.general.ufw",
            json!({ "rule": "allow", "port": "22", "proto": "tcp" }),
        ),
        Task::new(
            "Allow HTTPS through the firewall",
            "community.general.ufw",
            json!({ "rule": "allow", "port": "443", "proto": "tcp" }),
        ),
        Task::new(
            "Enable the firewall and deny everything else",
            "community.general.ufw",
            json!({ "state": "enabled", "policy": "deny" }),
        ),
        Task::new(
            "Disable SSH password authentication",
            "ansible.builtin.lineinfile",
            json!({
                "path": "/etc/ssh/sshd_config",
                "regexp": "^#?PasswordAuthentication",
                "line": "PasswordAuthentication no"
            }),
        )
        .notify("Restart ssh"),
        Task::new(
            "Disable SSH root login",
            "ansible.builtin.lineinfile",
            json!({
                "path": "/etc/ssh/sshd_config",
                "regexp": "^#?PermitRootLogin",
                "line": "PermitRootLogin no"
            }),
        )
        .notify("Restart ssh"),
    ]
}

fn database_hardening(engine: DatabaseEngine) -> (Vec<Task>, Task) {
    let restart = |service: &str| {
        Task::new(
            "Restart database",
            "ansible.builtin.service",
            json!({ "name": service, "state": "restarted" }),
        )
    };

    match engine {
        DatabaseEngine::MySql | DatabaseEngine::MariaDb => {
            let (path, service) = if engine == DatabaseEngine::MariaDb {
                ("/etc/mysql/mariadb.conf.d/50-server.cnf", "mariadb")
            } else {
                ("/etc/mysql/mysql.conf.d/mysqld.cnf", "mysql")
            };
            let ini = |name: &str, option: &str, value: &str| {
                Task::new(
                    name,
                    "community.general.ini_file",
                    json!({ "path": path, "section": "mysqld", "option": option, "value": value }),
                )
                .notify("Restart database")
            };
            (
                vec![
                    ini("Bind the database to localhost", "bind-address", "127.0.0.1"),
                    ini("Require encrypted database connections", "require_secure_transport", "ON"),
                ],
                restart(service),
            )
        }
        DatabaseEngine::PostgreSql => {
            let conf = "/etc/postgresql/15/main/postgresql.conf";
            (
                vec![
                    Task::new(
                        "Bind the database to localhost",
                        "ansible.builtin.lineinfile",
                        json!({
                            "path": conf,
                            "regexp": "^#?listen_addresses",
                            "line": "listen_addresses = 'localhost'"
                        }),
                    )
                    .notify("Restart database"),
                    Task::new(
                        "Require encrypted database connections",
                        "ansible.builtin.lineinfile",
                        json!({ "path": conf, "regexp": "^#?ssl =", "line": "ssl = on" }),
                    )
                    .notify("Restart database"),
                ],
                restart("postgresql"),
            )
        }
        DatabaseEngine::MongoDb => (
            vec![
                Task::new(
                    "Bind the database to localhost",
                    "ansible.builtin.lineinfile",
                    json!({
                        "path": "/etc/mongod.conf",
                        "regexp": "^\\s*bindIp:",
                        "line": "  bindIp: 127.0.0.1"
                    }),
                )
                .notify("Restart database"),
                Task::new(
                    "Require encrypted database connections",
                    "ansible.builtin.blockinfile",
                    json!({
                        "path": "/etc/mongod.conf",
                        "insertafter": "^net:",
                        "marker": "  # {mark} TLS",
                        "block": "  tls:\n    mode: requireTLS\n    certificateKeyFile: /etc/ssl/mongodb.pem"
                    }),
                )
                .notify("Restart database"),
            ],
            restart("mongod"),
        ),
    }
}

/// Only 443 is opened by the firewall, so no plain-HTTP listener is served.
const HTTPS_VHOST: &str = "server {
    listen 443 ssl default_server;
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_certificate /etc/letsencrypt/live/default/fullchain.pem;
    ssl_certificate_key /etc/letsencrypt/live/default/privkey.pem;
    add_header Strict-Transport-Security \"max-age=31536000\" always;
    root /var/www/html;
}
";

fn web_hardening() -> Vec<Task> {
    vec![
        Task::new(
            "Install web server and certificate tooling",
            "ansible.builtin.apt",
            json!({ "name": ["nginx", "certbot", "python3-certbot-nginx"], "state": "present" }),
        ),
        Task::new(
            "Deploy HTTPS-only virtual host",
            "ansible.builtin.copy",
            json!({ "dest": "/etc/nginx/sites-available/default", "content": HTTPS_VHOST, "mode": "0644" }),
        )
        .notify("Reload nginx"),
        Task::new(
            "Hide the web server version",
            "ansible.builtin.lineinfile",
            json!({ "path": "/etc/nginx/nginx.conf", "regexp": "^\\s*#?\\s*server_tokens", "line": "\tserver_tokens off;" }),
        )
        .notify("Reload nginx"),
        Task::new(
            "Enable nginx",
            "ansible.builtin.service",
            json!({ "name": "nginx", "state": "started", "enabled": true }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_model::CloudProvider;

    fn spec(servers: u32, databases: u32, engine: DatabaseEngine) -> ProviderInfraSpec {
        ProviderInfraSpec::builder(CloudProvider::OpenStack)
            .servers(servers)
            .databases(databases)
            .database_type(engine)
            .build()
            .unwrap()
    }

    #[test]
    fn test_os_hardening_always_present() {
        let yaml = PlaybookBuilder::new()
            .with_spec("all", &spec(0, 0, DatabaseEngine::MySql))
            .render()
            .unwrap();

        assert!(yaml.starts_with("---\n"));
        assert!(yaml.contains("fail2ban"));
        assert!(yaml.contains("PasswordAuthentication no"));
        assert!(yaml.contains("'443'") || yaml.contains("\"443\""));
        assert!(!yaml.contains("nginx"));
        assert!(!yaml.contains("bind-address"));
    }

    #[test]
    fn test_database_section_is_engine_aware() {
        let mysql = PlaybookBuilder::new()
            .with_spec("all", &spec(0, 1, DatabaseEngine::MySql))
            .render()
            .unwrap();
        assert!(mysql.contains("bind-address"));
        assert!(mysql.contains("require_secure_transport"));

        let postgres = PlaybookBuilder::new()
            .with_spec("all", &spec(0, 1, DatabaseEngine::PostgreSql))
            .render()
            .unwrap();
        assert!(postgres.contains("listen_addresses = 'localhost'"));

        let mongo = PlaybookBuilder::new()
            .with_spec("all", &spec(0, 1, DatabaseEngine::MongoDb))
            .render()
            .unwrap();
        assert!(mongo.contains("requireTLS"));
    }

    #[test]
    fn test_web_section_only_with_servers() {
        let yaml = PlaybookBuilder::new()
            .with_spec("all", &spec(2, 0, DatabaseEngine::MySql))
            .render()
            .unwrap();
        assert!(yaml.contains("certbot"));
        assert!(yaml.contains("listen 443 ssl"));
        assert!(!yaml.contains("listen 80"));
    }

    #[test]
    fn test_playbook_is_valid_yaml() {
        let yaml = PlaybookBuilder::new()
            .with_spec("aws", &spec(1, 1, DatabaseEngine::PostgreSql))
            .with_spec("gcp", &spec(1, 0, DatabaseEngine::MySql))
            .render()
            .unwrap();

        let plays: Vec<serde_yaml::Value> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0]["hosts"], serde_yaml::Value::from("aws"));
        assert_eq!(plays[1]["become"], serde_yaml::Value::from(true));
    }
}
