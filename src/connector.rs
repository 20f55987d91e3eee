//! Debezium connector descriptor generation.
//!
//! Stamps a connector template with the source database connection and the
//! Event Hubs endpoint used for schema history. Pure data transformation apart
//! from [`generate`], which reads the template and writes the result.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Prefix of the connector `name` field; the date is appended.
const CONNECTOR_NAME_PREFIX: &str = "oracle_connector";

/// Kafka port exposed by Event Hubs namespaces.
const EVENT_HUBS_KAFKA_PORT: u16 = 9093;

/// History client prefixes that each need bootstrap servers and SASL settings.
const HISTORY_CLIENTS: &[(&str, &str)] = &[
    (
        "database.history.kafka.bootstrap.servers",
        "database.history.sasl.jaas.config",
    ),
    (
        "database.history.producer.bootstrap.servers",
        "database.history.producer.sasl.jaas.config",
    ),
    (
        "database.history.consumer.bootstrap.servers",
        "database.history.consumer.sasl.jaas.config",
    ),
];

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("environment variable `{0}` must be set")]
    MissingVariable(&'static str),

    #[error("invalid connector template: {0}")]
    InvalidTemplate(String),

    #[error("failed to access `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize connector document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Values substituted into the connector template.
#[derive(Debug, Clone)]
pub struct ConnectorParams {
    pub event_hub_name: String,
    pub event_hub_connection_string: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub pdb_name: String,
    pub server_name: String,
}

impl ConnectorParams {
    /// Reads every parameter from the process environment.
    pub fn from_env() -> Result<Self, ConnectorError> {
        fn var(name: &'static str) -> Result<String, ConnectorError> {
            std::env::var(name).map_err(|_| ConnectorError::MissingVariable(name))
        }

        Ok(Self {
            event_hub_name: var("EH_NAME")?,
            event_hub_connection_string: var("EH_CONNECTION_STRING")?,
            host: var("HOST")?,
            port: var("PORT")?,
            user: var("LOGMINER_USER_NAME")?,
            password: var("LOGMINER_PASSWORD")?,
            dbname: var("SID")?,
            pdb_name: var("PDB")?,
            server_name: var("DEBEZIUM_SERVER_NAME")?,
        })
    }

    fn bootstrap_servers(&self) -> String {
        format!(
            "{}.servicebus.windows.net:{EVENT_HUBS_KAFKA_PORT}",
            self.event_hub_name
        )
    }

    fn jaas_config(&self) -> String {
        format!(
            "org.apache.kafka.common.security.plain.PlainLoginModule required username=\"$ConnectionString\" password=\"{}\";",
            self.event_hub_connection_string
        )
    }
}

/// Returns the connector name for `date`, e.g. `oracle_connector_2024-03-01`.
pub fn connector_name(date: NaiveDate) -> String {
    format!("{CONNECTOR_NAME_PREFIX}_{}", date.format("%Y-%m-%d"))
}

/// Fills `template` with `params` and stamps its name with `date`.
///
/// The template must be an object with an object-valued `config` field. Keys
/// not touched here are preserved.
pub fn render(
    mut template: Value,
    params: &ConnectorParams,
    date: NaiveDate,
) -> Result<Value, ConnectorError> {
    let root = template
        .as_object_mut()
        .ok_or_else(|| ConnectorError::InvalidTemplate("document is not an object".into()))?;

    root.insert("name".into(), Value::String(connector_name(date)));

    let config = root
        .get_mut("config")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ConnectorError::InvalidTemplate("missing object field `config`".into()))?;

    set(config, "database.hostname", &params.host);
    set(config, "database.port", &params.port);
    set(config, "database.user", &params.user);
    set(config, "database.password", &params.password);
    set(config, "database.dbname", &params.dbname);
    set(config, "database.pdb.name", &params.pdb_name);
    set(config, "database.server.name", &params.server_name);

    let servers = params.bootstrap_servers();
    let jaas = params.jaas_config();
    for (servers_key, jaas_key) in HISTORY_CLIENTS {
        set(config, servers_key, &servers);
        set(config, jaas_key, &jaas);
    }

    Ok(template)
}

fn set(config: &mut Map<String, Value>, key: &str, value: &str) {
    config.insert(key.to_string(), Value::String(value.to_string()));
}

/// Serializes `value` with four-space indentation.
pub fn to_pretty_json(value: &Value) -> Result<String, ConnectorError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    String::from_utf8(buf)
        .map_err(|err| ConnectorError::InvalidTemplate(format!("output is not utf-8: {err}")))
}

/// Reads the template at `template_path`, renders it and writes `output_path`.
pub fn generate(
    template_path: &Path,
    output_path: &Path,
    params: &ConnectorParams,
    date: NaiveDate,
) -> Result<Value, ConnectorError> {
    let raw = fs::read_to_string(template_path).map_err(|source| ConnectorError::Io {
        path: template_path.display().to_string(),
        source,
    })?;
    let rendered = render(serde_json::from_str(&raw)?, params, date)?;

    fs::write(output_path, to_pretty_json(&rendered)?).map_err(|source| ConnectorError::Io {
        path: output_path.display().to_string(),
        source,
    })?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params() -> ConnectorParams {
        ConnectorParams {
            event_hub_name: "cdc-hub".to_string(),
            event_hub_connection_string: "Endpoint=sb://cdc-hub/;SharedAccessKey=abc".to_string(),
            host: "db.internal".to_string(),
            port: "1521".to_string(),
            user: "c##logminer".to_string(),
            password: "pw".to_string(),
            dbname: "ORCLCDB".to_string(),
            pdb_name: "ORCLPDB1".to_string(),
            server_name: "shop".to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn stamps_name_and_connection_fields() {
        let template = json!({
            "name": "placeholder",
            "config": {
                "connector.class": "io.debezium.connector.oracle.OracleConnector",
                "database.hostname": ""
            }
        });

        let rendered = render(template, &params(), date()).unwrap();

        assert_eq!(rendered["name"], "oracle_connector_2024-03-01");
        let config = &rendered["config"];
        assert_eq!(config["connector.class"], "io.debezium.connector.oracle.OracleConnector");
        assert_eq!(config["database.hostname"], "db.internal");
        assert_eq!(config["database.port"], "1521");
        assert_eq!(config["database.dbname"], "ORCLCDB");
        assert_eq!(config["database.pdb.name"], "ORCLPDB1");
        assert_eq!(config["database.server.name"], "shop");
    }

    #[test]
    fn fills_every_history_client() {
        let rendered = render(json!({ "config": {} }), &params(), date()).unwrap();
        let config = &rendered["config"];

        for (servers_key, jaas_key) in HISTORY_CLIENTS {
            assert_eq!(config[*servers_key], "cdc-hub.servicebus.windows.net:9093");
            assert_eq!(
                config[*jaas_key],
                "org.apache.kafka.common.security.plain.PlainLoginModule required \
                 username=\"$ConnectionString\" \
                 password=\"Endpoint=sb://cdc-hub/;SharedAccessKey=abc\";"
            );
        }
    }

    #[test]
    fn rejects_templates_without_config() {
        let err = render(json!({ "name": "x" }), &params(), date()).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidTemplate(_)));

        let err = render(json!([1, 2]), &params(), date()).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidTemplate(_)));
    }

    #[test]
    fn generate_writes_rendered_document() {
        let dir = std::env::temp_dir().join(format!("connector-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let template_path = dir.join("connector.json");
        let output_path = dir.join("debezium_connector.json");
        fs::write(&template_path, r#"{"name": "", "config": {"tasks.max": "1"}}"#).unwrap();

        generate(&template_path, &output_path, &params(), date()).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(written["name"], "oracle_connector_2024-03-01");
        assert_eq!(written["config"]["tasks.max"], "1");
        assert_eq!(written["config"]["database.user"], "c##logminer");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_template_is_an_io_error() {
        let missing = Path::new("/nonexistent/connector.json");
        let err = generate(missing, Path::new("/nonexistent/out.json"), &params(), date()).unwrap_err();
        assert!(matches!(err, ConnectorError::Io { .. }));
    }

    #[test]
    fn pretty_output_uses_four_spaces() {
        let output = to_pretty_json(&json!({ "config": { "a": "b" } })).unwrap();
        assert_eq!(output, "{\n    \"config\": {\n        \"a\": \"b\"\n    }\n}");
    }
}
