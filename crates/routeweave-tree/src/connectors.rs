//! Connector descriptors and endpoint URI parsing.
//!
//! A connector is identified by the scheme of an endpoint URI
//! (`kafka:orders?brokers=...`). Its descriptor lists the parameters the
//! validator checks: which ones are required, which hold secrets, which have
//! defaults, and which are taken from the URI path.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use routeweave_types::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Bound from the URI path rather than the query string.
    #[serde(default)]
    pub path: bool,
}

impl ConnectorParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            secret: false,
            default: None,
            path: false,
        }
    }

    pub fn path(mut self) -> Self {
        self.path = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    pub scheme: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parameters: Vec<ConnectorParameter>,
}

impl ConnectorDescriptor {
    pub fn new(scheme: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            title: title.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ConnectorParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Path parameters in declaration order.
    pub fn path_parameters(&self) -> impl Iterator<Item = &ConnectorParameter> {
        self.parameters.iter().filter(|p| p.path)
    }
}

#[derive(Deserialize)]
struct ConnectorFile {
    #[serde(default)]
    connectors: Vec<ConnectorDescriptor>,
}

// ---------------------------------------------------------------------------
// Endpoint URIs
// ---------------------------------------------------------------------------

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)(?::([^?]*))?(?:\?(.*))?$").expect("valid regex")
});

/// An endpoint URI split into `scheme:path?query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointUri<'a> {
    pub scheme: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl<'a> EndpointUri<'a> {
    /// Query parameters as `(name, value)` pairs; a bare name has an empty value.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.query
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

pub fn parse_endpoint_uri(uri: &str) -> Option<EndpointUri<'_>> {
    let caps = URI_RE.captures(uri.trim())?;
    Some(EndpointUri {
        scheme: caps.get(1)?.as_str(),
        path: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
        query: caps.get(3).map(|m| m.as_str()),
    })
}

// ---------------------------------------------------------------------------
// ConnectorCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ConnectorCatalog {
    connectors: HashMap<String, ConnectorDescriptor>,
}

impl ConnectorCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: ConnectorDescriptor) -> Self {
        self.connectors.insert(descriptor.scheme.clone(), descriptor);
        self
    }

    pub fn get(&self, scheme: &str) -> Option<&ConnectorDescriptor> {
        self.connectors.get(scheme)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// The descriptor for the scheme of `uri`, if the scheme is known.
    pub fn descriptor_for_uri(&self, uri: &str) -> Option<&ConnectorDescriptor> {
        parse_endpoint_uri(uri).and_then(|parsed| self.get(parsed.scheme))
    }

    /// Overlay descriptors from a JSON connector file body; a listed scheme
    /// replaces any existing descriptor.
    pub fn merge_json(mut self, input: &str) -> Result<Self> {
        let file: ConnectorFile = serde_json::from_str(input)?;
        for descriptor in file.connectors {
            self = self.register(descriptor);
        }
        Ok(self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let catalog = Self::builtin().merge_json(&source)?;
        tracing::debug!(path = %path.display(), connectors = catalog.len(), "Connector catalog loaded");
        Ok(catalog)
    }

    pub fn builtin() -> Self {
        let p = ConnectorParameter::new;
        let http = |scheme: &str| {
            ConnectorDescriptor::new(scheme, scheme.to_uppercase())
                .param(p("httpUri").path().required())
                .param(p("authUsername"))
                .param(p("authPassword").secret())
        };

        Self::empty()
            .register(
                ConnectorDescriptor::new("timer", "Timer")
                    .param(p("timerName").path().required())
                    .param(p("period").with_default("1000"))
                    .param(p("repeatCount")),
            )
            .register(
                ConnectorDescriptor::new("log", "Log")
                    .param(p("loggerName").path().required())
                    .param(p("level").with_default("INFO"))
                    .param(p("showAll")),
            )
            .register(
                ConnectorDescriptor::new("direct", "Direct")
                    .param(p("name").path().required())
                    .param(p("timeout")),
            )
            .register(
                ConnectorDescriptor::new("kafka", "Kafka")
                    .param(p("topic").path().required())
                    .param(p("brokers").required())
                    .param(p("saslJaasConfig").secret())
                    .param(p("sslKeyPassword").secret()),
            )
            .register(http("http"))
            .register(http("https"))
            .register(
                ConnectorDescriptor::new("sql", "SQL")
                    .param(p("query").path().required())
                    .param(p("dataSource")),
            )
            .register(
                ConnectorDescriptor::new("file", "File")
                    .param(p("directoryName").path().required())
                    .param(p("fileName")),
            )
            .register(
                ConnectorDescriptor::new("aws2-s3", "AWS S3 Storage Service")
                    .param(p("bucketNameOrArn").path().required())
                    .param(p("accessKey").secret())
                    .param(p("secretKey").secret())
                    .param(p("region")),
            )
    }
}
