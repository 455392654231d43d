//! MQTT topic builders and parsers for the AWS IoT reserved topics.
//!
//! Topic structure:
//! ```text
//! $aws/things/{thing}/shadow/{get|update|delete}[/accepted|/rejected]
//! $aws/things/{thing}/shadow/update/{delta|documents}
//! $aws/things/{thing}/shadow/name/{shadow}/...            (named shadows)
//! $aws/things/{thing}/jobs/{get|start-next|notify|notify-next}[/accepted|/rejected]
//! $aws/things/{thing}/jobs/{job_id}/{get|update}[/accepted|/rejected]
//! $aws/certificates/{create|create-from-csr}/json[/accepted|/rejected]
//! $aws/provisioning-templates/{template}/provision/json[/accepted|/rejected]
//! ```

const THINGS: &str = "$aws/things";
const CERTIFICATES: &str = "$aws/certificates";
const TEMPLATES: &str = "$aws/provisioning-templates";

// ─── Response suffixes ───

pub fn accepted(topic: &str) -> String {
    format!("{topic}/accepted")
}

pub fn rejected(topic: &str) -> String {
    format!("{topic}/rejected")
}

// ─── Shadow topics ───

/// Root of a thing's classic shadow, or of a named shadow when `shadow_name` is set.
pub fn shadow_root(thing_name: &str, shadow_name: Option<&str>) -> String {
    match shadow_name {
        Some(name) => format!("{THINGS}/{thing_name}/shadow/name/{name}"),
        None => format!("{THINGS}/{thing_name}/shadow"),
    }
}

pub fn shadow_get(thing_name: &str, shadow_name: Option<&str>) -> String {
    format!("{}/get", shadow_root(thing_name, shadow_name))
}

pub fn shadow_update(thing_name: &str, shadow_name: Option<&str>) -> String {
    format!("{}/update", shadow_root(thing_name, shadow_name))
}

pub fn shadow_delete(thing_name: &str, shadow_name: Option<&str>) -> String {
    format!("{}/delete", shadow_root(thing_name, shadow_name))
}

pub fn shadow_delta(thing_name: &str, shadow_name: Option<&str>) -> String {
    format!("{}/update/delta", shadow_root(thing_name, shadow_name))
}

pub fn shadow_documents(thing_name: &str, shadow_name: Option<&str>) -> String {
    format!("{}/update/documents", shadow_root(thing_name, shadow_name))
}

// ─── Jobs topics ───

pub fn jobs_get_pending(thing_name: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/get")
}

pub fn jobs_start_next(thing_name: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/start-next")
}

pub fn jobs_describe(thing_name: &str, job_id: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/{job_id}/get")
}

pub fn jobs_update(thing_name: &str, job_id: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/{job_id}/update")
}

pub fn jobs_notify(thing_name: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/notify")
}

pub fn jobs_notify_next(thing_name: &str) -> String {
    format!("{THINGS}/{thing_name}/jobs/notify-next")
}

// ─── Identity topics ───

pub fn create_keys_and_certificate() -> String {
    format!("{CERTIFICATES}/create/json")
}

pub fn create_certificate_from_csr() -> String {
    format!("{CERTIFICATES}/create-from-csr/json")
}

pub fn register_thing(template_name: &str) -> String {
    format!("{TEMPLATES}/{template_name}/provision/json")
}

// ─── Topic parsing ───

/// Which AWS IoT service a topic belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTopic {
    Shadow {
        thing_name: String,
        shadow_name: Option<String>,
    },
    Jobs {
        thing_name: String,
        job_id: Option<String>,
    },
    Certificates,
    Provisioning {
        template_name: String,
    },
}

/// Final topic segment marking a response or an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicSuffix {
    Accepted,
    Rejected,
    Delta,
    Documents,
}

impl TopicSuffix {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "delta" => Some(Self::Delta),
            "documents" => Some(Self::Documents),
            _ => None,
        }
    }
}

/// Parsed MQTT topic components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub service: ServiceTopic,
    /// `get`, `update`, `delete`, `start-next`, `notify`, `create`, `provision`, ...
    pub operation: String,
    pub suffix: Option<TopicSuffix>,
}

/// Parse a topic string into its components.
/// Returns `None` for anything outside the reserved topics above.
pub fn parse_topic(topic: &str) -> Option<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.first() != Some(&"$aws") || parts.len() < 3 {
        return None;
    }

    match parts[1] {
        "things" => parse_thing_topic(&parts[2..]),
        "certificates" => parse_certificates_topic(&parts[2..]),
        "provisioning-templates" => parse_provisioning_topic(&parts[2..]),
        _ => None,
    }
}

fn parse_thing_topic(parts: &[&str]) -> Option<ParsedTopic> {
    let (thing_name, service, rest) = match parts {
        [thing, service, rest @ ..] if !thing.is_empty() => (*thing, *service, rest),
        _ => return None,
    };

    match service {
        "shadow" => {
            let (shadow_name, rest) = match rest {
                ["name", name, rest @ ..] if !name.is_empty() => (Some(name.to_string()), rest),
                _ => (None, rest),
            };
            let (operation, suffix) = match rest {
                [op @ ("get" | "update" | "delete")] => (*op, None),
                [op @ ("get" | "update" | "delete"), suffix] => {
                    (*op, Some(TopicSuffix::parse(suffix)?))
                }
                _ => return None,
            };
            Some(ParsedTopic {
                service: ServiceTopic::Shadow {
                    thing_name: thing_name.to_string(),
                    shadow_name,
                },
                operation: operation.to_string(),
                suffix,
            })
        }
        "jobs" => {
            let (job_id, operation, suffix) = match rest {
                [op] => (None, *op, None),
                [op, suffix @ ("accepted" | "rejected")] => (None, *op, TopicSuffix::parse(suffix)),
                [job_id, op @ ("get" | "update")] => (Some(job_id.to_string()), *op, None),
                [job_id, op @ ("get" | "update"), suffix] => (
                    Some(job_id.to_string()),
                    *op,
                    Some(TopicSuffix::parse(suffix)?),
                ),
                _ => return None,
            };
            Some(ParsedTopic {
                service: ServiceTopic::Jobs {
                    thing_name: thing_name.to_string(),
                    job_id,
                },
                operation: operation.to_string(),
                suffix,
            })
        }
        _ => None,
    }
}

fn parse_certificates_topic(parts: &[&str]) -> Option<ParsedTopic> {
    let (operation, suffix) = match parts {
        [op, "json"] => (*op, None),
        [op, "json", suffix] => (*op, Some(TopicSuffix::parse(suffix)?)),
        _ => return None,
    };
    Some(ParsedTopic {
        service: ServiceTopic::Certificates,
        operation: operation.to_string(),
        suffix,
    })
}

fn parse_provisioning_topic(parts: &[&str]) -> Option<ParsedTopic> {
    let (template_name, suffix) = match parts {
        [template, "provision", "json"] => (*template, None),
        [template, "provision", "json", suffix] => (*template, Some(TopicSuffix::parse(suffix)?)),
        _ => return None,
    };
    Some(ParsedTopic {
        service: ServiceTopic::Provisioning {
            template_name: template_name.to_string(),
        },
        operation: "provision".to_string(),
        suffix,
    })
}
