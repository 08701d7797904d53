//! Firewall rule types and configuration structures.
//!
//! Defines the declarative rule schema:
//! - Rule sets (source CIDRs plus per-protocol rules)
//! - Protocol rules (TCP/UDP/SCTP port matches, ICMP/ICMPv6 type+code matches)
//! - Allow/Deny actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest ICMP type number accepted by validation (RFC 792).
pub const ICMP_TYPE_MAX: u8 = 43;

/// Highest ICMP code number accepted by validation (RFC 792).
pub const ICMP_CODE_MAX: u8 = 16;

/// Firewall configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Whether the firewall is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Policy applied when no rule matches
    #[serde(default)]
    pub default_policy: Action,
    /// Ingress rule sets, evaluated in order (first match wins).
    /// An empty list means no ingress firewall, i.e. allow all traffic.
    #[serde(default)]
    pub ingress: Vec<RuleSetConfig>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_policy: Action::default(),
            ingress: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Verdict action for a matched rule, and the default policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Allow,
    Deny,
}

/// Protocol families a rule or packet can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "ICMP")]
    Icmp,
    #[serde(rename = "ICMPv6")]
    IcmpV6,
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "SCTP")]
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Icmp => "ICMP",
            Protocol::IcmpV6 => "ICMPv6",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Sctp => "SCTP",
        };
        f.write_str(name)
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icmp" => Ok(Protocol::Icmp),
            "icmpv6" => Ok(Protocol::IcmpV6),
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            other => Err(format!("unknown protocol: {}", other)),
        }
    }
}

/// One rule set: traffic from any of `from_cidrs`, matched against the
/// per-protocol rules in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Source CIDRs this set applies to. Empty means no source constraint.
    #[serde(default)]
    pub from_cidrs: Vec<String>,
    /// Per-protocol rules, evaluated in order within the set
    #[serde(default)]
    pub rules: Vec<ProtocolRuleConfig>,
}

/// Per-protocol rule, discriminated by the `protocol` field.
///
/// Transport variants match on destination port, ICMP variants match the
/// exact type/code pair. Each variant carries only the fields its protocol
/// family can use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum ProtocolRuleConfig {
    #[serde(rename = "TCP")]
    Tcp {
        #[serde(default)]
        ports: Option<PortSpec>,
        action: Action,
    },
    #[serde(rename = "UDP")]
    Udp {
        #[serde(default)]
        ports: Option<PortSpec>,
        action: Action,
    },
    #[serde(rename = "SCTP")]
    Sctp {
        #[serde(default)]
        ports: Option<PortSpec>,
        action: Action,
    },
    #[serde(rename = "ICMP")]
    Icmp {
        icmp_type: u8,
        icmp_code: u8,
        action: Action,
    },
    #[serde(rename = "ICMPv6")]
    IcmpV6 {
        icmp_type: u8,
        icmp_code: u8,
        action: Action,
    },
}

impl ProtocolRuleConfig {
    /// Protocol family this rule applies to.
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolRuleConfig::Tcp { .. } => Protocol::Tcp,
            ProtocolRuleConfig::Udp { .. } => Protocol::Udp,
            ProtocolRuleConfig::Sctp { .. } => Protocol::Sctp,
            ProtocolRuleConfig::Icmp { .. } => Protocol::Icmp,
            ProtocolRuleConfig::IcmpV6 { .. } => Protocol::IcmpV6,
        }
    }

    /// Action taken when this rule matches.
    pub fn action(&self) -> Action {
        match self {
            ProtocolRuleConfig::Tcp { action, .. }
            | ProtocolRuleConfig::Udp { action, .. }
            | ProtocolRuleConfig::Sctp { action, .. }
            | ProtocolRuleConfig::Icmp { action, .. }
            | ProtocolRuleConfig::IcmpV6 { action, .. } => *action,
        }
    }
}

/// Destination port specification for transport rules.
///
/// Either an explicit port list (`ports: [22, 80]`) or an inclusive range
/// (`ports: {start: 1000, end: 2000}`). An empty list matches any port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// Inclusive start-end range of destination ports
    Range { start: u16, end: u16 },
    /// Explicit destination ports
    Ports(Vec<u16>),
}

/// Firewall error types.
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    #[error("rule set {index}: invalid CIDR: {cidr}")]
    InvalidCidr { index: usize, cidr: String },

    #[error("rule set {index}: ICMP type {value} out of range 0-43")]
    IcmpTypeOutOfRange { index: usize, value: u8 },

    #[error("rule set {index}: ICMP code {value} out of range 0-16")]
    IcmpCodeOutOfRange { index: usize, value: u8 },

    #[error("rule set {index}: invalid port range {start}-{end}")]
    InvalidPortRange { index: usize, start: u16, end: u16 },

    #[error("rule set {index}: no protocol rules, set can never match")]
    EmptyRuleSet { index: usize },
}
