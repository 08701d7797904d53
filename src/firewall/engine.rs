//! Firewall rule evaluation engine.
//!
//! Compiles the declarative rule spec into a form that can be evaluated on
//! the packet path without allocation, locking, or failure.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use ipnet::IpNet;
use tracing::{debug, trace};

use super::packet::{Packet, Verdict};
use super::types::{
    Action, FirewallConfig, FirewallError, PortSpec, Protocol, ProtocolRuleConfig, RuleSetConfig,
    ICMP_CODE_MAX, ICMP_TYPE_MAX,
};

/// Compiled firewall for efficient evaluation.
///
/// All validation happens in [`CompiledFirewall::from_config`];
/// [`CompiledFirewall::evaluate`] is a pure function that never fails.
/// The compiled state is immutable, so a single instance can be shared
/// across threads and evaluated concurrently. Hot reload replaces the
/// whole instance behind an `Arc` (see `config::watcher`).
#[derive(Debug)]
pub struct CompiledFirewall {
    /// Whether the firewall is enabled
    enabled: bool,
    /// Policy applied by [`CompiledFirewall::decide`] when no rule matches
    default_policy: Action,
    /// Rule sets in declaration order
    rule_sets: Vec<CompiledRuleSet>,
}

/// Compiled rule set.
#[derive(Debug)]
struct CompiledRuleSet {
    /// Parsed source networks; empty means no source constraint
    sources: Vec<IpNet>,
    /// Protocol rules in declaration order
    rules: Vec<CompiledRule>,
}

/// Compiled protocol rule.
#[derive(Debug)]
struct CompiledRule {
    protocol: Protocol,
    matcher: PayloadMatcher,
    action: Action,
    hits: AtomicU64,
}

/// Protocol-dependent payload matcher.
#[derive(Debug)]
enum PayloadMatcher {
    /// Any destination port (transport rule without port constraint)
    AnyPort,
    /// Explicit destination ports
    Ports(Vec<u16>),
    /// Inclusive destination port range
    PortRange { start: u16, end: u16 },
    /// Exact ICMP/ICMPv6 type and code
    Icmp { icmp_type: u8, icmp_code: u8 },
}

impl CompiledFirewall {
    /// Create a new compiled firewall from configuration.
    ///
    /// Malformed CIDRs, out-of-range ICMP fields, inverted port ranges and
    /// empty rule sets are rejected here, before the rules become active.
    pub fn from_config(config: &FirewallConfig) -> Result<Self, FirewallError> {
        let rule_sets = config
            .ingress
            .iter()
            .enumerate()
            .map(|(index, set)| Self::compile_rule_set(index, set))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            enabled = config.enabled,
            rule_sets = rule_sets.len(),
            rules = rule_sets.iter().map(|s| s.rules.len()).sum::<usize>(),
            "compiled firewall rules"
        );

        Ok(Self {
            enabled: config.enabled,
            default_policy: config.default_policy,
            rule_sets,
        })
    }

    fn compile_rule_set(
        index: usize,
        config: &RuleSetConfig,
    ) -> Result<CompiledRuleSet, FirewallError> {
        if config.rules.is_empty() {
            return Err(FirewallError::EmptyRuleSet { index });
        }

        let sources = config
            .from_cidrs
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNet>().map_err(|_| FirewallError::InvalidCidr {
                    index,
                    cidr: cidr.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rules = config
            .rules
            .iter()
            .map(|rule| Self::compile_rule(index, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledRuleSet { sources, rules })
    }

    fn compile_rule(
        index: usize,
        config: &ProtocolRuleConfig,
    ) -> Result<CompiledRule, FirewallError> {
        let matcher = match config {
            ProtocolRuleConfig::Tcp { ports, .. }
            | ProtocolRuleConfig::Udp { ports, .. }
            | ProtocolRuleConfig::Sctp { ports, .. } => Self::compile_ports(index, ports.as_ref())?,
            ProtocolRuleConfig::Icmp {
                icmp_type,
                icmp_code,
                ..
            }
            | ProtocolRuleConfig::IcmpV6 {
                icmp_type,
                icmp_code,
                ..
            } => {
                if *icmp_type > ICMP_TYPE_MAX {
                    return Err(FirewallError::IcmpTypeOutOfRange {
                        index,
                        value: *icmp_type,
                    });
                }
                if *icmp_code > ICMP_CODE_MAX {
                    return Err(FirewallError::IcmpCodeOutOfRange {
                        index,
                        value: *icmp_code,
                    });
                }
                PayloadMatcher::Icmp {
                    icmp_type: *icmp_type,
                    icmp_code: *icmp_code,
                }
            }
        };

        Ok(CompiledRule {
            protocol: config.protocol(),
            matcher,
            action: config.action(),
            hits: AtomicU64::new(0),
        })
    }

    fn compile_ports(
        index: usize,
        ports: Option<&PortSpec>,
    ) -> Result<PayloadMatcher, FirewallError> {
        match ports {
            None => Ok(PayloadMatcher::AnyPort),
            Some(PortSpec::Ports(ports)) if ports.is_empty() => Ok(PayloadMatcher::AnyPort),
            Some(PortSpec::Ports(ports)) => Ok(PayloadMatcher::Ports(ports.clone())),
            Some(PortSpec::Range { start, end }) => {
                if start > end {
                    return Err(FirewallError::InvalidPortRange {
                        index,
                        start: *start,
                        end: *end,
                    });
                }
                Ok(PayloadMatcher::PortRange {
                    start: *start,
                    end: *end,
                })
            }
        }
    }

    /// Evaluate a packet against the compiled rule spec.
    ///
    /// Rule sets are walked in declaration order; within a set whose source
    /// CIDRs contain the packet source, protocol rules are walked in order.
    /// The first matching rule determines the verdict. Returns
    /// [`Verdict::NoMatch`] when no rule applies (or the firewall is
    /// disabled), leaving the decision to the caller's default policy.
    pub fn evaluate(&self, packet: &Packet) -> Verdict {
        if !self.enabled {
            return Verdict::NoMatch;
        }

        for (set_index, set) in self.rule_sets.iter().enumerate() {
            if !set.matches_source(packet.source) {
                continue;
            }

            for rule in &set.rules {
                if rule.matches(packet) {
                    rule.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        source = %packet.source,
                        protocol = %packet.protocol,
                        rule_set = set_index,
                        action = ?rule.action,
                        "rule matched"
                    );
                    return match rule.action {
                        Action::Allow => Verdict::Allow,
                        Action::Deny => Verdict::Deny,
                    };
                }
            }
        }

        Verdict::NoMatch
    }

    /// Evaluate a packet and resolve [`Verdict::NoMatch`] through the
    /// configured default policy. A disabled firewall allows everything.
    pub fn decide(&self, packet: &Packet) -> Action {
        if !self.enabled {
            return Action::Allow;
        }
        match self.evaluate(packet) {
            Verdict::Allow => Action::Allow,
            Verdict::Deny => Action::Deny,
            Verdict::NoMatch => self.default_policy,
        }
    }

    /// Get statistics about firewall operation.
    pub fn stats(&self) -> FirewallStats {
        FirewallStats {
            enabled: self.enabled,
            rule_sets: self.rule_sets.len(),
            rules: self.rule_sets.iter().map(|s| s.rules.len()).sum(),
            hits: self
                .rule_sets
                .iter()
                .map(|s| {
                    s.rules
                        .iter()
                        .map(|r| r.hits.load(Ordering::Relaxed))
                        .collect()
                })
                .collect(),
        }
    }
}

impl CompiledRuleSet {
    /// Whether the packet source falls in any of the set's CIDRs.
    /// An empty CIDR list places no constraint on the source.
    fn matches_source(&self, source: IpAddr) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|net| net.contains(&source))
    }
}

impl CompiledRule {
    fn matches(&self, packet: &Packet) -> bool {
        if self.protocol != packet.protocol {
            return false;
        }

        match &self.matcher {
            PayloadMatcher::AnyPort => packet.dest_port.is_some(),
            PayloadMatcher::Ports(ports) => match packet.dest_port {
                Some(port) => ports.contains(&port),
                None => false,
            },
            PayloadMatcher::PortRange { start, end } => match packet.dest_port {
                Some(port) => port >= *start && port <= *end,
                None => false,
            },
            PayloadMatcher::Icmp {
                icmp_type,
                icmp_code,
            } => {
                packet.icmp_type == Some(*icmp_type) && packet.icmp_code == Some(*icmp_code)
            }
        }
    }
}

/// Firewall statistics.
#[derive(Debug, Clone)]
pub struct FirewallStats {
    pub enabled: bool,
    pub rule_sets: usize,
    pub rules: usize,
    /// Rule hit counters, indexed by rule set then rule position
    pub hits: Vec<Vec<u64>>,
}
