//! Declarative ingress firewall rule engine for cluster nodes.
//!
//! Rule sets pair source CIDRs with per-protocol (ICMP/ICMPv6/TCP/UDP/SCTP)
//! allow/deny rules. Rules are loaded from YAML, validated and compiled once,
//! then evaluated as a pure function over packet descriptors.

pub mod config;
pub mod firewall;
pub mod telemetry;
