//! Ingress node firewall rule engine.
//!
//! Declarative rule sets matched against ingress packets:
//! - Source CIDR containment (IPv4 and IPv6)
//! - TCP/UDP/SCTP destination port lists and ranges
//! - Exact ICMP/ICMPv6 type+code matching
//! - First-match-wins across ordered rule sets
//! - YAML configuration
//!
//! # Example Configuration
//!
//! ```yaml
//! firewall:
//!   enabled: true
//!   default_policy: Allow
//!
//!   ingress:
//!     - from_cidrs: ["10.0.0.0/8"]
//!       rules:
//!         - protocol: TCP
//!           ports: [22]
//!           action: Deny
//!
//!         - protocol: UDP
//!           ports:
//!             start: 1000
//!             end: 2000
//!           action: Deny
//!
//!     - from_cidrs: ["0.0.0.0/0"]
//!       rules:
//!         - protocol: ICMP
//!           icmp_type: 8
//!           icmp_code: 0
//!           action: Allow
//! ```

mod engine;
mod packet;
mod types;

pub use engine::{CompiledFirewall, FirewallStats};
pub use packet::{Packet, Verdict};
pub use types::*;
