//! Packet descriptor and evaluation verdict.
//!
//! A [`Packet`] carries the fields a rule can examine: source address,
//! protocol, and the protocol-dependent payload field (destination port for
//! transport protocols, type/code for ICMP).

use std::net::IpAddr;

use super::types::Protocol;

/// Descriptor of one ingress packet for rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Source address
    pub source: IpAddr,
    /// Protocol family
    pub protocol: Protocol,
    /// Destination port (TCP/UDP/SCTP)
    pub dest_port: Option<u16>,
    /// ICMP/ICMPv6 message type
    pub icmp_type: Option<u8>,
    /// ICMP/ICMPv6 message code
    pub icmp_code: Option<u8>,
}

impl Packet {
    /// TCP packet to the given destination port.
    pub fn tcp(source: IpAddr, dest_port: u16) -> Self {
        Self::transport(source, Protocol::Tcp, dest_port)
    }

    /// UDP packet to the given destination port.
    pub fn udp(source: IpAddr, dest_port: u16) -> Self {
        Self::transport(source, Protocol::Udp, dest_port)
    }

    /// SCTP packet to the given destination port.
    pub fn sctp(source: IpAddr, dest_port: u16) -> Self {
        Self::transport(source, Protocol::Sctp, dest_port)
    }

    /// ICMP packet with the given type and code.
    pub fn icmp(source: IpAddr, icmp_type: u8, icmp_code: u8) -> Self {
        Self {
            source,
            protocol: Protocol::Icmp,
            dest_port: None,
            icmp_type: Some(icmp_type),
            icmp_code: Some(icmp_code),
        }
    }

    /// ICMPv6 packet with the given type and code.
    pub fn icmpv6(source: IpAddr, icmp_type: u8, icmp_code: u8) -> Self {
        Self {
            source,
            protocol: Protocol::IcmpV6,
            dest_port: None,
            icmp_type: Some(icmp_type),
            icmp_code: Some(icmp_code),
        }
    }

    fn transport(source: IpAddr, protocol: Protocol, dest_port: u16) -> Self {
        Self {
            source,
            protocol,
            dest_port: Some(dest_port),
            icmp_type: None,
            icmp_code: None,
        }
    }
}

/// Result of evaluating a packet against the compiled rule spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A rule matched and allows the packet
    Allow,
    /// A rule matched and denies the packet
    Deny,
    /// No rule applied; the caller decides via its default policy
    NoMatch,
}

impl Verdict {
    /// Whether any rule matched the packet.
    pub fn is_match(&self) -> bool {
        !matches!(self, Verdict::NoMatch)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
            Verdict::NoMatch => "no-match",
        };
        f.write_str(name)
    }
}
