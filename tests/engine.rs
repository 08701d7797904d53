//! End-to-end rule engine tests: YAML rules in, verdicts out.
//!
//! Run with: cargo test --test engine

use std::net::IpAddr;

use nodefw::config::Config;
use nodefw::firewall::{Action, CompiledFirewall, Packet, Verdict};

fn compile(yaml: &str) -> CompiledFirewall {
    let config = Config::from_yaml(yaml).expect("rules should parse");
    CompiledFirewall::from_config(&config.firewall).expect("rules should compile")
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn deny_ssh_from_private_range() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports: [22]
          action: Deny
"#,
    );

    // Inside the CIDR, matching port
    let verdict = firewall.evaluate(&Packet::tcp(ip("10.1.2.3"), 22));
    assert_eq!(verdict, Verdict::Deny);

    // Outside the CIDR
    let verdict = firewall.evaluate(&Packet::tcp(ip("192.168.1.1"), 22));
    assert_eq!(verdict, Verdict::NoMatch);
}

#[test]
fn allow_echo_request_from_anywhere() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["0.0.0.0/0"]
      rules:
        - protocol: ICMP
          icmp_type: 8
          icmp_code: 0
          action: Allow
"#,
    );

    for source in ["10.1.2.3", "203.0.113.99", "172.16.31.5"] {
        let verdict = firewall.evaluate(&Packet::icmp(ip(source), 8, 0));
        assert_eq!(verdict, Verdict::Allow, "source {}", source);
    }

    // Same type, different code: no wildcarding
    let verdict = firewall.evaluate(&Packet::icmp(ip("10.1.2.3"), 8, 1));
    assert_eq!(verdict, Verdict::NoMatch);
}

#[test]
fn first_matching_rule_set_wins() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports: [443]
          action: Deny
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports: [443]
          action: Allow
"#,
    );

    let verdict = firewall.evaluate(&Packet::tcp(ip("10.0.0.1"), 443));
    assert_eq!(verdict, Verdict::Deny);
}

#[test]
fn first_matching_rule_within_set_wins() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports: [8080]
          action: Allow
        - protocol: TCP
          ports:
            start: 8000
            end: 9000
          action: Deny
"#,
    );

    // Port 8080 hits the explicit allow before the deny range
    assert_eq!(
        firewall.evaluate(&Packet::tcp(ip("10.0.0.1"), 8080)),
        Verdict::Allow
    );
    // Other ports in the range fall through to the deny
    assert_eq!(
        firewall.evaluate(&Packet::tcp(ip("10.0.0.1"), 8081)),
        Verdict::Deny
    );
}

#[test]
fn port_range_is_boundary_inclusive() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["0.0.0.0/0"]
      rules:
        - protocol: TCP
          ports:
            start: 1000
            end: 2000
          action: Deny
"#,
    );

    let src = ip("198.51.100.1");
    assert_eq!(firewall.evaluate(&Packet::tcp(src, 1000)), Verdict::Deny);
    assert_eq!(firewall.evaluate(&Packet::tcp(src, 2000)), Verdict::Deny);
    assert_eq!(firewall.evaluate(&Packet::tcp(src, 999)), Verdict::NoMatch);
    assert_eq!(firewall.evaluate(&Packet::tcp(src, 2001)), Verdict::NoMatch);
}

#[test]
fn empty_spec_never_matches() {
    let firewall = compile("firewall:\n  ingress: []\n");

    let packets = [
        Packet::tcp(ip("10.0.0.1"), 22),
        Packet::udp(ip("2001:db8::1"), 53),
        Packet::icmp(ip("192.0.2.1"), 8, 0),
    ];
    for packet in packets {
        assert_eq!(firewall.evaluate(&packet), Verdict::NoMatch);
        assert_eq!(firewall.decide(&packet), Action::Allow);
    }
}

#[test]
fn rule_set_without_cidrs_applies_to_all_sources() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - rules:
        - protocol: UDP
          ports: [161]
          action: Deny
"#,
    );

    for source in ["10.0.0.1", "203.0.113.1", "2001:db8::99"] {
        assert_eq!(
            firewall.evaluate(&Packet::udp(ip(source), 161)),
            Verdict::Deny,
            "source {}",
            source
        );
    }
}

#[test]
fn mixed_protocol_rule_set() {
    let firewall = compile(
        r#"
firewall:
  default_policy: Deny
  ingress:
    - from_cidrs: ["172.16.0.0/12", "2001:db8::/32"]
      rules:
        - protocol: TCP
          ports: [80, 443]
          action: Allow
        - protocol: ICMPv6
          icmp_type: 128
          icmp_code: 0
          action: Allow
        - protocol: SCTP
          action: Deny
"#,
    );

    assert_eq!(
        firewall.evaluate(&Packet::tcp(ip("172.16.5.5"), 443)),
        Verdict::Allow
    );
    assert_eq!(
        firewall.evaluate(&Packet::icmpv6(ip("2001:db8::7"), 128, 0)),
        Verdict::Allow
    );
    // SCTP rule has no port constraint, so any port is denied
    assert_eq!(
        firewall.evaluate(&Packet::sctp(ip("172.16.5.5"), 9999)),
        Verdict::Deny
    );

    // Unmatched traffic resolves through the default policy
    let stray = Packet::udp(ip("172.16.5.5"), 53);
    assert_eq!(firewall.evaluate(&stray), Verdict::NoMatch);
    assert_eq!(firewall.decide(&stray), Action::Deny);
}

#[test]
fn evaluation_is_deterministic() {
    let firewall = compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports: [22]
          action: Deny
"#,
    );

    let packet = Packet::tcp(ip("10.1.2.3"), 22);
    let first = firewall.evaluate(&packet);
    for _ in 0..1000 {
        assert_eq!(firewall.evaluate(&packet), first);
    }
}

#[test]
fn concurrent_evaluation_over_shared_snapshot() {
    use std::sync::Arc;

    let firewall = Arc::new(compile(
        r#"
firewall:
  ingress:
    - from_cidrs: ["10.0.0.0/8"]
      rules:
        - protocol: TCP
          ports:
            start: 1
            end: 1024
          action: Deny
"#,
    ));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let firewall = Arc::clone(&firewall);
            std::thread::spawn(move || {
                for port in 1..=2048u16 {
                    let packet = Packet::tcp(ip("10.0.0.1"), port);
                    let expected = if port <= 1024 {
                        Verdict::Deny
                    } else {
                        Verdict::NoMatch
                    };
                    assert_eq!(
                        firewall.evaluate(&packet),
                        expected,
                        "worker {} port {}",
                        worker,
                        port
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
