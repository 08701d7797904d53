use anyhow::{bail, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;

use nodefw::config::{Config, ConfigWatcher};
use nodefw::firewall::{CompiledFirewall, Packet, Protocol};
use nodefw::telemetry::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "nodefw")]
#[command(author, version, about = "Ingress node firewall rule engine")]
struct Args {
    /// Path to rules file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate rules and exit
    #[arg(long)]
    validate: bool,

    /// Watch the rules file and revalidate on change
    #[arg(long)]
    watch: bool,

    /// Source address of a packet to check against the rules
    #[arg(long)]
    src: Option<IpAddr>,

    /// Protocol of the packet to check (ICMP, ICMPv6, TCP, UDP, SCTP)
    #[arg(long)]
    protocol: Option<Protocol>,

    /// Destination port of the packet to check (TCP/UDP/SCTP)
    #[arg(long)]
    dport: Option<u16>,

    /// ICMP type of the packet to check
    #[arg(long)]
    icmp_type: Option<u8>,

    /// ICMP code of the packet to check
    #[arg(long)]
    icmp_code: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    let tracing_config = TracingConfig {
        service_name: "nodefw".to_string(),
        log_level: config.telemetry.log_level.clone(),
        json_logs: config.telemetry.json_logs,
    };

    init_tracing(&tracing_config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        rule_sets = config.firewall.ingress.len(),
        "starting nodefw"
    );

    // Validate only mode
    if args.validate {
        info!("rules are valid");
        return Ok(());
    }

    let firewall = CompiledFirewall::from_config(&config.firewall)?;

    // One-shot packet check
    if let Some(protocol) = args.protocol {
        let packet = build_packet(&args, protocol)?;
        let verdict = firewall.evaluate(&packet);
        println!("{}", verdict);
        return Ok(());
    }

    // Watch mode: revalidate on every change until interrupted
    if args.watch {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let mut watcher = ConfigWatcher::new(&args.config, &config)?;
        watcher.start()?;
        let handle = tokio::spawn(watcher.run(shutdown_rx));

        tokio::signal::ctrl_c().await?;
        info!("shutting down");

        let _ = shutdown_tx.send(true);
        handle.await?;
    }

    Ok(())
}

fn build_packet(args: &Args, protocol: Protocol) -> Result<Packet> {
    let Some(src) = args.src else {
        bail!("--src is required to check a packet");
    };

    match protocol {
        Protocol::Tcp | Protocol::Udp | Protocol::Sctp => {
            let Some(dport) = args.dport else {
                bail!("--dport is required for {} packets", protocol);
            };
            Ok(match protocol {
                Protocol::Tcp => Packet::tcp(src, dport),
                Protocol::Udp => Packet::udp(src, dport),
                _ => Packet::sctp(src, dport),
            })
        }
        Protocol::Icmp | Protocol::IcmpV6 => {
            let (Some(icmp_type), Some(icmp_code)) = (args.icmp_type, args.icmp_code) else {
                bail!("--icmp-type and --icmp-code are required for {} packets", protocol);
            };
            Ok(match protocol {
                Protocol::Icmp => Packet::icmp(src, icmp_type, icmp_code),
                _ => Packet::icmpv6(src, icmp_type, icmp_code),
            })
        }
    }
}
