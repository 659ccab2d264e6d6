//! Conclave node administration.
//!
//! Initializes a node's identity and store and manages the membership
//! records the replication core reads: host registrations, groups, and
//! peer assignments.
//!
//! # Usage
//!
//! ```bash
//! # Create a key and an empty store
//! conclave-node --config node.toml init --addr 10.0.0.1:4000
//!
//! # Register another node's host record
//! conclave-node --config node.toml add-host --addr 10.0.0.2:4000 --key <hex>
//!
//! # Create a group and assign a peer to a host
//! conclave-node --config node.toml create-group --group 7 --replications 3
//! conclave-node --config node.toml add-peer --group 7 --peer 1 --host <id>
//!
//! # Inspect a group
//! conclave-node --config node.toml show --group 7
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use conclave_server::{Directory, NodeConfig};
use conclave_storage::RocksKv;
use conclave_types::{
    GroupId, Host, KeyPair, NodeId, Peer, PeerId, PublicKey, RaftGroup, ALPHA_GROUP,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Conclave node administration.
#[derive(Parser, Debug)]
#[command(name = "conclave-node")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Log level filter (overrides RUST_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the node key (if absent), open the store, and register
    /// this node as a host.
    Init {
        /// Address other nodes reach this node at.
        #[arg(long)]
        addr: String,
    },
    /// Register a remote node's host record.
    AddHost {
        /// The node's RPC address.
        #[arg(long)]
        addr: String,
        /// The node's ed25519 public key, hex encoded.
        #[arg(long)]
        key: String,
    },
    /// Create a group.
    CreateGroup {
        /// Group id.
        #[arg(long)]
        group: u64,
        /// Target replication factor.
        #[arg(long, default_value_t = 3)]
        replications: u32,
    },
    /// Assign a peer of a group to a host.
    AddPeer {
        /// Group id.
        #[arg(long)]
        group: u64,
        /// Peer id, unique within the group.
        #[arg(long)]
        peer: u64,
        /// Owning node id.
        #[arg(long)]
        host: u64,
    },
    /// Print a group's peers and hosts.
    Show {
        /// Group id.
        #[arg(long)]
        group: u64,
    },
}

fn load_or_generate_key(path: &PathBuf, generate: bool) -> Result<KeyPair> {
    if path.exists() {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading key file {}", path.display()))?;
        return KeyPair::from_bytes(&bytes).context("parsing node key");
    }
    if !generate {
        bail!("key file {} does not exist; run init first", path.display());
    }
    let keypair = KeyPair::generate();
    std::fs::write(path, keypair.to_bytes())
        .with_context(|| format!("writing key file {}", path.display()))?;
    info!(path = %path.display(), "generated node key");
    Ok(keypair)
}

fn open_directory(config: &NodeConfig, keypair: &KeyPair) -> Result<Directory> {
    let kv = RocksKv::open_with_config(
        &config.node.data_dir,
        config.storage.rocks_config()?,
    )?;
    let node_id = NodeId::from_public_key(&keypair.public_key());
    Ok(Directory::new(Arc::new(kv), node_id))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = NodeConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let generate = matches!(&cli.command, Command::Init { .. });
    let keypair = load_or_generate_key(&config.node.key_path, generate)?;
    let directory = open_directory(&config, &keypair)?;

    match cli.command {
        Command::Init { addr } => {
            let public_key = keypair.public_key();
            let host = Host {
                id: NodeId::from_public_key(&public_key),
                server_addr: addr,
                public_key: public_key.as_bytes().to_vec(),
                online: true,
            };
            directory.save_host(&host)?;
            info!(node = %host.id, addr = %host.server_addr, "node initialized");
            println!("node id: {}", host.id.0);
            println!("public key: {}", hex::encode(public_key.as_bytes()));
        }
        Command::AddHost { addr, key } => {
            let key_bytes = hex::decode(&key).context("decoding public key hex")?;
            let public_key = PublicKey::from_bytes(&key_bytes)?;
            let host = Host {
                id: NodeId::from_public_key(&public_key),
                server_addr: addr,
                public_key: key_bytes,
                online: true,
            };
            directory.save_host(&host)?;
            info!(node = %host.id, addr = %host.server_addr, "host registered");
            println!("host id: {}", host.id.0);
        }
        Command::CreateGroup {
            group,
            replications,
        } => {
            let group = GroupId(group);
            if directory.get_group(group)?.is_some() {
                bail!("{group} already exists");
            }
            directory.save_group(&RaftGroup {
                id: group,
                term: 0,
                leader_peer: PeerId(0),
                replications,
            })?;
            info!(%group, replications, "group created");
        }
        Command::AddPeer { group, peer, host } => {
            let group = GroupId(group);
            let host = NodeId(host);
            if directory.get_host(host)?.is_none() {
                bail!("host {host} is not registered");
            }
            directory.save_peer(&Peer {
                id: PeerId(peer),
                group,
                host,
                next_index: 1,
                match_index: 0,
            })?;
            info!(%group, peer, %host, "peer assigned");
        }
        Command::Show { group } => {
            let group = GroupId(group);
            match directory.get_group(group)? {
                Some(meta) => println!(
                    "{group}: term {}, leader peer {}, replication {}",
                    meta.term, meta.leader_peer.0, meta.replications
                ),
                None if group != ALPHA_GROUP => println!("{group}: no metadata"),
                None => println!("{group}: alpha group (implicit)"),
            }
            for peer in directory.get_group_peers(group)?.iter() {
                let addr = directory
                    .get_host(peer.host)?
                    .map(|h| h.server_addr.clone())
                    .unwrap_or_else(|| "<unknown host>".into());
                println!(
                    "  peer {} on node {} ({addr}), next index {}",
                    peer.id.0, peer.host.0, peer.next_index
                );
            }
        }
    }

    Ok(())
}
