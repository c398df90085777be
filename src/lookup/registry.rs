//! Registry resolution: race every root registry and keep the most informative answer.

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::{Arc, LazyLock};
use tokio::sync::mpsc;
use tracing::debug;

use super::client::{WhoisClient, WhoisTransport};
use super::fields::parse_registry_info;
use super::referral::ReferralResolver;
use crate::config::RegistryConfig;
use crate::state::RegistryInfo;

/// Ranges that never appear in public registries
static PRIVATE_NETWORKS: LazyLock<Vec<IpNetwork>> = LazyLock::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "fc00::/7",
        "fe80::/10",
        "::1/128",
    ]
    .iter()
    .filter_map(|net| net.parse().ok())
    .collect()
});

/// True for private, shared, loopback and link-local addresses
pub fn is_private(addr: IpAddr) -> bool {
    PRIVATE_NETWORKS.iter().any(|net| net.contains(addr))
}

/// How much a result tells us; placeholder delegation blocks count for nothing
pub fn score(info: &RegistryInfo, config: &RegistryConfig) -> usize {
    if config.is_placeholder(&info.netname) {
        return 0;
    }
    info.populated()
}

/// Highest-scoring result, earlier entries winning ties; `None` if nothing scores
pub fn select_best<I>(results: I, config: &RegistryConfig) -> Option<RegistryInfo>
where
    I: IntoIterator<Item = Option<RegistryInfo>>,
{
    let mut best: Option<(usize, RegistryInfo)> = None;
    for info in results.into_iter().flatten() {
        let score = score(&info, config);
        if score > best.as_ref().map_or(0, |(s, _)| *s) {
            best = Some((score, info));
        }
    }
    best.map(|(_, info)| info)
}

/// Resolves registry metadata for hop addresses
pub struct RegistryResolver<T: ?Sized = WhoisClient> {
    transport: Arc<T>,
    config: Arc<RegistryConfig>,
}

impl RegistryResolver<WhoisClient> {
    pub fn new(config: RegistryConfig) -> Self {
        let client = WhoisClient::new(&config);
        Self::with_transport(Arc::new(client), config)
    }
}

impl<T: WhoisTransport + ?Sized + 'static> RegistryResolver<T> {
    pub fn with_transport(transport: Arc<T>, config: RegistryConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    /// Best registry info for `addr`; never fails, worst case is an empty result
    ///
    /// Private addresses short-circuit to a "local" result without any query.
    /// Otherwise one task per root registry follows its referral chain; the
    /// call returns once every task has reported.
    pub async fn resolve(&self, addr: IpAddr) -> RegistryInfo {
        let address = addr.to_string();
        if is_private(addr) {
            return RegistryInfo::local(address);
        }

        let roots = &self.config.roots;
        if roots.is_empty() {
            return RegistryInfo::empty(address);
        }

        let (tx, mut rx) = mpsc::channel(roots.len());
        for (index, root) in roots.iter().enumerate() {
            let tx = tx.clone();
            let transport = self.transport.clone();
            let config = self.config.clone();
            let root = root.clone();
            let address = address.clone();

            tokio::spawn(async move {
                let resolver = ReferralResolver::new(
                    transport.as_ref(),
                    &config.aliases,
                    config.max_referral_depth,
                );
                let info = match resolver.resolve(&address, &root).await {
                    Ok(resolution) => {
                        let info = parse_registry_info(&address, &resolution.reply, &config.aliases);
                        debug!(
                            root = %root,
                            server = %resolution.server,
                            netname = %info.netname,
                            asn = %info.asn,
                            country = %info.country,
                            "Registry chain resolved"
                        );
                        Some(info)
                    }
                    Err(e) => {
                        debug!(root = %root, error = %e, "Registry chain failed");
                        None
                    }
                };
                // Receiver outlives every sender
                let _ = tx.send((index, info)).await;
            });
        }
        drop(tx);

        // Slots in root order so ties go to the earlier root, not the faster one
        let mut results: Vec<Option<RegistryInfo>> = vec![None; roots.len()];
        while let Some((index, info)) = rx.recv().await {
            results[index] = info;
        }

        select_best(results, &self.config).unwrap_or_else(|| RegistryInfo::empty(address))
    }
}
