use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::registry::Registry;

/// `true` if this arm was rate-limited inside the cooldown window.
pub fn is_rate_limited(registry: &Registry, port: u16, cooldown: Duration, now: Instant) -> bool {
    match registry.get(port).last_rate_limited_at {
        Some(t) => now.duration_since(t) < cooldown,
        None => false,
    }
}

/// Ports that are neither excluded nor presently in cooldown.
pub fn available_ports(
    registry: &Registry,
    excluded: &HashSet<u16>,
    cooldown: Duration,
    now: Instant,
) -> Vec<u16> {
    registry
        .ports()
        .iter()
        .copied()
        .filter(|&p| !excluded.contains(&p) && !is_rate_limited(registry, p, cooldown, now))
        .collect()
}

/// The arm that fell into cooldown longest ago — the most likely to have
/// recovered. An arm never rate-limited wins immediately.
pub fn least_recently_rate_limited(registry: &Registry) -> u16 {
    let mut oldest_port = registry.ports()[0];
    let mut oldest_time: Option<Instant> = None;
    for &port in registry.ports() {
        match registry.get(port).last_rate_limited_at {
            None => return port,
            Some(t) => {
                let is_older = match oldest_time {
                    None => true,
                    Some(ot) => t < ot,
                };
                if is_older {
                    oldest_time = Some(t);
                    oldest_port = port;
                }
            }
        }
    }
    oldest_port
}
