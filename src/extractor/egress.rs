//! Egress handle rotation
//!
//! Each extraction runs through one egress handle (direct connection or a
//! configured proxy). The pool hands them out round-robin via
//! [`EgressPool::next_egress`]; a `Blocked` classification mid-extraction is
//! advisory only and does not rotate the in-use handle.

use std::sync::atomic::{AtomicUsize, Ordering};

/// One egress identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Egress {
    /// Short label used in logs ("direct", "proxy-0", ...)
    pub label: String,

    /// Proxy URL, or None for a direct connection
    pub proxy_url: Option<String>,
}

impl Egress {
    /// Direct connection, no proxy
    pub fn direct() -> Self {
        Self {
            label: "direct".to_string(),
            proxy_url: None,
        }
    }
}

/// Round-robin pool of egress handles
#[derive(Debug)]
pub struct EgressPool {
    handles: Vec<Egress>,
    cursor: AtomicUsize,
}

impl EgressPool {
    /// Build a pool from configured proxy URLs; empty input means a pool
    /// containing only the direct handle
    pub fn from_proxies(proxies: &[String]) -> Self {
        let handles = if proxies.is_empty() {
            vec![Egress::direct()]
        } else {
            proxies
                .iter()
                .enumerate()
                .map(|(i, url)| Egress {
                    label: format!("proxy-{i}"),
                    proxy_url: Some(url.clone()),
                })
                .collect()
        };

        Self {
            handles,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Hand out the next egress handle, wrapping around
    pub fn next_egress(&self) -> Egress {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.handles.len();
        self.handles[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
