//! Network time validation.
//!
//! Sends `HEAD` requests to well-known HTTPS endpoints and reads their `Date`
//! header. Every failure path fails open: an offline device is never
//! penalized for lacking connectivity.

use crate::clock::Clock;
use crate::config::TrustgateConfig;
use crate::license::LicenseRecordStore;
use crate::store::{Namespace, TrustStore};
use crate::time::{from_millis, to_millis};
use crate::TrustgateError;
use chrono::{DateTime, Utc};
use reqwest::header::DATE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const KEY_LAST_REAL_TIME: &str = "last_real_time";
const KEY_LAST_CHECK_TIME: &str = "last_check_time";

/// Outcome of a system time check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeVerdict {
    /// Server time obtained and within tolerance.
    Consistent {
        /// Local minus server time, in seconds.
        skew_seconds: i64,
    },
    /// No server answered; assumed valid.
    Unverified,
    /// Server time obtained and outside tolerance.
    Skewed {
        /// Local minus server time, in seconds.
        skew_seconds: i64,
    },
    /// Local time is behind the last confirmed network time.
    Rewound,
    /// Not checked: a master license is active.
    Exempt,
}

impl TimeVerdict {
    /// Whether the system time may be trusted. Unverified and exempt count
    /// as valid.
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            TimeVerdict::Consistent { .. } | TimeVerdict::Unverified | TimeVerdict::Exempt
        )
    }
}

/// Parse an RFC 2822 date string (HTTP Date header format).
///
/// Example: "Wed, 09 Jun 2021 16:08:15 GMT"
pub fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Compare a server time to local time.
pub fn judge_skew(
    local: DateTime<Utc>,
    server: DateTime<Utc>,
    tolerance: Duration,
) -> TimeVerdict {
    let skew_seconds = (local - server).num_seconds();
    let tolerance_secs = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);

    if skew_seconds.saturating_abs() > tolerance_secs {
        TimeVerdict::Skewed { skew_seconds }
    } else {
        TimeVerdict::Consistent { skew_seconds }
    }
}

/// Best-effort network time validator.
pub struct NetworkTimeValidator {
    client: Client,
    servers: Vec<String>,
    tolerance: Duration,
    store: Arc<dyn TrustStore>,
    clock: Arc<dyn Clock>,
}

impl NetworkTimeValidator {
    /// Create a validator from config.
    pub fn new(
        config: &TrustgateConfig,
        store: Arc<dyn TrustStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TrustgateError> {
        let client = Client::builder()
            .connect_timeout(config.network_timeout)
            .timeout(config.network_timeout)
            .build()
            .map_err(|e| {
                TrustgateError::ConfigError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            servers: config.time_servers.iter().map(|s| s.to_string()).collect(),
            tolerance: config.network_tolerance,
            store,
            clock,
        })
    }

    /// Replace the endpoint list.
    pub fn with_servers(mut self, servers: Vec<String>) -> Self {
        self.servers = servers;
        self
    }

    /// Replace the HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Configured endpoints, in query order.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Query endpoints in order and return the first usable `Date`.
    pub async fn fetch_server_time(&self) -> Option<DateTime<Utc>> {
        for server in &self.servers {
            let response = match self.client.head(server).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(%server, error = %e, "time server unreachable");
                    continue;
                }
            };

            let Some(header) = response.headers().get(DATE).and_then(|v| v.to_str().ok()) else {
                warn!(%server, "time server sent no Date header");
                continue;
            };

            match parse_http_date(header) {
                Some(time) => {
                    debug!(%server, "got server time");
                    return Some(time);
                }
                None => error!(%server, header, "failed to parse Date header"),
            }
        }
        None
    }

    /// Compare local time against the first reachable server.
    pub async fn verify_system_time(&self) -> TimeVerdict {
        match self.fetch_server_time().await {
            Some(server_time) => self.judge(server_time),
            None => {
                warn!("could not verify system time, no time server reachable");
                TimeVerdict::Unverified
            }
        }
    }

    /// Whether the system time is valid. Fails open.
    pub async fn is_system_time_valid(&self) -> bool {
        self.verify_system_time().await.is_valid()
    }

    fn judge(&self, server_time: DateTime<Utc>) -> TimeVerdict {
        let verdict = judge_skew(self.clock.now_utc(), server_time, self.tolerance);
        match verdict {
            TimeVerdict::Skewed { skew_seconds } => {
                error!(skew_seconds, "system time differs from network time")
            }
            _ => debug!(?verdict, "system time checked against network"),
        }
        verdict
    }

    /// Compare local time with the last confirmed network time.
    ///
    /// Works offline. Permissive when no confirmed time is stored or the
    /// store cannot be read.
    pub fn quick_time_check(&self) -> bool {
        let mark = match self.confirmed_mark() {
            Ok(mark) => mark,
            Err(e) => {
                warn!(error = %e, "could not read confirmed network time");
                return true;
            }
        };

        let Some((last_real, _)) = mark else {
            return true;
        };

        let tolerance = chrono::Duration::from_std(self.tolerance).unwrap_or(chrono::Duration::MAX);
        let now = self.clock.now_utc();
        let floor = last_real.checked_sub_signed(tolerance).unwrap_or(last_real);

        if now < floor {
            error!(%now, %last_real, "time went backwards past last confirmed network time");
            return false;
        }
        true
    }

    /// Last confirmed (server time, local check time), if both are stored.
    pub fn confirmed_mark(
        &self,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, TrustgateError> {
        let real = self
            .store
            .get_i64(Namespace::TimeValidator, KEY_LAST_REAL_TIME)?
            .filter(|ms| *ms != 0);
        let checked = self
            .store
            .get_i64(Namespace::TimeValidator, KEY_LAST_CHECK_TIME)?
            .filter(|ms| *ms != 0);

        Ok(real.zip(checked).map(|(r, c)| (from_millis(r), from_millis(c))))
    }

    fn record_mark(&self, server_time: DateTime<Utc>) -> Result<(), TrustgateError> {
        self.store.set_i64(
            Namespace::TimeValidator,
            KEY_LAST_REAL_TIME,
            to_millis(server_time),
        )?;
        self.store.set_i64(
            Namespace::TimeValidator,
            KEY_LAST_CHECK_TIME,
            to_millis(self.clock.now_utc()),
        )
    }

    /// Fetch server time and store it as the confirmed mark.
    ///
    /// Returns whether a mark was stored. Errors are logged, never raised.
    pub async fn save_current_real_time(&self) -> bool {
        let Some(server_time) = self.fetch_server_time().await else {
            return false;
        };
        match self.record_mark(server_time) {
            Ok(()) => {
                info!(%server_time, "saved confirmed network time");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to save confirmed network time");
                false
            }
        }
    }

    /// Full start-up check: quick local check, then the network check; a
    /// consistent network reading refreshes the confirmed mark.
    ///
    /// Skipped entirely while a master license is active.
    pub async fn refresh(&self) -> TimeVerdict {
        match LicenseRecordStore::new(self.store.clone()).load() {
            Ok(record) if record.is_master && record.active => {
                debug!("master license active, skipping time check");
                return TimeVerdict::Exempt;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not read license record"),
        }

        if !self.quick_time_check() {
            return TimeVerdict::Rewound;
        }

        let Some(server_time) = self.fetch_server_time().await else {
            warn!("could not verify system time, no time server reachable");
            return TimeVerdict::Unverified;
        };

        let verdict = self.judge(server_time);
        if let TimeVerdict::Consistent { .. } = verdict {
            if let Err(e) = self.record_mark(server_time) {
                error!(error = %e, "failed to save confirmed network time");
            }
        }
        verdict
    }

    /// Run [`refresh`](Self::refresh) in the background on the current tokio
    /// runtime. Returns `None` outside a runtime.
    ///
    /// Dropping the handle detaches the task; nothing depends on the caller.
    pub fn spawn_refresh(self: &Arc<Self>) -> Option<JoinHandle<TimeVerdict>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let validator = Arc::clone(self);
        Some(handle.spawn(async move { validator.refresh().await }))
    }
}
