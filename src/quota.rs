//! Pluggable quota source.
//!
//! The statusline shows quota data from exactly one strategy per run,
//! chosen by [`Config::quota_source`]: the OAuth usage endpoint, the
//! external reporting tool, or the endpoint with the tool as fallback.

use crate::ccusage;
use crate::cli::QuotaSourceArg;
use crate::config::Config;
use crate::models::quota::QuotaReport;
use crate::usage_api::{self, CredentialChain, TokenProvider};

pub trait QuotaProvider {
    fn name(&self) -> &'static str;

    /// `None` means absent: no data now and nothing cached.
    fn fetch(&self) -> Option<QuotaReport>;
}

/// Rolling/weekly utilization from the usage endpoint.
pub struct ApiQuotaProvider<'a, T: TokenProvider> {
    config: &'a Config,
    tokens: T,
}

impl<'a, T: TokenProvider> ApiQuotaProvider<'a, T> {
    pub fn new(config: &'a Config, tokens: T) -> Self {
        Self { config, tokens }
    }
}

impl<T: TokenProvider> QuotaProvider for ApiQuotaProvider<'_, T> {
    fn name(&self) -> &'static str {
        "api"
    }

    fn fetch(&self) -> Option<QuotaReport> {
        usage_api::usage_quota(self.config, &self.tokens).map(QuotaReport::Limits)
    }
}

/// Spend summary from the external reporting tool.
pub struct ReportQuotaProvider<'a> {
    config: &'a Config,
    session_json: &'a [u8],
}

impl<'a> ReportQuotaProvider<'a> {
    pub fn new(config: &'a Config, session_json: &'a [u8]) -> Self {
        Self {
            config,
            session_json,
        }
    }
}

impl QuotaProvider for ReportQuotaProvider<'_> {
    fn name(&self) -> &'static str {
        "ccusage"
    }

    fn fetch(&self) -> Option<QuotaReport> {
        ccusage::spend_report(self.config, self.session_json).map(QuotaReport::Spend)
    }
}

/// Tries each provider in order and returns the first report.
pub struct FallbackQuotaProvider<'a> {
    providers: Vec<Box<dyn QuotaProvider + 'a>>,
}

impl<'a> FallbackQuotaProvider<'a> {
    pub fn new(providers: Vec<Box<dyn QuotaProvider + 'a>>) -> Self {
        Self { providers }
    }
}

impl QuotaProvider for FallbackQuotaProvider<'_> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn fetch(&self) -> Option<QuotaReport> {
        self.providers.iter().find_map(|p| {
            let report = p.fetch();
            if report.is_none() {
                tracing::debug!(provider = p.name(), "quota source absent");
            }
            report
        })
    }
}

/// Build the provider selected by `config`, or `None` when quota display
/// is switched off.
pub fn select_provider<'a>(
    config: &'a Config,
    session_json: &'a [u8],
) -> Option<Box<dyn QuotaProvider + 'a>> {
    let api = || ApiQuotaProvider::new(config, CredentialChain::new(config.credential_dirs.clone()));
    match config.quota_source {
        QuotaSourceArg::Api => Some(Box::new(api())),
        QuotaSourceArg::Ccusage => Some(Box::new(ReportQuotaProvider::new(config, session_json))),
        QuotaSourceArg::Auto => {
            let chain: Vec<Box<dyn QuotaProvider + 'a>> = vec![
                Box::new(api()),
                Box::new(ReportQuotaProvider::new(config, session_json)),
            ];
            Some(Box::new(FallbackQuotaProvider::new(chain)))
        }
        QuotaSourceArg::Off => None,
    }
}
