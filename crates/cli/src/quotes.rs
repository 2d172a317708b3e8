//! File-backed price quote sources
//!
//! Loads a JSON file of compute price entries and reservation offerings
//! and serves them through the library's quote source traits. Entries
//! match on instance type, engine, purchase option and topology; the
//! region is matched only when the entry names one.

use std::fs;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use estimator_lib::{
    EstimatorError, InstanceSpec, PriceQuote, PurchaseOption, QuoteSource, ReservationSource,
    ReservedOffering, Topology, HOURS_PER_MONTH,
};

/// One priced (instance, option) combination.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEntry {
    pub instance_type: String,
    pub engine: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub multi_az: bool,
    /// od | ri1nu | ri1au | ri3nu | ri3au
    pub option: String,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub upfront_fee: Option<f64>,
    #[serde(default)]
    pub monthly_fee: Option<f64>,
}

/// One reservation offering, used when no direct reserved price exists.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferingEntry {
    pub instance_type: String,
    pub engine: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub multi_az: bool,
    pub option: String,
    pub fixed_price: f64,
    pub effective_hourly: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteFile {
    #[serde(default)]
    pub quotes: Vec<QuoteEntry>,
    #[serde(default)]
    pub offerings: Vec<OfferingEntry>,
}

impl QuoteFile {
    pub fn load(path: &Path) -> Result<Self, EstimatorError> {
        let text = fs::read_to_string(path).map_err(|source| EstimatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| EstimatorError::QuoteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_option(key: &str) -> Option<PurchaseOption> {
    PurchaseOption::ALL
        .into_iter()
        .find(|option| option.key_suffix() == key)
}

fn matches(
    instance_type: &str,
    engine: &str,
    region: &Option<String>,
    multi_az: bool,
    entry_option: &str,
    spec: &InstanceSpec,
    option: PurchaseOption,
) -> bool {
    instance_type == spec.instance_type
        && engine == spec.engine
        && region.as_deref().map_or(true, |r| r == spec.region)
        && multi_az == (spec.topology == Topology::MultiZone)
        && parse_option(entry_option) == Some(option)
}

/// Quote source backed by the `quotes` table of a quote file.
pub struct FileQuoteSource {
    entries: Vec<QuoteEntry>,
}

impl FileQuoteSource {
    pub fn new(file: &QuoteFile) -> Self {
        Self {
            entries: file.quotes.clone(),
        }
    }
}

#[async_trait]
impl QuoteSource for FileQuoteSource {
    async fn fetch(
        &self,
        spec: &InstanceSpec,
        option: PurchaseOption,
    ) -> Result<Option<PriceQuote>> {
        let entry = self.entries.iter().find(|e| {
            matches(
                &e.instance_type,
                &e.engine,
                &e.region,
                e.multi_az,
                &e.option,
                spec,
                option,
            )
        });
        let Some(entry) = entry else {
            return Ok(None);
        };

        if option == PurchaseOption::OnDemand {
            return Ok(entry
                .hourly_rate
                .map(|hourly| PriceQuote::on_demand(spec.clone(), hourly)));
        }

        let monthly_fee = entry
            .monthly_fee
            .or(entry.hourly_rate.map(|hourly| hourly * HOURS_PER_MONTH));
        match (entry.upfront_fee, monthly_fee) {
            (None, None) => Ok(None),
            (upfront, monthly) => Ok(Some(PriceQuote::reserved(
                spec.clone(),
                option,
                upfront.unwrap_or(0.0),
                monthly.unwrap_or(0.0),
            ))),
        }
    }
}

/// Reservation fallback backed by the `offerings` table.
pub struct FileReservationSource {
    offerings: Vec<OfferingEntry>,
}

impl FileReservationSource {
    pub fn new(file: &QuoteFile) -> Self {
        Self {
            offerings: file.offerings.clone(),
        }
    }
}

#[async_trait]
impl ReservationSource for FileReservationSource {
    async fn fetch_offering(
        &self,
        spec: &InstanceSpec,
        option: PurchaseOption,
    ) -> Result<Option<ReservedOffering>> {
        Ok(self
            .offerings
            .iter()
            .find(|o| {
                matches(
                    &o.instance_type,
                    &o.engine,
                    &o.region,
                    o.multi_az,
                    &o.option,
                    spec,
                    option,
                )
            })
            .map(|o| ReservedOffering {
                fixed_price: o.fixed_price,
                effective_hourly: o.effective_hourly,
            }))
    }
}
